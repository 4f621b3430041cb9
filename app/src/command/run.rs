use crate::transcript::{self, ConversationReport, Transcript};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::info;
use turnkit_property::PropertyExtractionStage;

#[derive(Debug, Clone, Default)]
pub struct RunInput {
    /// Transcript files, one conversation each
    pub transcripts: Vec<PathBuf>,
    /// Config file to use instead of `~/turnkit/config.json`
    pub config: Option<PathBuf>,
}

/// Strategy for replaying recorded conversations through the property stage.
///
/// The stage is compiled once and shared; every transcript runs on its own
/// task with its own conversation memory. Reports are printed as JSON in
/// the order the transcripts were given.
#[derive(Debug, Clone, Copy)]
pub struct RunStrategy;

impl super::CommandStrategy for RunStrategy {
    type Input = RunInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        if input.transcripts.is_empty() {
            anyhow::bail!("No transcripts given");
        }

        let config = super::load_config(input.config.as_deref())?;
        let stage = Arc::new(PropertyExtractionStage::from_config(&config.property)?);
        let lookback = config.memory.lookback;
        info!(
            "Replaying {} transcript(s) with lookback {lookback}",
            input.transcripts.len()
        );

        let mut tasks = JoinSet::new();
        for (index, path) in input.transcripts.into_iter().enumerate() {
            let transcript = Transcript::from_path(&path)?;
            let stage = Arc::clone(&stage);
            tasks.spawn(async move {
                info!("Replaying {}", path.display());
                (index, transcript::replay(stage.as_ref(), transcript, lookback))
            });
        }

        let mut reports: Vec<(usize, ConversationReport)> = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            reports.push(joined?);
        }
        reports.sort_by_key(|(index, _)| *index);

        let reports: Vec<ConversationReport> =
            reports.into_iter().map(|(_, report)| report).collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);

        Ok(())
    }
}
