use std::path::PathBuf;
use turnkit_property::PropertyExtractionStage;

#[derive(Debug, Clone, Default)]
pub struct InfoInput {
    /// Config file to inspect instead of `~/turnkit/config.json`
    pub config: Option<PathBuf>,
}

/// Strategy for displaying configuration information.
///
/// Outputs the memory settings and every action the property stage reacts
/// to, after compiling the configuration the same way `run` does.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = InfoInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = super::load_config(input.config.as_deref())?;
        let stage = PropertyExtractionStage::from_config(&config.property)?;

        println!("=== turnkit Configuration ===\n");

        println!("Memory:");
        println!("  Lookback: {}", config.memory.lookback);
        println!();

        let instructions = stage.instructions();
        println!("Property Actions: {}", instructions.len());
        let mut actions: Vec<&str> = instructions.actions().collect();
        actions.sort_unstable();
        for action in actions {
            let compiled = instructions.get(action).unwrap_or_default();
            println!("  {action}:");
            for entry in compiled {
                let instruction = entry.instruction();
                let name = instruction.name.as_deref().unwrap_or("(unnamed)");
                let source = entry.path().map_or_else(
                    || format!("value {}", instruction.value.clone().unwrap_or_default()),
                    |path| format!("path {path}"),
                );
                println!("    {name} [{}] <- {source}", instruction.scope);
            }
        }

        Ok(())
    }
}
