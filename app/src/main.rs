#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;
mod transcript;

use clap::{Parser, Subcommand};
use command::{
    CommandStrategy, InfoInput, InfoStrategy, InitStrategy, RunInput, RunStrategy,
    VersionStrategy,
};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "turnkit")]
#[command(about = "Conversation property extraction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,
    /// Show configured property actions
    Info {
        /// Config file to use
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },
    /// Replay transcripts through the property stage
    Run {
        /// Transcript files to replay
        #[arg(required = true)]
        transcripts: Vec<PathBuf>,

        /// Config file to use
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Info { config } => InfoStrategy.execute(InfoInput { config }).await,
        Commands::Run {
            transcripts,
            config,
        } => {
            RunStrategy
                .execute(RunInput {
                    transcripts,
                    config,
                })
                .await
        }
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
