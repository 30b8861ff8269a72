//! Sluice CLI
//!
//! Runs pipelines locally and inspects connections without the orchestrator.

mod commands;
mod config;
mod id_resolver;
mod package;
mod workspace;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use sluice_engine::EngineConfig;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Sluice data pipeline CLI", long_about = None)]
struct Cli {
    /// Secret used to derive the connection encryption key
    #[arg(long, env = "SLUICE_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Reject malformed filter conditions instead of passing records through
    #[arg(long, env = "SLUICE_STRICT_CONDITIONS")]
    strict_conditions: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sluice_cli=info,sluice_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        secret: cli.secret,
        engine: EngineConfig::default().with_strict_conditions(cli.strict_conditions),
    };

    handle_command(cli.command, &config).await
}
