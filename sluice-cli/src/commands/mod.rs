//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod connection;
mod crypto;
mod run;

use anyhow::Result;
use clap::Subcommand;
use sluice_engine::ConnectionResolver;
use sluice_engine::adapter::AdapterRegistry;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::workspace::{self, ConnectionEntry};

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Execute a pipeline file against local connections
    Run {
        /// Pipeline JSON file
        pipeline: PathBuf,

        /// Connections JSON file
        #[arg(short, long, env = "SLUICE_CONNECTIONS")]
        connections: PathBuf,

        /// Directory local_file results are written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Print the final records as JSON
        #[arg(long)]
        show_records: bool,
    },
    /// Sample data from a connection
    Preview {
        /// Connection name, ID or ID prefix
        connection: String,

        #[arg(short, long, env = "SLUICE_CONNECTIONS")]
        connections: PathBuf,

        /// SQL query (databases) or endpoint path (REST APIs)
        #[arg(short, long)]
        query: Option<String>,

        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<u64>,
    },
    /// Check that a connection is reachable
    Test {
        /// Connection name, ID or ID prefix
        connection: String,

        #[arg(short, long, env = "SLUICE_CONNECTIONS")]
        connections: PathBuf,
    },
    /// Encrypt a value with the configured secret
    Encrypt {
        plaintext: String,
    },
    /// Decrypt a value with the configured secret
    Decrypt {
        ciphertext: String,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run {
            pipeline,
            connections,
            out_dir,
            show_records,
        } => run::run_pipeline(config, &pipeline, &connections, &out_dir, show_records).await,
        Commands::Preview {
            connection,
            connections,
            query,
            limit,
        } => connection::preview(config, &connections, &connection, query, limit).await,
        Commands::Test {
            connection,
            connections,
        } => connection::test(config, &connections, &connection).await,
        Commands::Encrypt { plaintext } => crypto::encrypt(config, &plaintext),
        Commands::Decrypt { ciphertext } => crypto::decrypt(config, &ciphertext),
    }
}

/// Resolver and adapters over the given connections
fn session(
    config: &Config,
    entries: &[ConnectionEntry],
) -> Result<(ConnectionResolver, Arc<AdapterRegistry>)> {
    let credentials = Arc::new(config.session_credential_store());
    let registry = Arc::new(workspace::registry(entries, &credentials)?);

    Ok((
        ConnectionResolver::new(registry, credentials),
        Arc::new(AdapterRegistry::with_defaults(&config.engine)),
    ))
}
