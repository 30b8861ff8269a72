//! Local pipeline and connection files
//!
//! A connections file is a JSON array of plaintext connection definitions:
//!
//! ```json
//! [{ "id": "…", "name": "shop", "type": "postgresql", "config": { "host": "…" } }]
//! ```
//!
//! Configs are sealed with the session credential store as they are loaded,
//! so the engine sees the same encrypted form the orchestrator stores.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use sluice_core::domain::connection::{Connection, ConnectionStatus, ConnectionType};
use sluice_core::domain::pipeline::{Pipeline, PipelineDefinition, PipelineStatus};
use sluice_core::dto::pipeline::CreatePipeline;
use sluice_engine::CredentialStore;
use sluice_engine::memory::MemoryConnectionRegistry;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// Plaintext connection as written in a connections file
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEntry {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub config: Value,
}

/// Pipeline file: either a full pipeline document or a bare node list
#[derive(Deserialize)]
#[serde(untagged)]
enum PipelineFile {
    Document(CreatePipeline),
    Definition(PipelineDefinition),
}

pub fn load_connections(path: &Path) -> Result<Vec<ConnectionEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read connections file {}", path.display()))?;
    let entries: Vec<ConnectionEntry> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid connections file {}", path.display()))?;

    let mut seen = std::collections::HashSet::new();
    for entry in &entries {
        if !seen.insert(entry.id) {
            bail!("Duplicate connection id {} in {}", entry.id, path.display());
        }
    }

    debug!("Loaded {} connections from {}", entries.len(), path.display());
    Ok(entries)
}

/// Seals every entry and puts it in an in-memory registry
pub fn registry(
    entries: &[ConnectionEntry],
    credentials: &CredentialStore,
) -> Result<MemoryConnectionRegistry> {
    let registry = MemoryConnectionRegistry::new();

    for entry in entries {
        let encrypted_config = credentials
            .seal(&entry.config)
            .with_context(|| format!("Failed to encrypt config of '{}'", entry.name))?;
        registry.insert(Connection {
            id: entry.id,
            name: entry.name.clone(),
            connection_type: entry.connection_type,
            encrypted_config,
            status: ConnectionStatus::Active,
            last_tested_at: None,
            last_test_status: None,
        })?;
    }

    Ok(registry)
}

pub fn load_pipeline(path: &Path) -> Result<Pipeline> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file {}", path.display()))?;
    let file: PipelineFile = serde_json::from_str(&text)
        .with_context(|| format!("Invalid pipeline file {}", path.display()))?;

    let request = match file {
        PipelineFile::Document(request) => request,
        PipelineFile::Definition(definition) => CreatePipeline {
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "pipeline".to_string()),
            description: None,
            definition,
            status: None,
        },
    };

    debug!(
        "Loaded pipeline '{}' with {} nodes from {}",
        request.name,
        request.definition.nodes.len(),
        path.display()
    );

    let now = Utc::now();
    Ok(Pipeline {
        id: Uuid::new_v4(),
        name: request.name,
        description: request.description,
        definition: request.definition,
        status: request.status.unwrap_or(PipelineStatus::Active),
        last_run_at: None,
        last_run_status: None,
        created_at: now,
        updated_at: now,
    })
}
