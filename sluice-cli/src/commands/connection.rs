//! Connection command handlers
//!
//! Previews and connectivity tests against connections defined in a local
//! connections file.

use anyhow::Result;
use colored::*;
use serde_json::Value;
use sluice_core::dto::preview::{PreviewRequest, PreviewResponse};
use sluice_engine::ConnectionInspector;
use std::path::Path;
use uuid::Uuid;

use crate::commands::session;
use crate::config::Config;
use crate::id_resolver::{ConnectionSelector, resolve_connection_id};
use crate::workspace;

/// Widest cell printed in the preview table
const MAX_CELL_WIDTH: usize = 32;

pub async fn preview(
    config: &Config,
    connections_path: &Path,
    connection: &str,
    query: Option<String>,
    limit: Option<u64>,
) -> Result<()> {
    let (inspector, id) = inspector(config, connections_path, connection)?;

    let preview = inspector
        .preview(id, &PreviewRequest { query, limit })
        .await?;

    println!(
        "{}",
        format!(
            "{} row(s) from {} connection {}:",
            preview.count, preview.data_source_type, id
        )
        .bold()
    );
    println!();

    if preview.data.is_empty() {
        println!("{}", "No rows returned.".yellow());
    } else {
        print_table(&preview);
    }

    Ok(())
}

pub async fn test(config: &Config, connections_path: &Path, connection: &str) -> Result<()> {
    let (inspector, id) = inspector(config, connections_path, connection)?;

    let result = inspector.test(id).await?;
    if result.success {
        println!("{} {}", "✓".green(), result.message);
    } else {
        println!("{} {}", "✗".red(), result.message.red());
    }

    Ok(())
}

/// Inspector over the connections file and the id `connection` names
fn inspector(
    config: &Config,
    connections_path: &Path,
    connection: &str,
) -> Result<(ConnectionInspector, Uuid)> {
    let entries = workspace::load_connections(connections_path)?;
    let id = resolve_connection_id(&entries, &ConnectionSelector::parse(connection))?;
    let (resolver, adapters) = session(config, &entries)?;

    Ok((ConnectionInspector::new(resolver, adapters, &config.engine), id))
}

fn print_table(preview: &PreviewResponse) {
    let header: Vec<String> = preview
        .columns
        .iter()
        .map(|c| format!("{} ({})", c.name, c.column_type))
        .collect();
    println!("  {}", header.join(" │ ").bold());
    println!("  {}", "─".repeat(header.join(" │ ").chars().count()).dimmed());

    for row in &preview.data {
        let cells: Vec<String> = preview
            .columns
            .iter()
            .map(|c| truncate(&display(row.get(&c.name))))
            .collect();
        println!("  {}", cells.join(" │ "));
    }
}

fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_CELL_WIDTH - 1).collect();
        format!("{head}…")
    }
}
