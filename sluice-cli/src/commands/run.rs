//! Pipeline run command
//!
//! Executes a pipeline file in-process with in-memory stores and prints the
//! execution transcript.

use anyhow::{Context, Result};
use colored::*;
use serde_json::Value;
use sluice_core::domain::execution::ExecutionStatus;
use sluice_core::domain::node::{ConfigMap, ConnectionRef};
use sluice_core::domain::outcome::{DestinationResult, ExecutionOutcome, NodeResult};
use sluice_engine::memory::{MemoryExecutionStore, MemoryPipelineStore};
use sluice_engine::store::ExecutionStore;
use sluice_engine::{NodeProcessor, PipelineEngine};
use std::path::Path;
use std::sync::Arc;

use crate::commands::session;
use crate::config::Config;
use crate::workspace::ConnectionEntry;
use crate::{package, workspace};

pub async fn run_pipeline(
    config: &Config,
    pipeline_path: &Path,
    connections_path: &Path,
    out_dir: &Path,
    show_records: bool,
) -> Result<()> {
    let pipeline = workspace::load_pipeline(pipeline_path)?;
    let entries = workspace::load_connections(connections_path)?;
    let (resolver, adapters) = session(config, &entries)?;

    let executions = Arc::new(MemoryExecutionStore::new());
    let pipelines = Arc::new(MemoryPipelineStore::new());
    let engine = PipelineEngine::new(
        executions.clone(),
        pipelines,
        NodeProcessor::new(resolver, adapters, config.engine.clone()),
    );

    let execution = executions.start(pipeline.id)?;
    println!(
        "{} {} ({} nodes)",
        "▸ Running".cyan().bold(),
        pipeline.name.bold(),
        pipeline.definition.nodes.len()
    );

    let outcome = engine
        .execute(&pipeline, execution.id)
        .await
        .context("Pipeline execution aborted")?;
    let execution = executions.get_by_id(execution.id).await?;

    println!("{}", "─".repeat(80).dimmed());
    for line in execution.logs.lines() {
        println!("{}", colorize_log_line(line));
    }
    println!("{}", "─".repeat(80).dimmed());

    print_nodes(&outcome);
    println!();
    println!("  Status:            {}", colorize_status(&execution.status));
    println!("  Records processed: {}", outcome.records_processed);
    println!("  Errors:            {}", outcome.errors_count);

    match &outcome.destination_result {
        Some(DestinationResult::LocalFile { data, config }) => {
            let connection = destination_entry(&entries, config).map(|entry| &entry.config);
            let options = package::packaging_config(connection, config);
            match package::write_payload(data, &options, &pipeline.name, out_dir)? {
                Some(path) => println!(
                    "  Output:            {}",
                    path.display().to_string().green()
                ),
                None => println!("  Output:            {}", "no records, nothing written".yellow()),
            }
        }
        Some(DestinationResult::Passthrough { record_count }) => {
            println!("  Delivered:         {record_count} records");
        }
        None => {}
    }

    if show_records {
        println!();
        println!("{}", serde_json::to_string_pretty(&outcome.records)?);
    }

    Ok(())
}

/// Connection the `local_file` destination node points at
fn destination_entry<'a>(
    entries: &'a [ConnectionEntry],
    node_config: &ConfigMap,
) -> Option<&'a ConnectionEntry> {
    let reference: ConnectionRef =
        serde_json::from_value(Value::Object(node_config.clone())).ok()?;
    let id = reference.data_source_id?;
    entries.iter().find(|entry| entry.id == id)
}

fn print_nodes(outcome: &ExecutionOutcome) {
    for node in &outcome.nodes {
        let (marker, detail) = match &node.result {
            NodeResult::Completed { summary } => ("✓".green(), summary.normal()),
            NodeResult::Failed { message } => ("✗".red(), message.red()),
            NodeResult::Skipped { reason } => ("-".yellow(), reason.dimmed()),
        };
        println!(
            "  {} {} {} {}",
            marker,
            node.node_name.bold(),
            format!("({})", node.node_type).dimmed(),
            detail
        );
    }
}

fn colorize_log_line(line: &str) -> ColoredString {
    if line.contains("FATAL ERROR") || line.contains("ERROR in node") {
        line.red()
    } else if line.contains("Unknown node type") {
        line.yellow()
    } else {
        line.normal()
    }
}

fn colorize_status(status: &ExecutionStatus) -> ColoredString {
    match status {
        ExecutionStatus::Completed => status.to_string().green(),
        ExecutionStatus::Failed => status.to_string().red(),
        ExecutionStatus::Running => status.to_string().yellow(),
    }
}
