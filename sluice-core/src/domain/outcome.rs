//! Outcome types produced by the execution engine

use serde::{Deserialize, Serialize};

use crate::domain::node::{ConfigMap, NodeType};
use crate::domain::record::RecordSet;

/// What a destination node produced
///
/// `LocalFile` means nothing was written: the caller has to serialize `data`
/// according to `config` and deliver it itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DestinationResult {
    #[serde(rename_all = "camelCase")]
    Passthrough { record_count: u64 },
    LocalFile { data: RecordSet, config: ConfigMap },
}

impl DestinationResult {
    pub fn record_count(&self) -> u64 {
        match self {
            DestinationResult::Passthrough { record_count } => *record_count,
            DestinationResult::LocalFile { data, .. } => data.len() as u64,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DestinationResult::Passthrough { .. } => "passthrough",
            DestinationResult::LocalFile { .. } => "local_file",
        }
    }
}

/// Per-node result accumulated by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutcome {
    pub node_id: String,
    pub node_name: String,
    pub node_type: NodeType,
    pub result: NodeResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeResult {
    Completed { summary: String },
    Failed { message: String },
    Skipped { reason: String },
}

impl NodeOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.result, NodeResult::Failed { .. })
    }
}

/// Result of one `PipelineEngine::execute` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub success: bool,
    pub records_processed: u64,
    pub errors_count: u64,
    pub destination_result: Option<DestinationResult>,
    pub records: RecordSet,
    pub nodes: Vec<NodeOutcome>,
}

impl ExecutionOutcome {
    /// Downloadable payload, present only for `local_file` destinations
    pub fn download(&self) -> Option<(&RecordSet, &ConfigMap)> {
        match &self.destination_result {
            Some(DestinationResult::LocalFile { data, config }) => Some((data, config)),
            _ => None,
        }
    }
}
