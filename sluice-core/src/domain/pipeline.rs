//! Pipeline domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::execution::ExecutionStatus;
use crate::domain::node::Node;

/// Pipeline definition
///
/// Structure shared between orchestrator (persists) and engine (executes).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub definition: PipelineDefinition,
    pub status: PipelineStatus,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_status: Option<ExecutionStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ordered node list of a pipeline
///
/// Execution order is declaration order. The graph is flat: no branching,
/// no merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl PipelineDefinition {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Lifecycle status of a pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Archived,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Draft => "draft",
            PipelineStatus::Active => "active",
            PipelineStatus::Paused => "paused",
            PipelineStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(PipelineStatus::Draft),
            "active" => Some(PipelineStatus::Active),
            "paused" => Some(PipelineStatus::Paused),
            "archived" => Some(PipelineStatus::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
