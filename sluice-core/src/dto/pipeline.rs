//! Pipeline DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::execution::ExecutionStatus;
use crate::domain::pipeline::{Pipeline, PipelineDefinition, PipelineStatus};

/// Request to create a new pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePipeline {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub definition: PipelineDefinition,
    #[serde(default)]
    pub status: Option<PipelineStatus>,
}

/// Lightweight pipeline summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: PipelineStatus,
    pub node_count: usize,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_status: Option<ExecutionStatus>,
    pub updated_at: DateTime<Utc>,
}

impl From<Pipeline> for PipelineSummary {
    fn from(pipeline: Pipeline) -> Self {
        Self {
            id: pipeline.id,
            name: pipeline.name,
            description: pipeline.description,
            status: pipeline.status,
            node_count: pipeline.definition.nodes.len(),
            last_run_at: pipeline.last_run_at,
            last_run_status: pipeline.last_run_status,
            updated_at: pipeline.updated_at,
        }
    }
}
