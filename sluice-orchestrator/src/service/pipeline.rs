//! Pipeline Service
//!
//! Business logic for pipeline management.

use sluice_core::domain::node::NodeType;
use sluice_core::domain::pipeline::Pipeline;
use sluice_core::dto::pipeline::{CreatePipeline, PipelineSummary};
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::repository::pipeline_repository;

/// Service error type
#[derive(Debug)]
pub enum PipelineError {
    NotFound(Uuid),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Create a new pipeline
pub async fn create_pipeline(pool: &PgPool, req: CreatePipeline) -> Result<Pipeline> {
    validate_pipeline_request(&req)?;

    let pipeline = pipeline_repository::create(pool, req).await?;

    tracing::info!(
        "Pipeline created: {} ({}, {} nodes)",
        pipeline.name,
        pipeline.id,
        pipeline.definition.nodes.len()
    );

    Ok(pipeline)
}

/// Get a pipeline by ID
pub async fn get_pipeline(pool: &PgPool, id: Uuid) -> Result<Pipeline> {
    let pipeline = pipeline_repository::find_by_id(pool, id)
        .await?
        .ok_or(PipelineError::NotFound(id))?;

    Ok(pipeline)
}

/// List all pipelines
pub async fn list_pipelines(pool: &PgPool) -> Result<Vec<PipelineSummary>> {
    let pipelines = pipeline_repository::list_all(pool).await?;
    Ok(pipelines.into_iter().map(PipelineSummary::from).collect())
}

/// Delete a pipeline and its execution history
pub async fn delete_pipeline(pool: &PgPool, id: Uuid) -> Result<()> {
    let deleted = pipeline_repository::delete(pool, id).await?;

    if !deleted {
        return Err(PipelineError::NotFound(id));
    }

    tracing::info!("Pipeline deleted: {}", id);

    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

fn validate_pipeline_request(req: &CreatePipeline) -> Result<()> {
    if req.name.trim().is_empty() {
        return Err(PipelineError::ValidationError(
            "Pipeline name cannot be empty".to_string(),
        ));
    }

    if req.name.len() > 255 {
        return Err(PipelineError::ValidationError(
            "Pipeline name is too long (max 255 characters)".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for node in &req.definition.nodes {
        if node.id.trim().is_empty() {
            return Err(PipelineError::ValidationError(
                "Node id cannot be empty".to_string(),
            ));
        }

        if !seen.insert(node.id.as_str()) {
            return Err(PipelineError::ValidationError(format!(
                "Duplicate node id '{}'",
                node.id
            )));
        }

        // Unknown types are accepted and skipped at run time
        if let NodeType::Other(other) = &node.node_type {
            tracing::warn!("Node '{}' has unknown type '{}'", node.id, other);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(definition: serde_json::Value) -> CreatePipeline {
        serde_json::from_value(json!({ "name": "Orders export", "definition": definition }))
            .unwrap()
    }

    #[test]
    fn test_validate_empty_name() {
        let mut req = request(json!({ "nodes": [] }));
        req.name = "  ".to_string();

        let result = validate_pipeline_request(&req);
        assert!(matches!(result, Err(PipelineError::ValidationError(_))));
    }

    #[test]
    fn test_validate_duplicate_node_ids() {
        let req = request(json!({ "nodes": [
            { "id": "n1", "type": "source", "name": "A" },
            { "id": "n1", "type": "destination", "name": "B" }
        ]}));

        let result = validate_pipeline_request(&req);
        assert!(matches!(result, Err(PipelineError::ValidationError(msg)) if msg.contains("n1")));
    }

    #[test]
    fn test_validate_valid_request() {
        let req = request(json!({ "nodes": [
            { "id": "n1", "type": "source", "name": "Users", "config": { "dataSourceId": "" } },
            { "id": "n2", "type": "aggregate", "name": "Later" }
        ]}));

        assert!(validate_pipeline_request(&req).is_ok());
    }
}
