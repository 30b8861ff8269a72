//! Execution Service
//!
//! Runs pipelines through the engine and exposes their execution history.

use sluice_core::domain::execution::Execution;
use sluice_core::dto::execution::ExecutionResponse;
use sluice_engine::PipelineEngine;
use sluice_engine::error::EngineError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::{execution_repository, pipeline_repository};

/// Service error type
#[derive(Debug)]
pub enum ExecutionError {
    NotFound(Uuid),
    PipelineNotFound(Uuid),
    /// The run was aborted; the execution record says why
    Aborted {
        execution_id: Uuid,
        error: EngineError,
    },
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for ExecutionError {
    fn from(err: sqlx::Error) -> Self {
        ExecutionError::DatabaseError(err)
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;

/// Create an execution for the pipeline and run it to completion
pub async fn execute_pipeline(
    pool: &PgPool,
    engine: &PipelineEngine,
    pipeline_id: Uuid,
) -> Result<ExecutionResponse> {
    let pipeline = pipeline_repository::find_by_id(pool, pipeline_id)
        .await?
        .ok_or(ExecutionError::PipelineNotFound(pipeline_id))?;

    let execution = execution_repository::create(pool, pipeline.id).await?;
    tracing::info!(
        "Execution {} started for pipeline {} ({})",
        execution.id,
        pipeline.name,
        pipeline.id
    );

    let outcome = engine
        .execute(&pipeline, execution.id)
        .await
        .map_err(|error| ExecutionError::Aborted {
            execution_id: execution.id,
            error,
        })?;

    Ok(ExecutionResponse::from(outcome).with_execution_id(execution.id))
}

/// Get an execution by ID
pub async fn get_execution(pool: &PgPool, id: Uuid) -> Result<Execution> {
    execution_repository::find_by_id(pool, id)
        .await?
        .ok_or(ExecutionError::NotFound(id))
}

/// List the executions of a pipeline, most recent first
pub async fn list_executions(pool: &PgPool, pipeline_id: Uuid) -> Result<Vec<Execution>> {
    pipeline_repository::find_by_id(pool, pipeline_id)
        .await?
        .ok_or(ExecutionError::PipelineNotFound(pipeline_id))?;

    Ok(execution_repository::list_by_pipeline(pool, pipeline_id).await?)
}
