//! Execution API Handlers
//!
//! HTTP endpoints for running pipelines and reading their history.

use axum::{
    Json,
    extract::{Path, State},
};
use sluice_core::domain::execution::Execution;
use sluice_core::dto::execution::ExecutionResponse;
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::service::execution_service;
use crate::state::AppState;

/// POST /pipeline/{id}/execute
/// Run a pipeline and wait for it to finish
pub async fn execute_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ExecutionResponse>> {
    tracing::info!("Executing pipeline: {}", id);

    let response = execution_service::execute_pipeline(&state.pool, &state.engine, id).await?;

    Ok(Json(response))
}

/// GET /pipeline/{id}/executions
/// List a pipeline's executions
pub async fn list_executions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Execution>>> {
    tracing::debug!("Listing executions of pipeline: {}", id);

    let executions = execution_service::list_executions(&state.pool, id).await?;

    Ok(Json(executions))
}

/// GET /execution/{id}
/// Get execution details, including the log transcript
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Execution>> {
    tracing::debug!("Getting execution: {}", id);

    let execution = execution_service::get_execution(&state.pool, id).await?;

    Ok(Json(execution))
}
