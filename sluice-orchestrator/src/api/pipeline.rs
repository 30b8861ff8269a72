//! Pipeline API Handlers
//!
//! HTTP endpoints for pipeline management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sluice_core::domain::pipeline::Pipeline;
use sluice_core::dto::pipeline::{CreatePipeline, PipelineSummary};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::service::pipeline_service;
use crate::state::AppState;

/// POST /pipeline/create
/// Create a new pipeline
pub async fn create_pipeline(
    State(state): State<AppState>,
    Json(req): Json<CreatePipeline>,
) -> ApiResult<(StatusCode, Json<Pipeline>)> {
    tracing::info!("Creating pipeline: {}", req.name);

    let pipeline = pipeline_service::create_pipeline(&state.pool, req).await?;

    Ok((StatusCode::CREATED, Json(pipeline)))
}

/// GET /pipeline/list
/// List all pipelines
pub async fn list_pipelines(State(state): State<AppState>) -> ApiResult<Json<Vec<PipelineSummary>>> {
    tracing::debug!("Listing all pipelines");

    let pipelines = pipeline_service::list_pipelines(&state.pool).await?;

    Ok(Json(pipelines))
}

/// GET /pipeline/{id}
/// Get pipeline by ID
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Pipeline>> {
    tracing::debug!("Getting pipeline: {}", id);

    let pipeline = pipeline_service::get_pipeline(&state.pool, id).await?;

    Ok(Json(pipeline))
}

/// DELETE /pipeline/{id}
/// Delete a pipeline
pub async fn delete_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting pipeline: {}", id);

    pipeline_service::delete_pipeline(&state.pool, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
