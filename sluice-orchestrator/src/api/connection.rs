//! Connection API Handlers
//!
//! HTTP endpoints for data connections.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sluice_core::dto::connection::{ConnectionSummary, ConnectionTestResult, CreateConnection};
use sluice_core::dto::preview::{PreviewRequest, PreviewResponse};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::service::connection_service;
use crate::state::AppState;

/// POST /connection/create
/// Register a connection; the config is stored encrypted
pub async fn create_connection(
    State(state): State<AppState>,
    Json(req): Json<CreateConnection>,
) -> ApiResult<(StatusCode, Json<ConnectionSummary>)> {
    tracing::info!("Creating {} connection: {}", req.connection_type, req.name);

    let connection =
        connection_service::create_connection(&state.pool, &state.credentials, req).await?;

    Ok((StatusCode::CREATED, Json(connection.into())))
}

/// GET /connection/list
/// List all connections
pub async fn list_connections(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ConnectionSummary>>> {
    tracing::debug!("Listing all connections");

    let connections = connection_service::list_connections(&state.pool).await?;

    Ok(Json(connections))
}

/// DELETE /connection/{id}
/// Delete a connection
pub async fn delete_connection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting connection: {}", id);

    connection_service::delete_connection(&state.pool, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /connection/{id}/test
/// Check that a connection is reachable
pub async fn test_connection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ConnectionTestResult>> {
    tracing::info!("Testing connection: {}", id);

    let result = connection_service::test_connection(&state.pool, &state.inspector, id).await?;

    Ok(Json(result))
}

/// POST /connection/{id}/preview
/// Sample a connection's data
pub async fn preview_connection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    req: Option<Json<PreviewRequest>>,
) -> ApiResult<Json<PreviewResponse>> {
    tracing::debug!("Previewing connection: {}", id);

    let req = req.map(|Json(req)| req).unwrap_or_default();
    let preview = connection_service::preview_connection(&state.inspector, id, req).await?;

    Ok(Json(preview))
}
