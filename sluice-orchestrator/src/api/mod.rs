//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod connection;
pub mod error;
pub mod execution;
pub mod health;
pub mod pipeline;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route("/pipeline/create", post(pipeline::create_pipeline))
        .route("/pipeline/list", get(pipeline::list_pipelines))
        .route("/pipeline/{id}", get(pipeline::get_pipeline))
        .route("/pipeline/{id}", delete(pipeline::delete_pipeline))
        // Execution endpoints
        .route("/pipeline/{id}/execute", post(execution::execute_pipeline))
        .route("/pipeline/{id}/executions", get(execution::list_executions))
        .route("/execution/{id}", get(execution::get_execution))
        // Connection endpoints
        .route("/connection/create", post(connection::create_connection))
        .route("/connection/list", get(connection::list_connections))
        .route("/connection/{id}", delete(connection::delete_connection))
        .route("/connection/{id}/test", post(connection::test_connection))
        .route("/connection/{id}/preview", post(connection::preview_connection))
        // Add state and middleware
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
