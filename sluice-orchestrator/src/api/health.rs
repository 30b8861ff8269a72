//! Health Check API Handler

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::state::AppState;

/// GET /health
/// Reports OK when the metadata database answers
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
        }
    }
}
