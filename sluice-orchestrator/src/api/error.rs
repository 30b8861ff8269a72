//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sluice_engine::error::{AdapterError, InspectError};
use uuid::Uuid;

use crate::service::{connection_service, execution_service, pipeline_service};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    DatabaseError(sqlx::Error),
    InternalError(String),
    /// A pipeline run aborted after its execution record was created
    ExecutionFailed {
        execution_id: Uuid,
        message: String,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Internal server error" }),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": msg }),
                )
            }
            ApiError::ExecutionFailed {
                execution_id,
                message,
            } => {
                tracing::error!("Execution {} failed: {}", execution_id, message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": message, "executionId": execution_id }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<pipeline_service::PipelineError> for ApiError {
    fn from(err: pipeline_service::PipelineError) -> Self {
        match err {
            pipeline_service::PipelineError::NotFound(id) => {
                ApiError::NotFound(format!("Pipeline {} not found", id))
            }
            pipeline_service::PipelineError::ValidationError(msg) => ApiError::BadRequest(msg),
            pipeline_service::PipelineError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<connection_service::ConnectionError> for ApiError {
    fn from(err: connection_service::ConnectionError) -> Self {
        match err {
            connection_service::ConnectionError::NotFound(id) => {
                ApiError::NotFound(format!("Data source {} not found", id))
            }
            connection_service::ConnectionError::ValidationError(msg) => ApiError::BadRequest(msg),
            connection_service::ConnectionError::Credential(err) => {
                ApiError::InternalError(err.to_string())
            }
            connection_service::ConnectionError::Inspect(err) => inspect_error(err),
            connection_service::ConnectionError::DatabaseError(err) => {
                ApiError::DatabaseError(err)
            }
        }
    }
}

impl From<execution_service::ExecutionError> for ApiError {
    fn from(err: execution_service::ExecutionError) -> Self {
        match err {
            execution_service::ExecutionError::NotFound(id) => {
                ApiError::NotFound(format!("Execution {} not found", id))
            }
            execution_service::ExecutionError::PipelineNotFound(id) => {
                ApiError::NotFound(format!("Pipeline {} not found", id))
            }
            execution_service::ExecutionError::Aborted {
                execution_id,
                error,
            } => ApiError::ExecutionFailed {
                execution_id,
                message: error.to_string(),
            },
            execution_service::ExecutionError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

fn inspect_error(err: InspectError) -> ApiError {
    match err {
        InspectError::ConnectionNotFound(id) => {
            ApiError::NotFound(format!("Data source {} not found", id))
        }
        InspectError::Adapter(
            err @ (AdapterError::PreviewUnsupported(_)
            | AdapterError::NoTablesFound
            | AdapterError::InvalidConnectionConfig(_)),
        ) => ApiError::BadRequest(err.to_string()),
        other => ApiError::InternalError(other.to_string()),
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::domain::connection::ConnectionType;

    #[test]
    fn test_status_codes() {
        let response = ApiError::NotFound("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError::from(pipeline_service::PipelineError::ValidationError(
            "bad".to_string(),
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = inspect_error(InspectError::Adapter(AdapterError::PreviewUnsupported(
            ConnectionType::LocalFile,
        )))
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = inspect_error(InspectError::Adapter(AdapterError::DatabasePreview(
            "relation does not exist".to_string(),
        )))
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
