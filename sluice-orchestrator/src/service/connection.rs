//! Connection Service
//!
//! Registration, testing and preview of data connections. Configs are
//! encrypted before they reach the repository and are never returned.

use chrono::Utc;
use sluice_core::domain::connection::{Connection, ConnectionStatus};
use sluice_core::dto::connection::{ConnectionSummary, ConnectionTestResult, CreateConnection};
use sluice_core::dto::preview::{PreviewRequest, PreviewResponse};
use sluice_engine::error::{CredentialError, InspectError};
use sluice_engine::{ConnectionInspector, CredentialStore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::connection_repository;

/// Service error type
#[derive(Debug)]
pub enum ConnectionError {
    NotFound(Uuid),
    ValidationError(String),
    Credential(CredentialError),
    Inspect(InspectError),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for ConnectionError {
    fn from(err: sqlx::Error) -> Self {
        ConnectionError::DatabaseError(err)
    }
}

impl From<InspectError> for ConnectionError {
    fn from(err: InspectError) -> Self {
        match err {
            InspectError::ConnectionNotFound(id) => ConnectionError::NotFound(id),
            other => ConnectionError::Inspect(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConnectionError>;

/// Register a connection, encrypting its config
pub async fn create_connection(
    pool: &PgPool,
    credentials: &CredentialStore,
    req: CreateConnection,
) -> Result<Connection> {
    validate_connection_request(&req)?;

    let encrypted = credentials
        .seal(&req.config)
        .map_err(ConnectionError::Credential)?;
    let connection =
        connection_repository::create(pool, req.name.trim(), req.connection_type, encrypted)
            .await?;

    tracing::info!(
        "Connection created: {} ({}, {})",
        connection.name,
        connection.id,
        connection.connection_type
    );

    Ok(connection)
}

/// List all connections, without their configs
pub async fn list_connections(pool: &PgPool) -> Result<Vec<ConnectionSummary>> {
    let connections = connection_repository::list_all(pool).await?;
    Ok(connections.into_iter().map(ConnectionSummary::from).collect())
}

/// Delete a connection
pub async fn delete_connection(pool: &PgPool, id: Uuid) -> Result<()> {
    let deleted = connection_repository::delete(pool, id).await?;

    if !deleted {
        return Err(ConnectionError::NotFound(id));
    }

    tracing::info!("Connection deleted: {}", id);

    Ok(())
}

/// Test a connection and record the outcome on it
pub async fn test_connection(
    pool: &PgPool,
    inspector: &ConnectionInspector,
    id: Uuid,
) -> Result<ConnectionTestResult> {
    let result = inspector.test(id).await?;

    let status = if result.success {
        ConnectionStatus::Active
    } else {
        ConnectionStatus::Error
    };
    connection_repository::record_test(pool, id, Utc::now(), result.status_label(), status)
        .await?;

    Ok(result)
}

/// Sample a connection's data
pub async fn preview_connection(
    inspector: &ConnectionInspector,
    id: Uuid,
    req: PreviewRequest,
) -> Result<PreviewResponse> {
    Ok(inspector.preview(id, &req).await?)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_connection_request(req: &CreateConnection) -> Result<()> {
    if req.name.trim().is_empty() {
        return Err(ConnectionError::ValidationError(
            "Connection name cannot be empty".to_string(),
        ));
    }

    if req.name.len() > 255 {
        return Err(ConnectionError::ValidationError(
            "Connection name is too long (max 255 characters)".to_string(),
        ));
    }

    if !req.config.is_object() {
        return Err(ConnectionError::ValidationError(
            "Connection config must be a JSON object".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sluice_core::domain::connection::ConnectionType;

    fn request(name: &str, config: serde_json::Value) -> CreateConnection {
        CreateConnection {
            name: name.to_string(),
            connection_type: ConnectionType::RestApi,
            config,
        }
    }

    #[test]
    fn test_validate_connection_request() {
        assert!(validate_connection_request(&request("API", json!({ "baseUrl": "x" }))).is_ok());
        assert!(matches!(
            validate_connection_request(&request("", json!({}))),
            Err(ConnectionError::ValidationError(_))
        ));
        assert!(matches!(
            validate_connection_request(&request("API", json!("plain"))),
            Err(ConnectionError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_connection_maps_to_not_found() {
        let id = Uuid::new_v4();
        assert!(matches!(
            ConnectionError::from(InspectError::ConnectionNotFound(id)),
            ConnectionError::NotFound(found) if found == id
        ));
    }
}
