//! Connection Repository
//!
//! Connections are stored with their config already encrypted.

use chrono::{DateTime, Utc};
use sluice_core::domain::connection::{Connection, ConnectionStatus, ConnectionType};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a new connection
pub async fn create(
    pool: &PgPool,
    name: &str,
    connection_type: ConnectionType,
    encrypted_config: String,
) -> Result<Connection, sqlx::Error> {
    let connection = Connection {
        id: Uuid::new_v4(),
        name: name.to_string(),
        connection_type,
        encrypted_config,
        status: ConnectionStatus::Active,
        last_tested_at: None,
        last_test_status: None,
    };

    sqlx::query(
        r#"
        INSERT INTO connections (id, name, type, encrypted_config, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(connection.id)
    .bind(&connection.name)
    .bind(connection.connection_type.as_str())
    .bind(&connection.encrypted_config)
    .bind(connection.status.as_str())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(connection)
}

/// Find a connection by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Connection>, sqlx::Error> {
    let row = sqlx::query_as::<_, ConnectionRow>(
        r#"
        SELECT id, name, type, encrypted_config, status, last_tested_at, last_test_status
        FROM connections
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Connection::try_from).transpose()
}

/// List all connections
pub async fn list_all(pool: &PgPool) -> Result<Vec<Connection>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ConnectionRow>(
        r#"
        SELECT id, name, type, encrypted_config, status, last_tested_at, last_test_status
        FROM connections
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Connection::try_from).collect()
}

/// Store the outcome of a connectivity test
pub async fn record_test(
    pool: &PgPool,
    id: Uuid,
    at: DateTime<Utc>,
    test_status: &str,
    status: ConnectionStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE connections
        SET last_tested_at = $1, last_test_status = $2, status = $3
        WHERE id = $4
        "#,
    )
    .bind(at)
    .bind(test_status)
    .bind(status.as_str())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a connection by ID
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM connections WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ConnectionRow {
    id: Uuid,
    name: String,
    #[sqlx(rename = "type")]
    connection_type: String,
    encrypted_config: String,
    status: String,
    last_tested_at: Option<DateTime<Utc>>,
    last_test_status: Option<String>,
}

impl TryFrom<ConnectionRow> for Connection {
    type Error = sqlx::Error;

    fn try_from(row: ConnectionRow) -> Result<Self, Self::Error> {
        let connection_type = ConnectionType::parse(&row.connection_type).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown connection type '{}'", row.connection_type).into())
        })?;

        Ok(Connection {
            id: row.id,
            name: row.name,
            connection_type,
            encrypted_config: row.encrypted_config,
            status: ConnectionStatus::parse(&row.status).unwrap_or_default(),
            last_tested_at: row.last_tested_at,
            last_test_status: row.last_test_status,
        })
    }
}
