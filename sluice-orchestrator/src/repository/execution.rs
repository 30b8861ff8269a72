//! Execution Repository
//!
//! Handles database operations for pipeline executions.

use chrono::{DateTime, Utc};
use sluice_core::domain::execution::{Execution, ExecutionStatus, ExecutionUpdate};
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a new execution in `running`
pub async fn create(pool: &PgPool, pipeline_id: Uuid) -> Result<Execution, sqlx::Error> {
    let execution = Execution::start(pipeline_id);

    sqlx::query(
        r#"
        INSERT INTO pipeline_executions (id, pipeline_id, status, started_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(execution.id)
    .bind(execution.pipeline_id)
    .bind(execution.status.as_str())
    .bind(execution.started_at)
    .execute(pool)
    .await?;

    Ok(execution)
}

/// Find an execution by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Execution>, sqlx::Error> {
    let row = sqlx::query_as::<_, ExecutionRow>(
        r#"
        SELECT id, pipeline_id, status, started_at, completed_at, logs,
               records_processed, errors_count, error_message
        FROM pipeline_executions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List executions of a pipeline, most recent first
pub async fn list_by_pipeline(
    pool: &PgPool,
    pipeline_id: Uuid,
) -> Result<Vec<Execution>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ExecutionRow>(
        r#"
        SELECT id, pipeline_id, status, started_at, completed_at, logs,
               records_processed, errors_count, error_message
        FROM pipeline_executions
        WHERE pipeline_id = $1
        ORDER BY started_at DESC
        "#,
    )
    .bind(pipeline_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Apply a partial update; `None` fields keep their stored value
pub async fn update(pool: &PgPool, id: Uuid, update: ExecutionUpdate) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE pipeline_executions
        SET status = $1,
            completed_at = COALESCE($2, completed_at),
            logs = COALESCE($3, logs),
            records_processed = COALESCE($4, records_processed),
            errors_count = COALESCE($5, errors_count),
            error_message = COALESCE($6, error_message)
        WHERE id = $7
        "#,
    )
    .bind(update.status.as_str())
    .bind(update.completed_at)
    .bind(update.logs)
    .bind(update.records_processed.map(|n| n as i64))
    .bind(update.errors_count.map(|n| n as i64))
    .bind(update.error_message)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ExecutionRow {
    id: Uuid,
    pipeline_id: Uuid,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    logs: String,
    records_processed: i64,
    errors_count: i64,
    error_message: Option<String>,
}

impl From<ExecutionRow> for Execution {
    fn from(row: ExecutionRow) -> Self {
        Execution {
            id: row.id,
            pipeline_id: row.pipeline_id,
            // Unknown statuses only come from manual edits; treat them as failed
            status: ExecutionStatus::parse(&row.status).unwrap_or(ExecutionStatus::Failed),
            started_at: row.started_at,
            completed_at: row.completed_at,
            logs: row.logs,
            records_processed: row.records_processed.max(0) as u64,
            errors_count: row.errors_count.max(0) as u64,
            error_message: row.error_message,
        }
    }
}
