//! Pipeline Repository
//!
//! Handles all database operations related to pipelines.

use chrono::{DateTime, Utc};
use sluice_core::domain::execution::ExecutionStatus;
use sluice_core::domain::pipeline::{Pipeline, PipelineDefinition, PipelineStatus};
use sluice_core::dto::pipeline::CreatePipeline;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

const PIPELINE_COLUMNS: &str = "id, name, description, definition, status, last_run_at, \
                                last_run_status, created_at, updated_at";

/// Create a new pipeline in the database
pub async fn create(pool: &PgPool, req: CreatePipeline) -> Result<Pipeline, sqlx::Error> {
    let now = Utc::now();

    let pipeline = Pipeline {
        id: Uuid::new_v4(),
        name: req.name,
        description: req.description,
        definition: req.definition,
        status: req.status.unwrap_or_default(),
        last_run_at: None,
        last_run_status: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO pipelines (id, name, description, definition, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(pipeline.id)
    .bind(&pipeline.name)
    .bind(&pipeline.description)
    .bind(Json(&pipeline.definition))
    .bind(pipeline.status.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(pipeline)
}

/// Find a pipeline by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Pipeline>, sqlx::Error> {
    let sql = format!("SELECT {PIPELINE_COLUMNS} FROM pipelines WHERE id = $1");
    let row = sqlx::query_as::<_, PipelineRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|r| r.into()))
}

/// List all pipelines
pub async fn list_all(pool: &PgPool) -> Result<Vec<Pipeline>, sqlx::Error> {
    let sql = format!("SELECT {PIPELINE_COLUMNS} FROM pipelines ORDER BY updated_at DESC");
    let rows = sqlx::query_as::<_, PipelineRow>(&sql)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Record when a pipeline last ran and how the run ended
pub async fn stamp_last_run(
    pool: &PgPool,
    id: Uuid,
    at: DateTime<Utc>,
    status: ExecutionStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE pipelines SET last_run_at = $1, last_run_status = $2 WHERE id = $3",
    )
    .bind(at)
    .bind(status.as_str())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a pipeline by ID
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM pipelines WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    definition: Json<PipelineDefinition>,
    status: String,
    last_run_at: Option<DateTime<Utc>>,
    last_run_status: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PipelineRow> for Pipeline {
    fn from(row: PipelineRow) -> Self {
        Pipeline {
            id: row.id,
            name: row.name,
            description: row.description,
            definition: row.definition.0,
            status: PipelineStatus::parse(&row.status).unwrap_or_default(),
            last_run_at: row.last_run_at,
            last_run_status: row
                .last_run_status
                .as_deref()
                .and_then(ExecutionStatus::parse),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
