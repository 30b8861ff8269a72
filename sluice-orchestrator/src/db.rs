use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create pipelines table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            description TEXT,
            definition JSONB NOT NULL DEFAULT '{"nodes": []}',
            status VARCHAR(20) NOT NULL DEFAULT 'draft',
            last_run_at TIMESTAMPTZ,
            last_run_status VARCHAR(20),
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create connections table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS connections (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            type VARCHAR(50) NOT NULL,
            encrypted_config TEXT NOT NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'active',
            last_tested_at TIMESTAMPTZ,
            last_test_status VARCHAR(20),
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create executions table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_executions (
            id UUID PRIMARY KEY,
            pipeline_id UUID NOT NULL REFERENCES pipelines(id) ON DELETE CASCADE,
            status VARCHAR(20) NOT NULL,
            started_at TIMESTAMPTZ NOT NULL,
            completed_at TIMESTAMPTZ,
            logs TEXT NOT NULL DEFAULT '',
            records_processed BIGINT NOT NULL DEFAULT 0,
            errors_count BIGINT NOT NULL DEFAULT 0,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for execution history queries
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_executions_pipeline_id ON pipeline_executions(pipeline_id, started_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_executions_status ON pipeline_executions(status)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
