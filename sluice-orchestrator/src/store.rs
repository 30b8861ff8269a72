//! PostgreSQL-backed stores for the execution engine

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sluice_core::domain::connection::Connection;
use sluice_core::domain::execution::{Execution, ExecutionStatus, ExecutionUpdate};
use sluice_engine::store::{ConnectionRegistry, ExecutionStore, PipelineStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::{connection_repository, execution_repository, pipeline_repository};

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

pub struct PgConnectionRegistry {
    pool: PgPool,
}

impl PgConnectionRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionRegistry for PgConnectionRegistry {
    async fn get_by_id(&self, id: Uuid) -> Result<Connection, StoreError> {
        connection_repository::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?
            .ok_or_else(|| StoreError::NotFound(format!("Connection {id}")))
    }
}

pub struct PgExecutionStore {
    pool: PgPool,
}

impl PgExecutionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionStore for PgExecutionStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Execution, StoreError> {
        execution_repository::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?
            .ok_or_else(|| StoreError::NotFound(format!("Execution {id}")))
    }

    async fn update(&self, id: Uuid, update: ExecutionUpdate) -> Result<(), StoreError> {
        let updated = execution_repository::update(&self.pool, id, update)
            .await
            .map_err(backend)?;

        if !updated {
            return Err(StoreError::NotFound(format!("Execution {id}")));
        }
        Ok(())
    }
}

pub struct PgPipelineStore {
    pool: PgPool,
}

impl PgPipelineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PipelineStore for PgPipelineStore {
    async fn stamp_last_run(
        &self,
        pipeline_id: Uuid,
        at: DateTime<Utc>,
        status: ExecutionStatus,
    ) -> Result<(), StoreError> {
        let updated = pipeline_repository::stamp_last_run(&self.pool, pipeline_id, at, status)
            .await
            .map_err(backend)?;

        if !updated {
            // Pipeline deleted while it was running
            tracing::warn!("Pipeline {} vanished before its run was stamped", pipeline_id);
        }
        Ok(())
    }
}
