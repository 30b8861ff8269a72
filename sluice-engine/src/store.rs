//! Store layer
//!
//! The engine reads connections and writes execution progress through
//! these traits. The orchestrator implements them over PostgreSQL, the CLI
//! and the tests use the in-memory versions from [`crate::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sluice_core::domain::connection::Connection;
use sluice_core::domain::execution::{Execution, ExecutionStatus, ExecutionUpdate};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

/// Read access to stored connections
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Fetches a connection with its still-encrypted config
    ///
    /// Returns [`StoreError::NotFound`] when no connection has this id.
    async fn get_by_id(&self, id: Uuid) -> Result<Connection, StoreError>;
}

/// Execution records
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Execution, StoreError>;

    /// Applies a partial update to an execution
    ///
    /// # Arguments
    /// * `id` - The execution to update
    /// * `update` - Fields to overwrite; `None` fields stay as they are
    async fn update(&self, id: Uuid, update: ExecutionUpdate) -> Result<(), StoreError>;
}

/// Pipeline bookkeeping written at the end of a run
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Records when the pipeline last ran and how it ended
    async fn stamp_last_run(
        &self,
        pipeline_id: Uuid,
        at: DateTime<Utc>,
        status: ExecutionStatus,
    ) -> Result<(), StoreError>;
}
