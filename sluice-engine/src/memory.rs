//! In-memory stores
//!
//! Used by the CLI, where connections come from a JSON file and executions
//! never outlive the process, and by tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sluice_core::domain::connection::Connection;
use sluice_core::domain::execution::{Execution, ExecutionStatus, ExecutionUpdate};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::store::{ConnectionRegistry, ExecutionStore, PipelineStore, StoreError};

fn poisoned() -> StoreError {
    StoreError::Backend("store lock poisoned".to_string())
}

/// Connection registry backed by a map
#[derive(Debug, Default)]
pub struct MemoryConnectionRegistry {
    connections: Mutex<HashMap<Uuid, Connection>>,
}

impl MemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connections(connections: impl IntoIterator<Item = Connection>) -> Self {
        Self {
            connections: Mutex::new(connections.into_iter().map(|c| (c.id, c)).collect()),
        }
    }

    pub fn insert(&self, connection: Connection) -> Result<(), StoreError> {
        self.connections
            .lock()
            .map_err(|_| poisoned())?
            .insert(connection.id, connection);
        Ok(())
    }
}

#[async_trait]
impl ConnectionRegistry for MemoryConnectionRegistry {
    async fn get_by_id(&self, id: Uuid) -> Result<Connection, StoreError> {
        self.connections
            .lock()
            .map_err(|_| poisoned())?
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Connection {id}")))
    }
}

/// Execution store backed by a map
#[derive(Debug, Default)]
pub struct MemoryExecutionStore {
    executions: Mutex<HashMap<Uuid, Execution>>,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fresh `Running` execution for the pipeline and returns it
    pub fn start(&self, pipeline_id: Uuid) -> Result<Execution, StoreError> {
        let execution = Execution::start(pipeline_id);
        self.executions
            .lock()
            .map_err(|_| poisoned())?
            .insert(execution.id, execution.clone());
        Ok(execution)
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Execution, StoreError> {
        self.executions
            .lock()
            .map_err(|_| poisoned())?
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Execution {id}")))
    }

    async fn update(&self, id: Uuid, update: ExecutionUpdate) -> Result<(), StoreError> {
        let mut executions = self.executions.lock().map_err(|_| poisoned())?;
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Execution {id}")))?;
        execution.apply(update);
        Ok(())
    }
}

/// Last-run stamps keyed by pipeline
#[derive(Debug, Default)]
pub struct MemoryPipelineStore {
    last_runs: Mutex<HashMap<Uuid, (DateTime<Utc>, ExecutionStatus)>>,
}

impl MemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_run(&self, pipeline_id: Uuid) -> Option<(DateTime<Utc>, ExecutionStatus)> {
        self.last_runs
            .lock()
            .ok()
            .and_then(|runs| runs.get(&pipeline_id).copied())
    }
}

#[async_trait]
impl PipelineStore for MemoryPipelineStore {
    async fn stamp_last_run(
        &self,
        pipeline_id: Uuid,
        at: DateTime<Utc>,
        status: ExecutionStatus,
    ) -> Result<(), StoreError> {
        self.last_runs
            .lock()
            .map_err(|_| poisoned())?
            .insert(pipeline_id, (at, status));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execution_update_is_applied() {
        let store = MemoryExecutionStore::new();
        let execution = store.start(Uuid::new_v4()).unwrap();

        store
            .update(
                execution.id,
                ExecutionUpdate::finished("done\n".to_string(), 7, 0),
            )
            .await
            .unwrap();

        let stored = store.get_by_id(execution.id).await.unwrap();
        assert_eq!(stored.status, ExecutionStatus::Completed);
        assert_eq!(stored.records_processed, 7);
        assert_eq!(stored.logs, "done\n");
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_entries_are_not_found() {
        let store = MemoryExecutionStore::new();
        assert!(matches!(
            store.get_by_id(Uuid::new_v4()).await,
            Err(StoreError::NotFound(_))
        ));

        let registry = MemoryConnectionRegistry::new();
        assert!(matches!(
            registry.get_by_id(Uuid::new_v4()).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
