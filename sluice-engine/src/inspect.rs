//! Connection preview and testing

use sluice_core::dto::connection::ConnectionTestResult;
use sluice_core::dto::preview::{PreviewRequest, PreviewResponse};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::adapter::AdapterRegistry;
use crate::config::EngineConfig;
use crate::error::{AdapterError, InspectError};
use crate::resolve::ConnectionResolver;

pub struct ConnectionInspector {
    resolver: ConnectionResolver,
    adapters: Arc<AdapterRegistry>,
    default_limit: u64,
}

impl ConnectionInspector {
    pub fn new(
        resolver: ConnectionResolver,
        adapters: Arc<AdapterRegistry>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            resolver,
            adapters,
            default_limit: config.default_preview_limit,
        }
    }

    /// Samples a connection's data
    ///
    /// For databases `request.query` is SQL, for REST APIs an endpoint path.
    pub async fn preview(
        &self,
        connection_id: Uuid,
        request: &PreviewRequest,
    ) -> Result<PreviewResponse, InspectError> {
        let (connection, config) = self.resolver.resolve(connection_id).await?;
        let adapter = self
            .adapters
            .source(connection.connection_type)
            .ok_or(AdapterError::PreviewUnsupported(connection.connection_type))?;

        let limit = request
            .limit
            .filter(|limit| *limit > 0)
            .unwrap_or(self.default_limit);
        let preview = adapter.preview(&config, request, limit).await?;

        info!(
            "Previewed {} rows from connection '{}'",
            preview.count, connection.name
        );
        Ok(preview)
    }

    /// Checks that a connection is reachable
    ///
    /// Lookup and decryption failures are errors; an unreachable endpoint is
    /// a failed result.
    pub async fn test(&self, connection_id: Uuid) -> Result<ConnectionTestResult, InspectError> {
        let (connection, config) = self.resolver.resolve(connection_id).await?;

        let result = match self.adapters.source(connection.connection_type) {
            Some(adapter) => adapter.test_connection(&config).await,
            None => ConnectionTestResult::failed("Connection test not implemented for this type"),
        };

        info!(
            "Tested connection '{}': {}",
            connection.name,
            result.status_label()
        );
        Ok(result)
    }
}
