//! Source and destination adapters
//!
//! One adapter per connection type. The [`AdapterRegistry`] is the single
//! place that decides which connection types can be read from or written
//! to; a type with no entry is reported as unsupported by the node processor.

mod database;
mod destination;
mod rest;

pub use database::{DatabaseSource, Dialect};
pub use destination::{AcknowledgeDestination, LocalFileDestination};
pub use rest::{RestSource, normalize_body};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sluice_core::domain::connection::ConnectionType;
use sluice_core::domain::node::Node;
use sluice_core::domain::outcome::DestinationResult;
use sluice_core::domain::record::RecordSet;
use sluice_core::dto::connection::ConnectionTestResult;
use sluice_core::dto::preview::{PreviewRequest, PreviewResponse};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::AdapterError;

/// Decrypted configuration of one connection
///
/// Lives only for the duration of a single adapter call and never prints its
/// contents.
pub struct ConnectionConfig {
    connection_type: ConnectionType,
    value: Value,
}

impl ConnectionConfig {
    pub fn new(connection_type: ConnectionType, value: Value) -> Self {
        Self {
            connection_type,
            value,
        }
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    /// Reads the config as the adapter-specific settings type
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, AdapterError> {
        T::deserialize(&self.value)
            .map_err(|e| AdapterError::InvalidConnectionConfig(e.to_string()))
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("connection_type", &self.connection_type)
            .field("value", &"[HIDDEN]")
            .finish()
    }
}

/// Reads records from an external system
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Fetches the full record set a source node asks for
    ///
    /// # Arguments
    /// * `connection` - Decrypted config of the node's connection
    /// * `node` - The source node; its config carries query/table/endpoint options
    async fn fetch(
        &self,
        connection: &ConnectionConfig,
        node: &Node,
    ) -> Result<RecordSet, AdapterError>;

    /// Samples at most `limit` records for display
    async fn preview(
        &self,
        connection: &ConnectionConfig,
        request: &PreviewRequest,
        limit: u64,
    ) -> Result<PreviewResponse, AdapterError>;

    /// Checks reachability; failures are reported in the result
    async fn test_connection(&self, connection: &ConnectionConfig) -> ConnectionTestResult;
}

/// Delivers the final record set of a pipeline
#[async_trait]
pub trait DestinationAdapter: Send + Sync {
    async fn write(
        &self,
        connection: &ConnectionConfig,
        node: &Node,
        records: &RecordSet,
    ) -> Result<DestinationResult, AdapterError>;
}

/// Connection type to adapter mapping
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    sources: HashMap<ConnectionType, Arc<dyn SourceAdapter>>,
    destinations: HashMap<ConnectionType, Arc<dyn DestinationAdapter>>,
}

impl AdapterRegistry {
    /// Empty registry; every connection type is unsupported
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in database, REST and local file adapters
    pub fn with_defaults(config: &EngineConfig) -> Self {
        let acknowledge: Arc<dyn DestinationAdapter> = Arc::new(AcknowledgeDestination);

        Self::new()
            .with_source(
                ConnectionType::Postgresql,
                Arc::new(DatabaseSource::new(Dialect::Postgres, config)),
            )
            .with_source(
                ConnectionType::Mysql,
                Arc::new(DatabaseSource::new(Dialect::MySql, config)),
            )
            .with_source(ConnectionType::RestApi, Arc::new(RestSource::new(config)))
            .with_destination(ConnectionType::LocalFile, Arc::new(LocalFileDestination))
            .with_destination(ConnectionType::Postgresql, acknowledge.clone())
            .with_destination(ConnectionType::Mysql, acknowledge.clone())
            .with_destination(ConnectionType::RestApi, acknowledge)
    }

    pub fn with_source(
        mut self,
        connection_type: ConnectionType,
        adapter: Arc<dyn SourceAdapter>,
    ) -> Self {
        self.sources.insert(connection_type, adapter);
        self
    }

    pub fn with_destination(
        mut self,
        connection_type: ConnectionType,
        adapter: Arc<dyn DestinationAdapter>,
    ) -> Self {
        self.destinations.insert(connection_type, adapter);
        self
    }

    pub fn source(&self, connection_type: ConnectionType) -> Option<Arc<dyn SourceAdapter>> {
        self.sources.get(&connection_type).cloned()
    }

    pub fn destination(
        &self,
        connection_type: ConnectionType,
    ) -> Option<Arc<dyn DestinationAdapter>> {
        self.destinations.get(&connection_type).cloned()
    }
}
