//! Connection resolution
//!
//! Looks a connection up by id and decrypts its config for one adapter call.

use sluice_core::domain::connection::Connection;
use std::sync::Arc;
use uuid::Uuid;

use crate::adapter::ConnectionConfig;
use crate::crypto::CredentialStore;
use crate::error::ResolveError;
use crate::store::{ConnectionRegistry, StoreError};

#[derive(Clone)]
pub struct ConnectionResolver {
    registry: Arc<dyn ConnectionRegistry>,
    credentials: Arc<CredentialStore>,
}

impl ConnectionResolver {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            registry,
            credentials,
        }
    }

    /// Fetches the connection and decrypts its config
    pub async fn resolve(&self, id: Uuid) -> Result<(Connection, ConnectionConfig), ResolveError> {
        let connection = self.registry.get_by_id(id).await.map_err(|e| match e {
            StoreError::NotFound(_) => ResolveError::NotFound(id),
            other => ResolveError::Registry(other),
        })?;

        let value = self.credentials.open(&connection.encrypted_config)?;
        let config = ConnectionConfig::new(connection.connection_type, value);

        Ok((connection, config))
    }
}
