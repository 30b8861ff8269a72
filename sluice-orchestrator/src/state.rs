//! Shared application state

use sluice_engine::adapter::AdapterRegistry;
use sluice_engine::{
    ConnectionInspector, ConnectionResolver, CredentialKey, CredentialStore, NodeProcessor,
    PipelineEngine,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::store::{PgConnectionRegistry, PgExecutionStore, PgPipelineStore};

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub credentials: Arc<CredentialStore>,
    pub engine: Arc<PipelineEngine>,
    pub inspector: Arc<ConnectionInspector>,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        let credentials = Arc::new(CredentialStore::new(CredentialKey::derive(&config.secret)));
        let adapters = Arc::new(AdapterRegistry::with_defaults(&config.engine));
        let resolver = ConnectionResolver::new(
            Arc::new(PgConnectionRegistry::new(pool.clone())),
            credentials.clone(),
        );

        let processor = NodeProcessor::new(resolver.clone(), adapters.clone(), config.engine.clone());
        let engine = PipelineEngine::new(
            Arc::new(PgExecutionStore::new(pool.clone())),
            Arc::new(PgPipelineStore::new(pool.clone())),
            processor,
        );
        let inspector = ConnectionInspector::new(resolver, adapters, &config.engine);

        Self {
            pool,
            credentials,
            engine: Arc::new(engine),
            inspector: Arc::new(inspector),
        }
    }
}
