//! Error types for the execution engine
//!
//! Node-level errors ([`NodeError`]) are folded into an execution's error
//! count and transcript. Only [`EngineError`] escapes `PipelineEngine::execute`.

use sluice_core::domain::connection::ConnectionType;
use thiserror::Error;
use uuid::Uuid;

use crate::condition::ConditionError;
use crate::store::StoreError;

/// Failures of the connection credential store
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Ciphertext is malformed or the key does not match
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Plaintext decrypted fine but is not the expected JSON document
    #[error("Invalid connection config: {0}")]
    InvalidConfig(String),
}

/// Failures inside a source or destination adapter
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("No query or table specified")]
    NoQueryOrTable,

    #[error("No tables found in database")]
    NoTablesFound,

    #[error("Invalid connection config: {0}")]
    InvalidConnectionConfig(String),

    #[error("Invalid node config: {0}")]
    InvalidNodeConfig(String),

    /// Could not reach the database or API
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The query or request ran but failed
    #[error("Source fetch error: {0}")]
    SourceFetch(String),

    #[error("Database preview error: {0}")]
    DatabasePreview(String),

    #[error("API preview error: {0}")]
    ApiPreview(String),

    #[error("Preview not supported for {0}")]
    PreviewUnsupported(ConnectionType),
}

/// Failure of a single node
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("{0}")]
    MissingConfig(String),

    #[error("Invalid node config: {0}")]
    InvalidConfig(String),

    #[error("Data source {0} not found")]
    ConnectionNotFound(Uuid),

    #[error("Unsupported source type: {0}")]
    UnsupportedSourceType(ConnectionType),

    #[error("Unsupported destination type: {0}")]
    UnsupportedDestinationType(ConnectionType),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error("Connection registry error: {0}")]
    Registry(StoreError),
}

/// Coarse grouping of node errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Connection,
    UnsupportedType,
    Decryption,
}

impl NodeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            NodeError::MissingConfig(_)
            | NodeError::InvalidConfig(_)
            | NodeError::Condition(_)
            | NodeError::Adapter(
                AdapterError::NoQueryOrTable
                | AdapterError::NoTablesFound
                | AdapterError::InvalidNodeConfig(_)
                | AdapterError::InvalidConnectionConfig(_),
            ) => ErrorCategory::Config,
            NodeError::UnsupportedSourceType(_)
            | NodeError::UnsupportedDestinationType(_)
            | NodeError::Adapter(AdapterError::PreviewUnsupported(_)) => {
                ErrorCategory::UnsupportedType
            }
            NodeError::Credential(_) => ErrorCategory::Decryption,
            NodeError::ConnectionNotFound(_)
            | NodeError::Registry(_)
            | NodeError::Adapter(_) => ErrorCategory::Connection,
        }
    }
}

/// Failure to turn a connection id into a decrypted config
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Data source {0} not found")]
    NotFound(Uuid),

    #[error("Connection registry error: {0}")]
    Registry(StoreError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl From<ResolveError> for NodeError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(id) => NodeError::ConnectionNotFound(id),
            ResolveError::Registry(e) => NodeError::Registry(e),
            ResolveError::Credential(e) => NodeError::Credential(e),
        }
    }
}

impl From<ResolveError> for InspectError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(id) => InspectError::ConnectionNotFound(id),
            ResolveError::Registry(e) => InspectError::Registry(e),
            ResolveError::Credential(e) => InspectError::Credential(e),
        }
    }
}

/// Fatal errors that abort a pipeline run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Execution {0} not found")]
    ExecutionNotFound(Uuid),

    #[error("Execution store error: {0}")]
    ExecutionStore(StoreError),

    #[error("Pipeline store error: {0}")]
    PipelineStore(StoreError),
}

/// Errors of the connection inspection helpers (preview and test)
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("Data source {0} not found")]
    ConnectionNotFound(Uuid),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("Connection registry error: {0}")]
    Registry(StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            NodeError::MissingConfig("x".to_string()).category(),
            ErrorCategory::Config
        );
        assert_eq!(
            NodeError::Adapter(AdapterError::NoQueryOrTable).category(),
            ErrorCategory::Config
        );
        assert_eq!(
            NodeError::Adapter(AdapterError::Connection("refused".to_string())).category(),
            ErrorCategory::Connection
        );
        assert_eq!(
            NodeError::UnsupportedSourceType(ConnectionType::AwsS3).category(),
            ErrorCategory::UnsupportedType
        );
        assert_eq!(
            NodeError::Credential(CredentialError::Decryption("bad".to_string())).category(),
            ErrorCategory::Decryption
        );
    }

    #[test]
    fn test_messages_are_carried_verbatim() {
        let err = NodeError::Adapter(AdapterError::SourceFetch(
            "relation \"Users\" does not exist".to_string(),
        ));
        assert_eq!(
            err.to_string(),
            "Source fetch error: relation \"Users\" does not exist"
        );
    }
}
