//! Sluice pipeline execution engine
//!
//! - [`engine`]: runs a pipeline's nodes in order and records the execution
//! - [`processor`]: executes one node against the current record set
//! - [`adapter`]: per-connection-type sources and destinations
//! - [`condition`]: the filter condition language
//! - [`crypto`]: encryption of stored connection configs
//! - [`store`]: traits for the stores the engine reads and writes

pub mod adapter;
pub mod condition;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod inspect;
pub mod memory;
pub mod processor;
pub mod resolve;
pub mod store;
pub mod validation;

pub use config::EngineConfig;
pub use crypto::{CredentialKey, CredentialStore};
pub use engine::PipelineEngine;
pub use inspect::ConnectionInspector;
pub use processor::NodeProcessor;
pub use resolve::ConnectionResolver;
