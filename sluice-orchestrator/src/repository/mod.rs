//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository handles database operations for a specific domain entity.

pub mod connection;
pub mod execution;
pub mod pipeline;

// Re-export for convenience
pub use connection as connection_repository;
pub use execution as execution_repository;
pub use pipeline as pipeline_repository;
