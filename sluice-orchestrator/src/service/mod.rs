//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories and the engine.

pub mod connection;
pub mod execution;
pub mod pipeline;

// Re-export for convenience
pub use connection as connection_service;
pub use execution as execution_service;
pub use pipeline as pipeline_service;
