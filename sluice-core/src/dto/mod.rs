//! Data Transfer Objects
//!
//! Request and response shapes used by the orchestrator HTTP API and the
//! CLI. DTOs are lightweight projections of the domain types.

pub mod connection;
pub mod execution;
pub mod pipeline;
pub mod preview;
