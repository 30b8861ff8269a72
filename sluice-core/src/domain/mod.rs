//! Core domain types
//!
//! This module contains the core domain structures used across Sluice crates.
//! These types are shared between the orchestrator (for persistence), the CLI
//! and the execution engine.

pub mod connection;
pub mod execution;
pub mod node;
pub mod outcome;
pub mod pipeline;
pub mod record;
