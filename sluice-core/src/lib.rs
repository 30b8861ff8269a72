//! Sluice Core
//!
//! Core types and abstractions for the Sluice data pipeline system.
//!
//! This crate contains:
//! - Domain types: Core business entities (Pipeline, Node, Connection, Execution, records)
//! - DTOs: Data transfer objects for the HTTP surface and the CLI

pub mod domain;
pub mod dto;
