//! Node processor
//!
//! Runs a single node against the current record set. The record set is only
//! replaced when the node succeeds, so a failing node leaves the data of the
//! previous stage in place for the rest of the run.

use sluice_core::domain::node::{
    ConnectionRef, Node, NodeType, TransformConfig, TransformKind, ValidateConfig,
};
use sluice_core::domain::outcome::DestinationResult;
use sluice_core::domain::record::RecordSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapter::AdapterRegistry;
use crate::condition::Filter;
use crate::config::EngineConfig;
use crate::error::NodeError;
use crate::resolve::ConnectionResolver;
use crate::validation::Validator;

/// What a node did, for the engine to log and count
#[derive(Debug, Clone, PartialEq)]
pub enum NodeReport {
    Fetched { count: usize },
    Transformed { count: usize },
    /// Kind recognized but not implemented; records pass through untouched
    TransformNotSupported { kind: String, count: usize },
    Validated { errors_count: u64, valid_records: u64 },
    Delivered(DestinationResult),
    /// Unknown node type; nothing was executed
    Skipped { node_type: String },
}

pub struct NodeProcessor {
    resolver: ConnectionResolver,
    adapters: Arc<AdapterRegistry>,
    validator: Validator,
    config: EngineConfig,
}

impl NodeProcessor {
    pub fn new(
        resolver: ConnectionResolver,
        adapters: Arc<AdapterRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            resolver,
            adapters,
            validator: Validator::new(),
            config,
        }
    }

    /// Processes one node, updating `records` on success
    pub async fn process(
        &self,
        node: &Node,
        records: &mut RecordSet,
    ) -> Result<NodeReport, NodeError> {
        match &node.node_type {
            NodeType::Source => {
                *records = self.source(node).await?;
                Ok(NodeReport::Fetched {
                    count: records.len(),
                })
            }
            NodeType::Transform => self.transform(node, records),
            NodeType::Validate => self.validate(node, records),
            NodeType::Destination => Ok(NodeReport::Delivered(
                self.destination(node, records).await?,
            )),
            NodeType::Other(other) => Ok(NodeReport::Skipped {
                node_type: other.clone(),
            }),
        }
    }

    async fn source(&self, node: &Node) -> Result<RecordSet, NodeError> {
        let id = connection_id(node, "No data source specified in source node")?;
        let (connection, config) = self.resolver.resolve(id).await?;

        let adapter = self
            .adapters
            .source(connection.connection_type)
            .ok_or(NodeError::UnsupportedSourceType(connection.connection_type))?;

        info!(
            "Fetching from {} source '{}'",
            connection.connection_type, connection.name
        );
        Ok(adapter.fetch(&config, node).await?)
    }

    fn transform(&self, node: &Node, records: &mut RecordSet) -> Result<NodeReport, NodeError> {
        let config: TransformConfig = node
            .typed_config()
            .map_err(|e| NodeError::InvalidConfig(e.to_string()))?;

        match config.kind() {
            TransformKind::Filter { condition } => {
                let strict = config.strict || self.config.strict_conditions;
                let filter = Filter::compile(&condition, strict)?;
                let before = records.len();
                records.retain(|record| filter.matches(record));
                debug!(
                    "Filter '{}' kept {} of {} records",
                    condition,
                    records.len(),
                    before
                );
                Ok(NodeReport::Transformed {
                    count: records.len(),
                })
            }
            TransformKind::NotYetSupported(kind) => Ok(NodeReport::TransformNotSupported {
                kind,
                count: records.len(),
            }),
            TransformKind::PassThrough => Ok(NodeReport::Transformed {
                count: records.len(),
            }),
        }
    }

    fn validate(&self, node: &Node, records: &RecordSet) -> Result<NodeReport, NodeError> {
        let config: ValidateConfig = node
            .typed_config()
            .map_err(|e| NodeError::InvalidConfig(e.to_string()))?;

        let (rules, skipped) = config.parse_rules();
        for problem in &skipped {
            warn!("Validate node '{}': ignoring {}", node.name, problem);
        }

        let report = self.validator.validate(records, &rules);
        Ok(NodeReport::Validated {
            errors_count: report.errors_count,
            valid_records: report.valid_records,
        })
    }

    async fn destination(
        &self,
        node: &Node,
        records: &RecordSet,
    ) -> Result<DestinationResult, NodeError> {
        let id = connection_id(node, "No destination data source specified")?;
        let (connection, config) = self.resolver.resolve(id).await?;

        let adapter = self
            .adapters
            .destination(connection.connection_type)
            .ok_or(NodeError::UnsupportedDestinationType(
                connection.connection_type,
            ))?;

        info!(
            "Delivering {} records to {} destination '{}'",
            records.len(),
            connection.connection_type,
            connection.name
        );
        Ok(adapter.write(&config, node, records).await?)
    }
}

fn connection_id(node: &Node, missing: &str) -> Result<uuid::Uuid, NodeError> {
    let reference: ConnectionRef = node
        .typed_config()
        .map_err(|e| NodeError::InvalidConfig(e.to_string()))?;
    reference
        .data_source_id
        .ok_or_else(|| NodeError::MissingConfig(missing.to_string()))
}
