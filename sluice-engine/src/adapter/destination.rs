//! Destination adapters

use async_trait::async_trait;
use sluice_core::domain::node::Node;
use sluice_core::domain::outcome::DestinationResult;
use sluice_core::domain::record::RecordSet;
use tracing::debug;

use super::{ConnectionConfig, DestinationAdapter};
use crate::error::AdapterError;

/// Hands the records back to the caller instead of writing them
///
/// The node config is passed through untouched; the caller decides how to
/// serialize `data` and delivers the file itself.
pub struct LocalFileDestination;

#[async_trait]
impl DestinationAdapter for LocalFileDestination {
    async fn write(
        &self,
        _connection: &ConnectionConfig,
        node: &Node,
        records: &RecordSet,
    ) -> Result<DestinationResult, AdapterError> {
        debug!("Packaging {} records for download", records.len());

        Ok(DestinationResult::LocalFile {
            data: records.clone(),
            config: node.config.clone(),
        })
    }
}

/// Acknowledges the records without writing them anywhere
pub struct AcknowledgeDestination;

#[async_trait]
impl DestinationAdapter for AcknowledgeDestination {
    async fn write(
        &self,
        connection: &ConnectionConfig,
        _node: &Node,
        records: &RecordSet,
    ) -> Result<DestinationResult, AdapterError> {
        debug!(
            "Acknowledging {} records for {} destination",
            records.len(),
            connection.connection_type()
        );

        Ok(DestinationResult::Passthrough {
            record_count: records.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sluice_core::domain::connection::ConnectionType;
    use sluice_core::domain::node::NodeType;
    use sluice_core::domain::record::into_record;

    fn records() -> RecordSet {
        vec![into_record(json!({ "id": 1 })), into_record(json!({ "id": 2 }))]
    }

    #[tokio::test]
    async fn test_local_file_returns_data_and_node_config() {
        let node = Node::new("d1", NodeType::Destination, "Download")
            .with_config(json!({ "dataSourceId": null, "format": "json", "fileName": "out" }));
        let connection = ConnectionConfig::new(ConnectionType::LocalFile, json!({}));

        let result = LocalFileDestination
            .write(&connection, &node, &records())
            .await
            .unwrap();

        assert_eq!(result.record_count(), 2);
        match result {
            DestinationResult::LocalFile { data, config } => {
                assert_eq!(data, records());
                assert_eq!(config["fileName"], json!("out"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_local_file_passes_any_format_through() {
        let node = Node::new("d1", NodeType::Destination, "Download")
            .with_config(json!({ "format": "excel", "fileName": "report" }));
        let connection = ConnectionConfig::new(ConnectionType::LocalFile, json!({}));

        let result = LocalFileDestination
            .write(&connection, &node, &records())
            .await
            .unwrap();
        assert_eq!(
            result,
            DestinationResult::LocalFile {
                data: records(),
                config: node.config.clone(),
            }
        );
    }

    #[tokio::test]
    async fn test_acknowledge_counts_records() {
        let node = Node::new("d1", NodeType::Destination, "Warehouse");
        let connection = ConnectionConfig::new(ConnectionType::Postgresql, json!({}));

        let result = AcknowledgeDestination
            .write(&connection, &node, &records())
            .await
            .unwrap();
        assert_eq!(result, DestinationResult::Passthrough { record_count: 2 });
    }
}
