//! Execution DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::node::ConfigMap;
use crate::domain::outcome::{DestinationResult, ExecutionOutcome};
use crate::domain::record::RecordSet;

/// Outbound result of a pipeline run
///
/// `data` is only present when the destination was `local_file`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Uuid>,
    pub success: bool,
    pub records_processed: u64,
    pub errors_count: u64,
    pub destination_result: Option<DestinationDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RecordSet>,
}

/// Destination tag plus, for `local_file`, the node config to package with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigMap>,
}

impl ExecutionResponse {
    pub fn with_execution_id(mut self, id: Uuid) -> Self {
        self.execution_id = Some(id);
        self
    }
}

impl From<ExecutionOutcome> for ExecutionResponse {
    fn from(outcome: ExecutionOutcome) -> Self {
        let (destination_result, data) = match outcome.destination_result {
            Some(DestinationResult::LocalFile { data, config }) => (
                Some(DestinationDescriptor {
                    kind: "local_file".to_string(),
                    config: Some(config),
                }),
                Some(data),
            ),
            Some(other) => (
                Some(DestinationDescriptor {
                    kind: other.kind().to_string(),
                    config: None,
                }),
                None,
            ),
            None => (None, None),
        };

        Self {
            execution_id: None,
            success: outcome.success,
            records_processed: outcome.records_processed,
            errors_count: outcome.errors_count,
            destination_result,
            data,
        }
    }
}
