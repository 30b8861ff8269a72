//! Preview DTOs

use serde::{Deserialize, Serialize};

use crate::domain::connection::ConnectionType;
use crate::domain::record::RecordSet;

/// Request for a sample of a connection's data
///
/// For databases `query` is SQL; for REST APIs it is an endpoint path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Column name with the type reported by the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

/// Sampled data plus column metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub data: RecordSet,
    pub columns: Vec<ColumnInfo>,
    pub count: usize,
    pub data_source_type: ConnectionType,
}
