//! Connection DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::connection::{Connection, ConnectionStatus, ConnectionType};

/// Request to register a connection
///
/// `config` is plaintext here and is encrypted before it is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnection {
    pub name: String,
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    pub config: Value,
}

/// Connection as returned by list endpoints (config never included)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    pub status: ConnectionStatus,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub last_test_status: Option<String>,
}

impl From<Connection> for ConnectionSummary {
    fn from(connection: Connection) -> Self {
        Self {
            id: connection.id,
            name: connection.name,
            connection_type: connection.connection_type,
            status: connection.status,
            last_tested_at: connection.last_tested_at,
            last_test_status: connection.last_test_status,
        }
    }
}

/// Outcome of a connectivity check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
}

impl ConnectionTestResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Value stored in `last_test_status`
    pub fn status_label(&self) -> &'static str {
        if self.success { "success" } else { "failed" }
    }
}
