//! Connection domain types
//!
//! A connection is a registered external endpoint: a database, a REST API or
//! the virtual `local_file` sink. Its configuration is stored encrypted; the
//! decrypted forms below only live for the duration of one adapter call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Registered connection as held by the connection registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    /// `<ivHex>:<encryptedHex>` ciphertext of the JSON config
    pub encrypted_config: String,
    pub status: ConnectionStatus,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub last_test_status: Option<String>,
}

/// Kind of external endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Postgresql,
    Mysql,
    RestApi,
    AwsS3,
    AzureBlob,
    GcpStorage,
    LocalFile,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Postgresql => "postgresql",
            ConnectionType::Mysql => "mysql",
            ConnectionType::RestApi => "rest_api",
            ConnectionType::AwsS3 => "aws_s3",
            ConnectionType::AzureBlob => "azure_blob",
            ConnectionType::GcpStorage => "gcp_storage",
            ConnectionType::LocalFile => "local_file",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "postgresql" => Some(ConnectionType::Postgresql),
            "mysql" => Some(ConnectionType::Mysql),
            "rest_api" => Some(ConnectionType::RestApi),
            "aws_s3" => Some(ConnectionType::AwsS3),
            "azure_blob" => Some(ConnectionType::AzureBlob),
            "gcp_storage" => Some(ConnectionType::GcpStorage),
            "local_file" => Some(ConnectionType::LocalFile),
            _ => None,
        }
    }

    pub fn is_database(&self) -> bool {
        matches!(self, ConnectionType::Postgresql | ConnectionType::Mysql)
    }
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Active,
    Inactive,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Active => "active",
            ConnectionStatus::Inactive => "inactive",
            ConnectionStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(ConnectionStatus::Active),
            "inactive" => Some(ConnectionStatus::Inactive),
            "error" => Some(ConnectionStatus::Error),
            _ => None,
        }
    }
}

// =============================================================================
// Decrypted configurations
// =============================================================================

/// Decrypted settings of a postgresql/mysql connection
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConnectionConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Default table used when a source node names neither query nor table
    #[serde(default)]
    pub table: Option<String>,
}

impl std::fmt::Debug for DatabaseConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[HIDDEN]")
            .field("table", &self.table)
            .finish()
    }
}

/// Decrypted settings of a REST API connection
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestConnectionConfig {
    pub base_url: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl std::fmt::Debug for RestConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConnectionConfig")
            .field("base_url", &self.base_url)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[HIDDEN]"))
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_type_serde_names() {
        let parsed: ConnectionType = serde_json::from_str("\"rest_api\"").unwrap();
        assert_eq!(parsed, ConnectionType::RestApi);
        assert_eq!(
            serde_json::to_string(&ConnectionType::LocalFile).unwrap(),
            "\"local_file\""
        );
        assert_eq!(ConnectionType::parse("mysql"), Some(ConnectionType::Mysql));
        assert_eq!(ConnectionType::parse("oracle"), None);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let db = DatabaseConnectionConfig {
            host: "db".to_string(),
            password: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{db:?}").contains("hunter2"));

        let rest = RestConnectionConfig {
            base_url: "https://api.example.com".to_string(),
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        assert!(!format!("{rest:?}").contains("sk-secret"));
    }
}
