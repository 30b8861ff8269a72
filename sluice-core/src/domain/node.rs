//! Node domain types
//!
//! A node's `config` arrives as an untyped JSON object whose shape depends on
//! the node type and, for sources and destinations, on the type of the
//! referenced connection. The raw map is kept on [`Node`] and converted into
//! the typed structs below at the point of use.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Untyped key-value configuration as stored with a pipeline
pub type ConfigMap = serde_json::Map<String, Value>;

/// One stage of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: ConfigMap,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: NodeType, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            name: name.into(),
            config: ConfigMap::new(),
        }
    }

    /// Builder-style helper to attach a config map
    pub fn with_config(mut self, config: Value) -> Self {
        if let Value::Object(map) = config {
            self.config = map;
        }
        self
    }

    /// Interprets the config map as `T`
    pub fn typed_config<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.config.clone()))
    }
}

/// Node type tag
///
/// Unknown tags are preserved so the engine can report them by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Source,
    Transform,
    Validate,
    Destination,
    Other(String),
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Source => "source",
            NodeType::Transform => "transform",
            NodeType::Validate => "validate",
            NodeType::Destination => "destination",
            NodeType::Other(name) => name,
        }
    }
}

impl From<String> for NodeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "source" => NodeType::Source,
            "transform" => NodeType::Transform,
            "validate" => NodeType::Validate,
            "destination" => NodeType::Destination,
            _ => NodeType::Other(value),
        }
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Source / Destination
// =============================================================================

/// Connection reference shared by source and destination nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRef {
    #[serde(default, deserialize_with = "optional_id")]
    pub data_source_id: Option<Uuid>,
}

/// Source options for database connections (postgresql, mysql)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSourceOptions {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    /// Row limit; `0` and absent both mean unlimited
    #[serde(default, deserialize_with = "optional_limit")]
    pub limit: Option<u64>,
}

/// Source options for REST API connections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestSourceOptions {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub query_params: ConfigMap,
}

/// Packaging options for the `local_file` destination
///
/// Read from the destination connection's config overlaid with the node
/// config. Every field is lenient: an unknown format packages as CSV, an
/// empty delimiter means `,` and only an explicit `false` drops headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalFileOptions {
    #[serde(default, deserialize_with = "lenient_format")]
    pub format: FileFormat,
    #[serde(default, deserialize_with = "optional_text")]
    pub file_name: Option<String>,
    /// CSV field delimiter, `,` when absent
    #[serde(default, deserialize_with = "optional_delimiter")]
    pub delimiter: Option<char>,
    #[serde(default = "default_true", deserialize_with = "not_false")]
    pub include_headers: bool,
}

impl Default for LocalFileOptions {
    fn default() -> Self {
        Self {
            format: FileFormat::default(),
            file_name: None,
            delimiter: None,
            include_headers: true,
        }
    }
}

/// Serialization format for downloadable results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Csv,
    Json,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
        }
    }
}

// =============================================================================
// Transform
// =============================================================================

/// Transform node configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformConfig {
    #[serde(default)]
    pub transform_type: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    /// Reject malformed conditions instead of letting every record through
    #[serde(default)]
    pub strict: bool,
}

/// What a transform node actually does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformKind {
    Filter { condition: String },
    /// Recognized but unimplemented kinds (aggregate, join, ...)
    NotYetSupported(String),
    PassThrough,
}

impl TransformConfig {
    pub fn kind(&self) -> TransformKind {
        let transform_type = self
            .transform_type
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        let condition = self.condition.as_deref().map(str::trim).unwrap_or_default();

        match transform_type {
            "" => TransformKind::PassThrough,
            "filter" if condition.is_empty() => TransformKind::PassThrough,
            "filter" => TransformKind::Filter {
                condition: condition.to_string(),
            },
            other => TransformKind::NotYetSupported(other.to_string()),
        }
    }
}

// =============================================================================
// Validate
// =============================================================================

/// Validate node configuration
///
/// `rules` is kept as raw JSON so a rule list in an unexpected shape never
/// makes the node unreadable; see [`ValidateConfig::parse_rules`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateConfig {
    #[serde(default)]
    pub rules: Value,
}

impl ValidateConfig {
    /// Parses every rule it can
    ///
    /// Returns the parsed rules and one message per entry that was skipped.
    pub fn parse_rules(&self) -> (Vec<ValidationRule>, Vec<String>) {
        let entries = match &self.rules {
            Value::Null => return (Vec::new(), Vec::new()),
            Value::Array(entries) => entries,
            other => return (Vec::new(), vec![format!("rules must be a list, got {other}")]),
        };

        let mut rules = Vec::with_capacity(entries.len());
        let mut skipped = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            match ValidationRule::deserialize(entry) {
                Ok(rule) => rules.push(rule),
                Err(e) => skipped.push(format!("rule {index}: {e}")),
            }
        }
        (rules, skipped)
    }
}

/// A data quality rule
///
/// Accepts both the stored shape (`ruleType`, `columnName`) and the builder's
/// shorthand (`type`, `field`). Rules are carried through the engine;
/// evaluation is not implemented yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(alias = "type")]
    pub rule_type: RuleType,
    #[serde(default, alias = "field")]
    pub column_name: Option<String>,
    #[serde(default)]
    pub config: ConfigMap,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    NotNull,
    Unique,
    Range,
    Format,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    #[default]
    Warning,
    Info,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Lenient field parsing
// =============================================================================

/// Accepts `null`, `""` or a UUID string
fn optional_id<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) => Uuid::parse_str(id)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Accepts a number or a numeric string; zero disables the limit
fn optional_limit<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    let limit = match raw {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().parse::<u64>().map_err(|_| {
            serde::de::Error::custom(format!("limit must be a non-negative integer, got '{s}'"))
        })?),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "limit must be a number, got {other}"
            )));
        }
    };
    Ok(limit.filter(|n| *n > 0))
}

fn lenient_format<'de, D>(deserializer: D) -> Result<FileFormat, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw.as_str().map(str::trim) {
        Some(format) if format.eq_ignore_ascii_case("json") => FileFormat::Json,
        _ => FileFormat::Csv,
    })
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}

fn optional_delimiter<'de, D>(deserializer: D) -> Result<Option<char>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_text(deserializer)?.and_then(|s| s.chars().next()))
}

fn not_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)? != Value::Bool(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_node_type_is_preserved() {
        let node: Node = serde_json::from_value(json!({
            "id": "n1", "type": "aggregate", "name": "Sum"
        }))
        .unwrap();
        assert_eq!(node.node_type, NodeType::Other("aggregate".to_string()));
        assert_eq!(node.node_type.to_string(), "aggregate");
        assert!(node.config.is_empty());
    }

    #[test]
    fn test_connection_ref_accepts_empty_id() {
        let node = Node::new("n1", NodeType::Source, "src").with_config(json!({ "dataSourceId": "" }));
        let reference: ConnectionRef = node.typed_config().unwrap();
        assert_eq!(reference.data_source_id, None);
    }

    #[test]
    fn test_connection_ref_rejects_garbage_id() {
        let node =
            Node::new("n1", NodeType::Source, "src").with_config(json!({ "dataSourceId": "abc" }));
        assert!(node.typed_config::<ConnectionRef>().is_err());
    }

    #[test]
    fn test_limit_accepts_numeric_string_and_zero() {
        let opts: DatabaseSourceOptions =
            serde_json::from_value(json!({ "table": "Users", "limit": "25" })).unwrap();
        assert_eq!(opts.limit, Some(25));

        let opts: DatabaseSourceOptions = serde_json::from_value(json!({ "limit": 0 })).unwrap();
        assert_eq!(opts.limit, None);
    }

    #[test]
    fn test_validation_rules_accept_builder_shape() {
        let config: ValidateConfig = serde_json::from_value(json!({
            "rules": [
                { "type": "not_null", "field": "email", "severity": "critical" },
                { "ruleType": "range", "columnName": "age", "isActive": false }
            ]
        }))
        .unwrap();

        let (rules, skipped) = config.parse_rules();
        assert!(skipped.is_empty());
        assert_eq!(rules[0].rule_type, RuleType::NotNull);
        assert_eq!(rules[0].column_name.as_deref(), Some("email"));
        assert_eq!(rules[0].severity, Severity::Critical);
        assert!(!rules[1].is_active);
    }

    #[test]
    fn test_malformed_rules_are_skipped() {
        let config: ValidateConfig = serde_json::from_value(json!({
            "rules": [{ "type": "not_null" }, { "field": "x" }, "nonsense"]
        }))
        .unwrap();
        let (rules, skipped) = config.parse_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(skipped.len(), 2);

        let config: ValidateConfig =
            serde_json::from_value(json!({ "rules": "not a list" })).unwrap();
        let (rules, skipped) = config.parse_rules();
        assert!(rules.is_empty());
        assert_eq!(skipped.len(), 1);

        assert_eq!(ValidateConfig::default().parse_rules(), (vec![], vec![]));
    }

    #[test]
    fn test_local_file_options_are_lenient() {
        let opts: LocalFileOptions = serde_json::from_value(json!({
            "format": "excel", "delimiter": "", "includeHeaders": null, "fileName": "  "
        }))
        .unwrap();
        assert_eq!(opts, LocalFileOptions::default());

        let opts: LocalFileOptions = serde_json::from_value(json!({
            "format": "JSON", "delimiter": ";", "includeHeaders": false, "fileName": "daily"
        }))
        .unwrap();
        assert_eq!(opts.format, FileFormat::Json);
        assert_eq!(opts.delimiter, Some(';'));
        assert!(!opts.include_headers);
        assert_eq!(opts.file_name.as_deref(), Some("daily"));
    }

    #[test]
    fn test_transform_kind() {
        let filter = TransformConfig {
            transform_type: Some("filter".to_string()),
            condition: Some(" price > 50 ".to_string()),
            strict: false,
        };
        assert_eq!(
            filter.kind(),
            TransformKind::Filter {
                condition: "price > 50".to_string()
            }
        );

        let empty_filter = TransformConfig {
            transform_type: Some("filter".to_string()),
            condition: None,
            strict: false,
        };
        assert_eq!(empty_filter.kind(), TransformKind::PassThrough);

        let join = TransformConfig {
            transform_type: Some("join".to_string()),
            ..Default::default()
        };
        assert_eq!(join.kind(), TransformKind::NotYetSupported("join".to_string()));

        assert_eq!(TransformConfig::default().kind(), TransformKind::PassThrough);
    }

    #[test]
    fn test_validation_rule_defaults() {
        let config: ValidateConfig = serde_json::from_value(json!({
            "rules": [{ "ruleType": "not_null", "columnName": "email" }]
        }))
        .unwrap();
        let (rules, _) = config.parse_rules();
        let rule = &rules[0];
        assert_eq!(rule.rule_type, RuleType::NotNull);
        assert_eq!(rule.severity, Severity::Warning);
        assert!(rule.is_active);
    }
}
