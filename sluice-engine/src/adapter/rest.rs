//! REST API source

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use sluice_core::domain::connection::RestConnectionConfig;
use sluice_core::domain::node::{Node, RestSourceOptions};
use sluice_core::domain::record::{RecordSet, into_record};
use sluice_core::dto::connection::ConnectionTestResult;
use sluice_core::dto::preview::{ColumnInfo, PreviewRequest, PreviewResponse};
use std::time::Duration;
use tracing::debug;

use super::{ConnectionConfig, SourceAdapter};
use crate::config::EngineConfig;
use crate::error::AdapterError;

/// Envelope keys searched, in order, for the record array
const ENVELOPE_KEYS: [&str; 3] = ["data", "results", "items"];

/// Reads records over HTTP
pub struct RestSource {
    client: Client,
    fetch_timeout: Duration,
    preview_timeout: Duration,
    test_timeout: Duration,
}

impl RestSource {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: Client::new(),
            fetch_timeout: config.rest_timeout,
            preview_timeout: config.preview_timeout,
            test_timeout: config.test_timeout,
        }
    }

    async fn get_json(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<Value, reqwest::Error> {
        debug!("{} {}", method, url);

        self.client
            .request(method, url)
            .headers(headers)
            .query(query)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }
}

#[async_trait]
impl SourceAdapter for RestSource {
    async fn fetch(
        &self,
        connection: &ConnectionConfig,
        node: &Node,
    ) -> Result<RecordSet, AdapterError> {
        let settings: RestConnectionConfig = connection.parse()?;
        let options: RestSourceOptions = node
            .typed_config()
            .map_err(|e| AdapterError::InvalidNodeConfig(e.to_string()))?;

        let endpoint = options
            .endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .or(settings.endpoint.as_deref())
            .unwrap_or_default();
        let url = format!("{}{}", settings.base_url, endpoint);

        let method = match options.method.as_deref().map(str::trim) {
            None | Some("") => Method::GET,
            Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .map_err(|_| AdapterError::InvalidNodeConfig(format!("Invalid HTTP method '{m}'")))?,
        };

        let query: Vec<(String, String)> = options
            .query_params
            .iter()
            .map(|(key, value)| (key.clone(), query_value(value)))
            .collect();

        let body = self
            .get_json(
                method,
                &url,
                request_headers(&settings)?,
                &query,
                self.fetch_timeout,
            )
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AdapterError::Connection(e.to_string())
                } else {
                    AdapterError::SourceFetch(e.to_string())
                }
            })?;

        Ok(normalize_body(body))
    }

    async fn preview(
        &self,
        connection: &ConnectionConfig,
        request: &PreviewRequest,
        limit: u64,
    ) -> Result<PreviewResponse, AdapterError> {
        let settings: RestConnectionConfig = connection.parse()?;
        let endpoint = request.query.as_deref().unwrap_or_default();
        let url = format!("{}{}", settings.base_url, endpoint);

        let body = self
            .get_json(
                Method::GET,
                &url,
                request_headers(&settings)?,
                &[],
                self.preview_timeout,
            )
            .await
            .map_err(|e| AdapterError::ApiPreview(e.to_string()))?;

        let mut data = normalize_body(body);
        data.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        let columns = data
            .first()
            .map(|record| {
                record
                    .iter()
                    .map(|(name, value)| ColumnInfo {
                        name: name.clone(),
                        column_type: json_type_name(value).to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(PreviewResponse {
            count: data.len(),
            data,
            columns,
            data_source_type: connection.connection_type(),
        })
    }

    async fn test_connection(&self, connection: &ConnectionConfig) -> ConnectionTestResult {
        let settings: RestConnectionConfig = match connection.parse() {
            Ok(settings) => settings,
            Err(e) => return ConnectionTestResult::failed(e.to_string()),
        };
        let headers = match request_headers(&settings) {
            Ok(headers) => headers,
            Err(e) => return ConnectionTestResult::failed(e.to_string()),
        };

        let response = self
            .client
            .get(&settings.base_url)
            .headers(headers)
            .timeout(self.test_timeout)
            .send()
            .await;

        match response {
            Ok(response) if response.status() == StatusCode::OK => {
                ConnectionTestResult::ok("Connection successful")
            }
            Ok(response) => {
                ConnectionTestResult::failed(format!("API returned status {}", response.status()))
            }
            Err(e) => ConnectionTestResult::failed(e.to_string()),
        }
    }
}

/// Turns an API response body into a flat record set
///
/// Arrays are used as-is. An object is searched for the first of `data`,
/// `results` or `items` holding an array; failing that, the body itself
/// becomes the only record.
pub fn normalize_body(body: Value) -> RecordSet {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let key = ENVELOPE_KEYS
                .iter()
                .find(|key| matches!(map.get(**key), Some(Value::Array(_))));
            match key.and_then(|key| map.remove(*key)) {
                Some(Value::Array(items)) => items,
                _ => vec![Value::Object(map)],
            }
        }
        other => vec![other],
    };

    items.into_iter().map(into_record).collect()
}

fn request_headers(settings: &RestConnectionConfig) -> Result<HeaderMap, AdapterError> {
    let mut headers = HeaderMap::new();

    for (name, value) in &settings.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            AdapterError::InvalidConnectionConfig(format!("Invalid header name '{name}'"))
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            AdapterError::InvalidConnectionConfig(format!("Invalid value for header '{name}'"))
        })?;
        headers.insert(name, value);
    }

    if let Some(api_key) = settings.api_key.as_deref().filter(|k| !k.is_empty()) {
        let mut value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
            AdapterError::InvalidConnectionConfig("API key is not a valid header value".to_string())
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
