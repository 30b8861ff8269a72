//! REST source against a local HTTP server that echoes each request

use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::routing::any;
use serde_json::{Value, json};
use sluice_core::domain::connection::ConnectionType;
use sluice_core::domain::node::{Node, NodeType};
use sluice_engine::EngineConfig;
use sluice_engine::adapter::{ConnectionConfig, RestSource, SourceAdapter};
use sluice_engine::error::AdapterError;
use std::collections::BTreeMap;

/// Replies with one record describing the request it received
async fn echo(
    method: Method,
    uri: Uri,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "data": [{
            "method": method.as_str(),
            "path": uri.path(),
            "params": params,
            "authorization": header("authorization"),
            "tenant": header("x-tenant"),
        }]
    }))
}

async fn serve() -> String {
    let app = Router::new()
        .route("/broken", any(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .fallback(echo);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn connection(base_url: &str, endpoint: Option<&str>) -> ConnectionConfig {
    ConnectionConfig::new(
        ConnectionType::RestApi,
        json!({
            "baseUrl": base_url,
            "endpoint": endpoint,
            "apiKey": "s3cret",
            "headers": { "X-Tenant": "acme", "Authorization": "Basic overridden" }
        }),
    )
}

fn node(config: Value) -> Node {
    Node::new("api", NodeType::Source, "Orders").with_config(config)
}

#[tokio::test]
async fn test_node_endpoint_method_and_params_are_used() {
    let base_url = serve().await;
    let source = RestSource::new(&EngineConfig::default());

    let records = source
        .fetch(
            &connection(&base_url, Some("/from-connection")),
            &node(json!({
                "endpoint": "/v1/orders",
                "method": "post",
                "queryParams": { "status": "open", "page": 2 }
            })),
        )
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    let echoed = &records[0];
    assert_eq!(echoed["method"], json!("POST"));
    assert_eq!(echoed["path"], json!("/v1/orders"));
    assert_eq!(echoed["params"], json!({ "page": "2", "status": "open" }));
    assert_eq!(echoed["authorization"], json!("Bearer s3cret"));
    assert_eq!(echoed["tenant"], json!("acme"));
}

#[tokio::test]
async fn test_connection_endpoint_and_get_are_defaults() {
    let base_url = serve().await;
    let source = RestSource::new(&EngineConfig::default());

    let records = source
        .fetch(
            &connection(&base_url, Some("/from-connection")),
            &node(json!({ "endpoint": "" })),
        )
        .await
        .unwrap();

    assert_eq!(records[0]["method"], json!("GET"));
    assert_eq!(records[0]["path"], json!("/from-connection"));
    assert_eq!(records[0]["params"], json!({}));
}

#[tokio::test]
async fn test_error_status_is_a_fetch_error() {
    let base_url = serve().await;
    let source = RestSource::new(&EngineConfig::default());

    let err = source
        .fetch(&connection(&base_url, None), &node(json!({ "endpoint": "/broken" })))
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::SourceFetch(_)), "{err:?}");
}

#[tokio::test]
async fn test_unreachable_api_is_a_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let source = RestSource::new(&EngineConfig::default());

    let err = source
        .fetch(&connection(&base_url, Some("/x")), &node(json!({})))
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::Connection(_)), "{err:?}");
}
