//! End-to-end engine tests with in-memory stores and a fake source

use async_trait::async_trait;
use serde_json::{Value, json};
use sluice_core::domain::connection::{Connection, ConnectionStatus, ConnectionType};
use sluice_core::domain::execution::{Execution, ExecutionStatus, ExecutionUpdate};
use sluice_core::domain::node::{Node, NodeType};
use sluice_core::domain::outcome::{DestinationResult, NodeResult};
use sluice_core::domain::pipeline::{Pipeline, PipelineDefinition, PipelineStatus};
use sluice_core::domain::record::{RecordSet, into_record};
use sluice_core::dto::connection::ConnectionTestResult;
use sluice_core::dto::preview::{PreviewRequest, PreviewResponse};
use sluice_engine::adapter::{
    AcknowledgeDestination, AdapterRegistry, ConnectionConfig, LocalFileDestination,
    SourceAdapter,
};
use sluice_engine::error::{AdapterError, EngineError, InspectError};
use sluice_engine::memory::{MemoryConnectionRegistry, MemoryExecutionStore, MemoryPipelineStore};
use sluice_engine::store::{ExecutionStore, StoreError};
use sluice_engine::{
    ConnectionInspector, ConnectionResolver, CredentialKey, CredentialStore, EngineConfig,
    NodeProcessor, PipelineEngine,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Source that returns fixed rows, or fails with a fixed message
struct StaticSource {
    rows: Result<RecordSet, String>,
}

impl StaticSource {
    fn rows(rows: Value) -> Self {
        let rows = match rows {
            Value::Array(items) => items.into_iter().map(into_record).collect(),
            other => vec![into_record(other)],
        };
        Self { rows: Ok(rows) }
    }

    fn failing(message: &str) -> Self {
        Self {
            rows: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl SourceAdapter for StaticSource {
    async fn fetch(
        &self,
        _connection: &ConnectionConfig,
        _node: &Node,
    ) -> Result<RecordSet, AdapterError> {
        self.rows.clone().map_err(AdapterError::SourceFetch)
    }

    async fn preview(
        &self,
        connection: &ConnectionConfig,
        _request: &PreviewRequest,
        limit: u64,
    ) -> Result<PreviewResponse, AdapterError> {
        let mut data = self.rows.clone().map_err(AdapterError::DatabasePreview)?;
        data.truncate(limit as usize);
        Ok(PreviewResponse {
            count: data.len(),
            data,
            columns: vec![],
            data_source_type: connection.connection_type(),
        })
    }

    async fn test_connection(&self, _connection: &ConnectionConfig) -> ConnectionTestResult {
        match &self.rows {
            Ok(_) => ConnectionTestResult::ok("Connection successful"),
            Err(message) => ConnectionTestResult::failed(message.clone()),
        }
    }
}

/// Execution store that records every update and can be told to fail
struct RecordingExecutions {
    inner: Arc<MemoryExecutionStore>,
    fail_reads: bool,
    /// Number of leading update calls that fail
    failing_writes: usize,
    updates: Mutex<Vec<ExecutionUpdate>>,
}

impl RecordingExecutions {
    fn new(inner: Arc<MemoryExecutionStore>) -> Self {
        Self {
            inner,
            fail_reads: false,
            failing_writes: 0,
            updates: Mutex::new(Vec::new()),
        }
    }

    fn updates(&self) -> Vec<ExecutionUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionStore for RecordingExecutions {
    async fn get_by_id(&self, id: Uuid) -> Result<Execution, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Backend("read timed out".to_string()));
        }
        self.inner.get_by_id(id).await
    }

    async fn update(&self, id: Uuid, update: ExecutionUpdate) -> Result<(), StoreError> {
        let attempt = {
            let mut updates = self.updates.lock().unwrap();
            updates.push(update.clone());
            updates.len()
        };
        if attempt <= self.failing_writes {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.update(id, update).await
    }
}

struct Harness {
    credentials: Arc<CredentialStore>,
    registry: Arc<MemoryConnectionRegistry>,
    executions: Arc<MemoryExecutionStore>,
    pipelines: Arc<MemoryPipelineStore>,
    adapters: Arc<AdapterRegistry>,
    config: EngineConfig,
}

impl Harness {
    fn new(source: StaticSource) -> Self {
        let adapters = AdapterRegistry::new()
            .with_source(ConnectionType::Postgresql, Arc::new(source))
            .with_destination(ConnectionType::LocalFile, Arc::new(LocalFileDestination))
            .with_destination(ConnectionType::Postgresql, Arc::new(AcknowledgeDestination));

        Self {
            credentials: Arc::new(CredentialStore::new(CredentialKey::derive("integration"))),
            registry: Arc::new(MemoryConnectionRegistry::new()),
            executions: Arc::new(MemoryExecutionStore::new()),
            pipelines: Arc::new(MemoryPipelineStore::new()),
            adapters: Arc::new(adapters),
            config: EngineConfig::default(),
        }
    }

    fn connection(&self, connection_type: ConnectionType, config: Value) -> Uuid {
        let connection = Connection {
            id: Uuid::new_v4(),
            name: format!("{connection_type} connection"),
            connection_type,
            encrypted_config: self.credentials.seal(&config).unwrap(),
            status: ConnectionStatus::Active,
            last_tested_at: None,
            last_test_status: None,
        };
        let id = connection.id;
        self.registry.insert(connection).unwrap();
        id
    }

    fn resolver(&self) -> ConnectionResolver {
        ConnectionResolver::new(self.registry.clone(), self.credentials.clone())
    }

    fn engine(&self) -> PipelineEngine {
        let processor = NodeProcessor::new(self.resolver(), self.adapters.clone(), self.config.clone());
        PipelineEngine::new(self.executions.clone(), self.pipelines.clone(), processor)
    }

    fn engine_over(&self, executions: Arc<dyn ExecutionStore>) -> PipelineEngine {
        let processor = NodeProcessor::new(self.resolver(), self.adapters.clone(), self.config.clone());
        PipelineEngine::new(executions, self.pipelines.clone(), processor)
    }

    fn inspector(&self) -> ConnectionInspector {
        ConnectionInspector::new(self.resolver(), self.adapters.clone(), &self.config)
    }
}

fn pipeline(nodes: Vec<Node>) -> Pipeline {
    let now = chrono::Utc::now();
    Pipeline {
        id: Uuid::new_v4(),
        name: "test pipeline".to_string(),
        description: None,
        definition: PipelineDefinition::new(nodes),
        status: PipelineStatus::Active,
        last_run_at: None,
        last_run_status: None,
        created_at: now,
        updated_at: now,
    }
}

fn source(connection: Uuid) -> Node {
    Node::new("n1", NodeType::Source, "Users")
        .with_config(json!({ "dataSourceId": connection.to_string(), "table": "Users" }))
}

fn filter(condition: &str) -> Node {
    Node::new("n2", NodeType::Transform, "Active only")
        .with_config(json!({ "transformType": "filter", "condition": condition }))
}

fn destination(connection: Uuid) -> Node {
    Node::new("n3", NodeType::Destination, "Download")
        .with_config(json!({ "dataSourceId": connection.to_string(), "format": "csv", "fileName": "users" }))
}

#[tokio::test]
async fn test_source_filter_local_file() {
    let harness = Harness::new(StaticSource::rows(json!([
        { "id": 1, "active": true },
        { "id": 2, "active": false }
    ])));
    let db = harness.connection(ConnectionType::Postgresql, json!({ "host": "db" }));
    let file = harness.connection(ConnectionType::LocalFile, json!({}));

    let pipeline = pipeline(vec![source(db), filter("active == true"), destination(file)]);
    let execution = harness.executions.start(pipeline.id).unwrap();

    let outcome = harness.engine().execute(&pipeline, execution.id).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.records_processed, 1);
    assert_eq!(outcome.errors_count, 0);
    let (data, config) = outcome.download().expect("local file payload");
    assert_eq!(data, &vec![into_record(json!({ "id": 1, "active": true }))]);
    assert_eq!(config["fileName"], json!("users"));

    let stored = harness.executions.get_by_id(execution.id).await.unwrap();
    assert_eq!(stored.status, ExecutionStatus::Completed);
    assert_eq!(stored.records_processed, 1);
    assert!(stored.logs.contains("Starting pipeline execution"));
    assert!(stored.logs.contains("Total nodes: 3"));
    assert!(stored.logs.contains("Processing node: Users (source)"));
    assert!(stored.logs.contains("Fetched 2 records from source"));
    assert!(stored.logs.contains("Transform complete: 1 records"));
    assert!(stored.logs.contains("Written 1 records"));
    assert!(stored.logs.contains("Pipeline execution completed"));

    let (_, status) = harness.pipelines.last_run(pipeline.id).unwrap();
    assert_eq!(status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn test_empty_pipeline_succeeds() {
    let harness = Harness::new(StaticSource::rows(json!([])));
    let pipeline = pipeline(vec![]);
    let execution = harness.executions.start(pipeline.id).unwrap();

    let outcome = harness.engine().execute(&pipeline, execution.id).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.records_processed, 0);
    assert!(outcome.records.is_empty());
    assert!(outcome.destination_result.is_none());

    let stored = harness.executions.get_by_id(execution.id).await.unwrap();
    assert_eq!(stored.status, ExecutionStatus::Completed);
    assert!(stored.logs.contains("Total nodes: 0"));
}

#[tokio::test]
async fn test_node_failures_are_counted_and_run_continues() {
    let harness = Harness::new(StaticSource::failing("connection refused"));
    let db = harness.connection(ConnectionType::Postgresql, json!({ "host": "db" }));
    let file = harness.connection(ConnectionType::LocalFile, json!({}));

    let pipeline = pipeline(vec![
        source(db),
        Node::new("n2", NodeType::Source, "No connection"),
        destination(file),
    ]);
    let execution = harness.executions.start(pipeline.id).unwrap();

    let outcome = harness.engine().execute(&pipeline, execution.id).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.errors_count, 2);
    // The destination still ran, with the empty record set
    assert_eq!(
        outcome.destination_result.as_ref().map(|d| d.record_count()),
        Some(0)
    );
    assert!(outcome.nodes[0].is_failure());
    assert!(outcome.nodes[1].is_failure());
    assert!(!outcome.nodes[2].is_failure());

    let stored = harness.executions.get_by_id(execution.id).await.unwrap();
    assert_eq!(stored.status, ExecutionStatus::Failed);
    assert_eq!(stored.errors_count, 2);
    assert!(stored.error_message.is_none());
    assert!(stored
        .logs
        .contains("ERROR in node Users: Source fetch error: connection refused"));
    assert!(stored
        .logs
        .contains("ERROR in node No connection: No data source specified in source node"));
}

#[tokio::test]
async fn test_unknown_node_type_is_skipped_without_error() {
    let harness = Harness::new(StaticSource::rows(json!([])));
    let pipeline = pipeline(vec![Node::new("x", NodeType::Other("aggregate".into()), "Mystery")]);
    let execution = harness.executions.start(pipeline.id).unwrap();

    let outcome = harness.engine().execute(&pipeline, execution.id).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.errors_count, 0);
    assert!(matches!(outcome.nodes[0].result, NodeResult::Skipped { .. }));
    let stored = harness.executions.get_by_id(execution.id).await.unwrap();
    assert!(stored.logs.contains("Unknown node type: aggregate"));
}

#[tokio::test]
async fn test_unsupported_connection_types_are_node_errors() {
    let harness = Harness::new(StaticSource::rows(json!([{ "id": 1 }])));
    let bucket = harness.connection(ConnectionType::AwsS3, json!({ "bucket": "b" }));

    let pipeline = pipeline(vec![source(bucket), destination(bucket)]);
    let execution = harness.executions.start(pipeline.id).unwrap();

    let outcome = harness.engine().execute(&pipeline, execution.id).await.unwrap();

    assert_eq!(outcome.errors_count, 2);
    let stored = harness.executions.get_by_id(execution.id).await.unwrap();
    assert!(stored.logs.contains("Unsupported source type: aws_s3"));
    assert!(stored.logs.contains("Unsupported destination type: aws_s3"));
}

#[tokio::test]
async fn test_local_file_ignores_upstream_filtering_results() {
    let harness = Harness::new(StaticSource::rows(json!([{ "price": 10 }, { "price": 20 }])));
    let db = harness.connection(ConnectionType::Postgresql, json!({}));
    let file = harness.connection(ConnectionType::LocalFile, json!({}));

    let pipeline = pipeline(vec![source(db), filter("price > 1000"), destination(file)]);
    let execution = harness.executions.start(pipeline.id).unwrap();

    let outcome = harness.engine().execute(&pipeline, execution.id).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.records_processed, 0);
    assert!(matches!(
        outcome.destination_result,
        Some(DestinationResult::LocalFile { ref data, .. }) if data.is_empty()
    ));
}

#[tokio::test]
async fn test_malformed_condition_strict_and_lenient() {
    let harness = Harness::new(StaticSource::rows(json!([{ "a": 1 }, { "a": 2 }])));
    let db = harness.connection(ConnectionType::Postgresql, json!({}));

    let lenient = pipeline(vec![source(db), filter("???")]);
    let execution = harness.executions.start(lenient.id).unwrap();
    let outcome = harness.engine().execute(&lenient, execution.id).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.records.len(), 2);

    let strict_filter = Node::new("n2", NodeType::Transform, "Strict")
        .with_config(json!({ "transformType": "filter", "condition": "???", "strict": true }));
    let strict = pipeline(vec![source(db), strict_filter]);
    let execution = harness.executions.start(strict.id).unwrap();
    let outcome = harness.engine().execute(&strict, execution.id).await.unwrap();
    assert_eq!(outcome.errors_count, 1);
    // The failed transform leaves the fetched records untouched
    assert_eq!(outcome.records.len(), 2);
}

#[tokio::test]
async fn test_missing_execution_is_fatal() {
    let harness = Harness::new(StaticSource::rows(json!([])));
    let missing = Uuid::new_v4();

    let result = harness.engine().execute(&pipeline(vec![]), missing).await;
    assert!(matches!(result, Err(EngineError::ExecutionNotFound(id)) if id == missing));
}

#[tokio::test]
async fn test_undecryptable_connection_is_a_node_error() {
    let harness = Harness::new(StaticSource::rows(json!([{ "id": 1 }])));
    let other_key = CredentialStore::new(CredentialKey::derive("someone else"));
    let connection = Connection {
        id: Uuid::new_v4(),
        name: "foreign".to_string(),
        connection_type: ConnectionType::Postgresql,
        encrypted_config: other_key.seal(&json!({ "host": "db" })).unwrap(),
        status: ConnectionStatus::Active,
        last_tested_at: None,
        last_test_status: None,
    };
    let id = connection.id;
    harness.registry.insert(connection).unwrap();

    let pipeline = pipeline(vec![source(id)]);
    let execution = harness.executions.start(pipeline.id).unwrap();
    let outcome = harness.engine().execute(&pipeline, execution.id).await.unwrap();

    assert_eq!(outcome.errors_count, 1);
    assert!(outcome.nodes[0].is_failure());
    let stored = harness.executions.get_by_id(execution.id).await.unwrap();
    assert!(stored.logs.contains("ERROR in node Users:"));
}

#[tokio::test]
async fn test_inspector_preview_and_test() {
    let harness = Harness::new(StaticSource::rows(json!([{ "a": 1 }, { "a": 2 }, { "a": 3 }])));
    let db = harness.connection(ConnectionType::Postgresql, json!({}));
    let file = harness.connection(ConnectionType::LocalFile, json!({}));
    let inspector = harness.inspector();

    let preview = inspector
        .preview(db, &PreviewRequest { query: None, limit: Some(2) })
        .await
        .unwrap();
    assert_eq!(preview.count, 2);
    assert_eq!(preview.data_source_type, ConnectionType::Postgresql);

    let result = inspector.test(db).await.unwrap();
    assert!(result.success);

    let result = inspector.test(file).await.unwrap();
    assert_eq!(
        result,
        ConnectionTestResult::failed("Connection test not implemented for this type")
    );

    assert!(matches!(
        inspector.preview(file, &PreviewRequest::default()).await,
        Err(InspectError::Adapter(AdapterError::PreviewUnsupported(ConnectionType::LocalFile)))
    ));
    assert!(matches!(
        inspector.test(Uuid::new_v4()).await,
        Err(InspectError::ConnectionNotFound(_))
    ));
}

#[tokio::test]
async fn test_execution_is_written_once_per_run() {
    let harness = Harness::new(StaticSource::failing("connection refused"));
    let db = harness.connection(ConnectionType::Postgresql, json!({}));
    let file = harness.connection(ConnectionType::LocalFile, json!({}));
    let executions = Arc::new(RecordingExecutions::new(harness.executions.clone()));

    let pipeline = pipeline(vec![source(db), filter("id > 1"), destination(file)]);
    let execution = harness.executions.start(pipeline.id).unwrap();
    let outcome = harness
        .engine_over(executions.clone())
        .execute(&pipeline, execution.id)
        .await
        .unwrap();

    assert_eq!(outcome.errors_count, 1);
    let updates = executions.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].status, ExecutionStatus::Failed);
    assert_eq!(updates[0].errors_count, Some(1));
    assert!(updates[0].error_message.is_none());
}

#[tokio::test]
async fn test_failed_terminal_write_marks_execution_failed() {
    let harness = Harness::new(StaticSource::rows(json!([{ "id": 1 }])));
    let db = harness.connection(ConnectionType::Postgresql, json!({}));
    let executions = Arc::new(RecordingExecutions {
        failing_writes: 1,
        ..RecordingExecutions::new(harness.executions.clone())
    });

    let pipeline = pipeline(vec![source(db)]);
    let execution = harness.executions.start(pipeline.id).unwrap();
    let result = harness
        .engine_over(executions.clone())
        .execute(&pipeline, execution.id)
        .await;

    assert!(matches!(
        result,
        Err(EngineError::ExecutionStore(StoreError::Backend(ref msg))) if msg == "disk full"
    ));

    // The completed write failed, the follow-up marks the run failed
    let updates = executions.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].status, ExecutionStatus::Completed);
    assert_eq!(updates[1].status, ExecutionStatus::Failed);

    let stored = harness.executions.get_by_id(execution.id).await.unwrap();
    assert_eq!(stored.status, ExecutionStatus::Failed);
    assert_eq!(
        stored.error_message.as_deref(),
        Some("Execution store error: disk full")
    );
    assert!(stored.completed_at.is_some());
    assert!(stored.logs.contains("Fetched 1 records from source"));
    assert!(stored.logs.contains("FATAL ERROR: Execution store error: disk full"));
    assert!(harness.pipelines.last_run(pipeline.id).is_none());
}

#[tokio::test]
async fn test_unreadable_execution_aborts_before_any_node() {
    let harness = Harness::new(StaticSource::rows(json!([{ "id": 1 }])));
    let db = harness.connection(ConnectionType::Postgresql, json!({}));
    let executions = Arc::new(RecordingExecutions {
        fail_reads: true,
        ..RecordingExecutions::new(harness.executions.clone())
    });

    let pipeline = pipeline(vec![source(db)]);
    let execution = harness.executions.start(pipeline.id).unwrap();
    let result = harness
        .engine_over(executions.clone())
        .execute(&pipeline, execution.id)
        .await;

    assert!(matches!(result, Err(EngineError::ExecutionStore(StoreError::Backend(_)))));

    let updates = executions.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].status, ExecutionStatus::Failed);
    assert_eq!(
        updates[0].error_message.as_deref(),
        Some("Execution store error: read timed out")
    );

    let stored = harness.executions.get_by_id(execution.id).await.unwrap();
    assert_eq!(stored.status, ExecutionStatus::Failed);
    assert!(!stored.logs.contains("Processing node"));
    assert!(stored.logs.contains("FATAL ERROR"));
}
