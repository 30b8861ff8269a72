//! Pipeline engine
//!
//! Runs the nodes of a pipeline in declaration order. A failing node is
//! recorded and counted, then the run moves on to the next node; only store
//! failures abort a run. The execution record is written once, when the run
//! reaches a terminal state.

use chrono::Utc;
use sluice_core::domain::execution::{ExecutionLog, ExecutionUpdate};
use sluice_core::domain::outcome::{DestinationResult, ExecutionOutcome, NodeOutcome, NodeResult};
use sluice_core::domain::pipeline::Pipeline;
use sluice_core::domain::record::RecordSet;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::processor::{NodeProcessor, NodeReport};
use crate::store::{ExecutionStore, PipelineStore, StoreError};

pub struct PipelineEngine {
    executions: Arc<dyn ExecutionStore>,
    pipelines: Arc<dyn PipelineStore>,
    processor: NodeProcessor,
}

/// Mutable state of one run
#[derive(Default)]
struct RunState {
    log: ExecutionLog,
    records: RecordSet,
    records_processed: u64,
    errors_count: u64,
    destination: Option<DestinationResult>,
    nodes: Vec<NodeOutcome>,
}

impl PipelineEngine {
    pub fn new(
        executions: Arc<dyn ExecutionStore>,
        pipelines: Arc<dyn PipelineStore>,
        processor: NodeProcessor,
    ) -> Self {
        Self {
            executions,
            pipelines,
            processor,
        }
    }

    /// Executes `pipeline` under the already-created execution `execution_id`
    ///
    /// Node failures are folded into the outcome; an `Err` means the run was
    /// aborted and the execution (if reachable) was marked failed.
    pub async fn execute(
        &self,
        pipeline: &Pipeline,
        execution_id: Uuid,
    ) -> Result<ExecutionOutcome, EngineError> {
        let mut state = RunState::default();

        if let Err(e) = self.executions.get_by_id(execution_id).await {
            return Err(match e {
                StoreError::NotFound(_) => EngineError::ExecutionNotFound(execution_id),
                other => {
                    let err = EngineError::ExecutionStore(other);
                    self.abort(execution_id, state.log, &err).await;
                    err
                }
            });
        }

        info!(
            "Executing pipeline '{}' ({}) as execution {}",
            pipeline.name, pipeline.id, execution_id
        );
        state.log.line("Starting pipeline execution");

        let nodes = &pipeline.definition.nodes;
        state.log.line(format!("Total nodes: {}", nodes.len()));

        for node in nodes {
            state
                .log
                .line(format!("Processing node: {} ({})", node.name, node.node_type));

            let result = match self.processor.process(node, &mut state.records).await {
                Ok(report) => state.record(report),
                Err(e) => {
                    let message = e.to_string();
                    warn!(
                        "Node '{}' ({}) failed [{:?}]: {}",
                        node.name,
                        node.id,
                        e.category(),
                        message
                    );
                    state.errors_count += 1;
                    state
                        .log
                        .line(format!("ERROR in node {}: {}", node.name, message));
                    NodeResult::Failed { message }
                }
            };

            state.nodes.push(NodeOutcome {
                node_id: node.id.clone(),
                node_name: node.name.clone(),
                node_type: node.node_type.clone(),
                result,
            });
        }

        state.log.line("Pipeline execution completed");

        let update = ExecutionUpdate::finished(
            state.log.as_str().to_string(),
            state.records_processed,
            state.errors_count,
        );
        let status = update.status;

        if let Err(e) = self.executions.update(execution_id, update).await {
            let err = EngineError::ExecutionStore(e);
            self.abort(execution_id, state.log, &err).await;
            return Err(err);
        }

        if let Err(e) = self
            .pipelines
            .stamp_last_run(pipeline.id, Utc::now(), status)
            .await
        {
            let err = EngineError::PipelineStore(e);
            self.abort(execution_id, state.log, &err).await;
            return Err(err);
        }

        info!(
            "Execution {} finished as {} ({} records, {} errors)",
            execution_id, status, state.records_processed, state.errors_count
        );

        Ok(ExecutionOutcome {
            success: state.errors_count == 0,
            records_processed: state.records_processed,
            errors_count: state.errors_count,
            destination_result: state.destination,
            records: state.records,
            nodes: state.nodes,
        })
    }

    /// Marks the execution failed; a failure to do so is only logged
    async fn abort(&self, execution_id: Uuid, mut log: ExecutionLog, err: &EngineError) {
        error!("Execution {} aborted: {}", execution_id, err);
        log.line(format!("FATAL ERROR: {}", err));

        let update = ExecutionUpdate::aborted(log.into_string(), err.to_string());
        if let Err(e) = self.executions.update(execution_id, update).await {
            error!("Failed to mark execution {} as failed: {}", execution_id, e);
        }
    }
}

impl RunState {
    /// Logs and counts a successful node report
    fn record(&mut self, report: NodeReport) -> NodeResult {
        let summary = match report {
            NodeReport::Fetched { count } => format!("Fetched {count} records from source"),
            NodeReport::Transformed { count } => format!("Transform complete: {count} records"),
            NodeReport::TransformNotSupported { kind, count } => format!(
                "Transform type '{kind}' is not supported yet; passed {count} records through"
            ),
            NodeReport::Validated { errors_count, .. } => {
                self.errors_count += errors_count;
                format!("Validation complete: {errors_count} errors")
            }
            NodeReport::Delivered(destination) => {
                self.records_processed = destination.record_count();
                let summary = format!("Written {} records", self.records_processed);
                self.destination = Some(destination);
                summary
            }
            NodeReport::Skipped { node_type } => {
                let reason = format!("Unknown node type: {node_type}");
                self.log.line(&reason);
                return NodeResult::Skipped { reason };
            }
        };

        self.log.line(&summary);
        NodeResult::Completed { summary }
    }
}
