//! Execution domain types

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One timed run of a pipeline
///
/// Created in `Running` when the pipeline is invoked and written once more
/// when the engine reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub logs: String,
    pub records_processed: u64,
    pub errors_count: u64,
    pub error_message: Option<String>,
}

impl Execution {
    /// A fresh execution record in `Running`
    pub fn start(pipeline_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            pipeline_id,
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            logs: String::new(),
            records_processed: 0,
            errors_count: 0,
            error_message: None,
        }
    }

    /// Applies a partial update in place
    pub fn apply(&mut self, update: ExecutionUpdate) {
        self.status = update.status;
        if let Some(completed_at) = update.completed_at {
            self.completed_at = Some(completed_at);
        }
        if let Some(logs) = update.logs {
            self.logs = logs;
        }
        if let Some(records) = update.records_processed {
            self.records_processed = records;
        }
        if let Some(errors) = update.errors_count {
            self.errors_count = errors;
        }
        if update.error_message.is_some() {
            self.error_message = update.error_message;
        }
    }
}

/// Execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    /// Terminal status for a finished run
    pub fn from_error_count(errors_count: u64) -> Self {
        if errors_count > 0 {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Completed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(ExecutionStatus::Running),
            "completed" => Some(ExecutionStatus::Completed),
            "failed" => Some(ExecutionStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial execution state handed to the execution store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionUpdate {
    pub status: ExecutionStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub logs: Option<String>,
    pub records_processed: Option<u64>,
    pub errors_count: Option<u64>,
    pub error_message: Option<String>,
}

impl ExecutionUpdate {
    /// Terminal update after the node loop ran to the end
    pub fn finished(logs: String, records_processed: u64, errors_count: u64) -> Self {
        Self {
            status: ExecutionStatus::from_error_count(errors_count),
            completed_at: Some(Utc::now()),
            logs: Some(logs),
            records_processed: Some(records_processed),
            errors_count: Some(errors_count),
            error_message: None,
        }
    }

    /// Terminal update after a fatal error
    pub fn aborted(logs: String, error_message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            completed_at: Some(Utc::now()),
            logs: Some(logs),
            records_processed: None,
            errors_count: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// Append-only execution transcript
///
/// Every line is `[<RFC 3339 timestamp>] <message>`.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    text: String,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, message: impl AsRef<str>) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.text.push('[');
        self.text.push_str(&timestamp);
        self.text.push_str("] ");
        self.text.push_str(message.as_ref());
        self.text.push('\n');
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_error_count() {
        assert_eq!(
            ExecutionStatus::from_error_count(0),
            ExecutionStatus::Completed
        );
        assert_eq!(ExecutionStatus::from_error_count(3), ExecutionStatus::Failed);
    }

    #[test]
    fn test_log_lines_are_timestamped() {
        let mut log = ExecutionLog::new();
        log.line("Starting pipeline execution");
        log.line("Total nodes: 0");

        let lines: Vec<_> = log.as_str().lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] Starting pipeline execution"));
        assert!(lines[1].ends_with("] Total nodes: 0"));
    }

    #[test]
    fn test_apply_aborted_update() {
        let mut execution = Execution::start(Uuid::new_v4());
        execution.apply(ExecutionUpdate::aborted("boom\n".to_string(), "boom"));

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.completed_at.is_some());
        assert_eq!(execution.error_message.as_deref(), Some("boom"));
        assert_eq!(execution.records_processed, 0);
    }
}
