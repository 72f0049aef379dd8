//! Task status payloads and job client errors.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job service request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("job service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid job service response: {0}")]
    Decode(String),
    #[error("task still in progress after {attempts} status checks")]
    PollLimit { attempts: u32 },
    #[error("polling cancelled")]
    Cancelled,
}

/// Task lifecycle as reported by the status endpoint. Unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum TaskStatus {
    Pending,
    Running,
    Complete,
    Failed,
    Other(String),
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING" => TaskStatus::Pending,
            "RUNNING" => TaskStatus::Running,
            "COMPLETE" => TaskStatus::Complete,
            "FAILED" => TaskStatus::Failed,
            _ => TaskStatus::Other(s),
        }
    }
}

impl TaskStatus {
    /// PENDING and RUNNING keep the poll loop going; everything else is terminal.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Complete => "COMPLETE",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskOutput {
    pub url: String,
}

/// Body of `GET /v1/task/{task_id}/status/`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatusResponse {
    pub status: TaskStatus,
    #[serde(default)]
    pub outputs: Option<HashMap<String, TaskOutput>>,
}

impl TaskStatusResponse {
    /// URL of the output stored under `key` (e.g. "./output.png"), if present.
    pub fn output_url(&self, key: &str) -> Option<&str> {
        self.outputs
            .as_ref()
            .and_then(|o| o.get(key))
            .map(|o| o.url.as_str())
    }
}

/// Body of the job creation response.
#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    pub task_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_known_and_unknown_values() {
        let r: TaskStatusResponse = serde_json::from_str(r#"{"status": "RUNNING"}"#).unwrap();
        assert_eq!(r.status, TaskStatus::Running);
        assert!(r.status.is_in_progress());

        let r: TaskStatusResponse = serde_json::from_str(r#"{"status": "TIMEOUT", "outputs": null}"#).unwrap();
        assert_eq!(r.status, TaskStatus::Other("TIMEOUT".into()));
        assert!(!r.status.is_in_progress());
        assert_eq!(r.status.to_string(), "TIMEOUT");
        assert_eq!(r.output_url("./output.png"), None);
    }

    #[test]
    fn output_url_by_key() {
        let r: TaskStatusResponse = serde_json::from_str(
            r#"{"status": "COMPLETE", "outputs": {"./output.png": {"url": "https://x/img.png"}}}"#,
        )
        .unwrap();
        assert_eq!(r.status, TaskStatus::Complete);
        assert_eq!(r.output_url("./output.png"), Some("https://x/img.png"));
        assert_eq!(r.output_url("./other.png"), None);
    }
}
