//! Remote job service: task submission, status queries and polling to completion.
//!
//! `JobService` is the seam the relay talks to; `BeamClient` implements it over the Beam
//! task API. `await_completion` drives the poll loop against any `JobService`.

mod beam;
mod poll;
mod types;

pub use beam::BeamClient;
pub use poll::{await_completion, PollPolicy};
pub use types::{JobError, TaskOutput, TaskStatus, TaskStatusResponse};

use async_trait::async_trait;

/// Remote image-generation job API.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Create a task on `endpoint` for `prompt`. Returns the opaque task id.
    async fn submit(&self, endpoint: &str, prompt: &str) -> Result<String, JobError>;

    /// Query the current status of a task once.
    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, JobError>;

    /// Human-facing link to a task, posted while the task is in progress.
    fn task_url(&self, endpoint: &str, task_id: &str) -> String;
}
