//! Poll a task until it leaves PENDING/RUNNING.

use crate::config::JobsConfig;
use crate::jobs::types::{JobError, TaskStatusResponse};
use crate::jobs::JobService;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Delay between status checks and the attempt bound. `max_attempts == 0` means no bound.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl From<&JobsConfig> for PollPolicy {
    fn from(config: &JobsConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.max_poll_attempts,
        }
    }
}

/// Wait `policy.interval`, query status, repeat while the task is in progress.
/// Returns the first terminal status response. Errors from a status query end the loop.
pub async fn await_completion(
    jobs: &dyn JobService,
    task_id: &str,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<TaskStatusResponse, JobError> {
    let mut attempts: u32 = 0;
    loop {
        if policy.max_attempts != 0 && attempts >= policy.max_attempts {
            log::warn!("task {}: giving up after {} status checks", task_id, attempts);
            return Err(JobError::PollLimit { attempts });
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            _ = tokio::time::sleep(policy.interval) => {}
        }
        attempts += 1;
        let res = tokio::select! {
            _ = cancel.cancelled() => return Err(JobError::Cancelled),
            res = jobs.task_status(task_id) => res?,
        };
        log::debug!("task {}: status {} (check {})", task_id, res.status, attempts);
        if !res.status.is_in_progress() {
            return Ok(res);
        }
    }
}
