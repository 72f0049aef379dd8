//! Prompt relay: one inbound message in, one image (or explanation) out.
//!
//! Filters the message, looks up the conversation's endpoint, submits the prompt,
//! polls the task to completion, downloads the image and posts it back. Every error
//! after filtering becomes a single reply to the conversation.

use crate::artifacts::{ArtifactFetcher, FetchError};
use crate::channels::{ChannelHandle, InboundMessage, ReplyTarget};
use crate::config::{self, Config};
use crate::jobs::{await_completion, BeamClient, JobError, JobService, PollPolicy, TaskStatus};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const UNSUPPORTED_CHANNEL_REPLY: &str = "This channel is not supported by the bot.";
pub const IMAGE_CAPTION: &str = "Here's your generated image";
pub const REQUEST_FAILED_REPLY: &str = "Request failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    FromBot,
    NotAddressed,
    EmptyPrompt,
}

/// What handling one message amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored(IgnoreReason),
    Unsupported,
    Delivered { task_id: String },
    JobFailed { task_id: String, status: TaskStatus },
    Errored(String),
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("task {task_id} completed without an output at {key}")]
    MissingOutput { task_id: String, key: String },
    #[error("sending reply failed: {0}")]
    Channel(String),
    #[error("removing image file failed: {0}")]
    Cleanup(std::io::Error),
}

/// Return the prompt when `text` starts with a mention of `bot_user_id` (`<@id>` or `<@!id>`).
pub fn extract_prompt<'a>(text: &'a str, bot_user_id: &str) -> Option<&'a str> {
    let rest = text.strip_prefix("<@")?;
    let rest = rest.strip_prefix('!').unwrap_or(rest);
    let rest = rest.strip_prefix(bot_user_id)?;
    let rest = rest.strip_prefix('>')?;
    Some(rest.trim())
}

/// Stateless per message; shared across concurrent handlers.
pub struct Relay {
    config: Arc<Config>,
    jobs: Arc<dyn JobService>,
    fetcher: ArtifactFetcher,
    poll: PollPolicy,
    shutdown: CancellationToken,
}

impl Relay {
    pub fn new(
        config: Arc<Config>,
        jobs: Arc<dyn JobService>,
        fetcher: ArtifactFetcher,
        shutdown: CancellationToken,
    ) -> Self {
        let poll = PollPolicy::from(&config.jobs);
        Self {
            config,
            jobs,
            fetcher,
            poll,
            shutdown,
        }
    }

    /// Build the production relay: Beam client and artifact fetcher from config.
    /// Fails when the job service token is missing.
    pub fn from_config(config: Arc<Config>, shutdown: CancellationToken) -> Result<Self> {
        let token = config::resolve_job_token(&config)?;
        let jobs = BeamClient::new(&config.jobs, &token).context("building job service client")?;
        let fetcher = ArtifactFetcher::new(
            config::resolve_artifact_dir(&config),
            config.jobs.request_timeout(),
        )
        .context("building artifact fetcher")?;
        Ok(Self::new(config, Arc::new(jobs), fetcher, shutdown))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle one inbound message end to end. Never fails: errors are replied and logged.
    pub async fn handle(
        &self,
        msg: &InboundMessage,
        bot_user_id: &str,
        channel: &dyn ChannelHandle,
    ) -> Outcome {
        if msg.author_is_bot {
            log::debug!("{}: discarding message from bot", channel.id());
            return Outcome::Ignored(IgnoreReason::FromBot);
        }
        let prompt = match extract_prompt(&msg.text, bot_user_id) {
            None => {
                log::debug!("{}: discarding message not addressed to bot", channel.id());
                return Outcome::Ignored(IgnoreReason::NotAddressed);
            }
            Some(p) => p,
        };
        let target = msg.reply_target();
        let Some(endpoint) = self.config.endpoint_for(&msg.conversation_id) else {
            log::info!(
                "{}: conversation {} has no endpoint mapping",
                channel.id(),
                msg.conversation_id
            );
            if let Err(e) = channel.send_message(&target, UNSUPPORTED_CHANNEL_REPLY).await {
                log::warn!("{}: unsupported-channel reply failed: {}", channel.id(), e);
            }
            return Outcome::Unsupported;
        };
        if prompt.is_empty() {
            log::debug!("{}: discarding mention without prompt", channel.id());
            return Outcome::Ignored(IgnoreReason::EmptyPrompt);
        }

        match self.run(endpoint, prompt, &target, channel).await {
            Ok(outcome) => outcome,
            Err(RelayError::Job(JobError::Cancelled)) => {
                log::info!(
                    "{}: request in {} abandoned on shutdown",
                    channel.id(),
                    msg.conversation_id
                );
                Outcome::Cancelled
            }
            Err(e) => {
                log::error!("{}: request in {} failed: {}", channel.id(), msg.conversation_id, e);
                let reply = format!("An error occurred: {}", e);
                if let Err(send_err) = channel.send_message(&target, &reply).await {
                    log::warn!("{}: error reply failed: {}", channel.id(), send_err);
                }
                Outcome::Errored(e.to_string())
            }
        }
    }

    async fn run(
        &self,
        endpoint: &str,
        prompt: &str,
        target: &ReplyTarget,
        channel: &dyn ChannelHandle,
    ) -> Result<Outcome, RelayError> {
        let task_id = self.jobs.submit(endpoint, prompt).await?;
        log::info!("submitted task {} to {}", task_id, endpoint);
        let link = format!(
            "[Request in process]({})",
            self.jobs.task_url(endpoint, &task_id)
        );
        channel
            .send_message(target, &link)
            .await
            .map_err(RelayError::Channel)?;

        let res = await_completion(self.jobs.as_ref(), &task_id, self.poll, &self.shutdown).await?;
        if res.status != TaskStatus::Complete {
            log::info!("task {} ended with status {}", task_id, res.status);
            channel
                .send_message(target, REQUEST_FAILED_REPLY)
                .await
                .map_err(RelayError::Channel)?;
            return Ok(Outcome::JobFailed {
                task_id,
                status: res.status,
            });
        }

        let key = &self.config.jobs.output_key;
        let url = res
            .output_url(key)
            .ok_or_else(|| RelayError::MissingOutput {
                task_id: task_id.clone(),
                key: key.clone(),
            })?;
        let artifact = self.fetcher.fetch_to_temp_file(url).await?;
        let sent = channel
            .send_file(target, IMAGE_CAPTION, artifact.path(), artifact.file_name())
            .await;
        let removed = artifact.remove().await;
        sent.map_err(RelayError::Channel)?;
        removed.map_err(RelayError::Cleanup)?;
        log::info!("task {} delivered", task_id);
        Ok(Outcome::Delivered { task_id })
    }
}
