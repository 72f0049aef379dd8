//! Configuration types and loading.
//!
//! Config is loaded from an optional JSON file (e.g. `~/.beambot/config.json`) and then
//! overridden from the environment (`BEAM_AUTH_TOKEN`, `DISCORD_BOT_TOKEN`, `CHANNEL_URL_MAP`).
//! The result is immutable for the lifetime of the process.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "BEAMBOT_CONFIG_PATH";
pub const ENV_JOB_TOKEN: &str = "BEAM_AUTH_TOKEN";
pub const ENV_DISCORD_TOKEN: &str = "DISCORD_BOT_TOKEN";
pub const ENV_CHANNEL_MAP: &str = "CHANNEL_URL_MAP";

/// Conversation id -> remote endpoint id.
pub type ChannelEndpointMap = HashMap<String, String>;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Discord login settings.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Remote job service (Beam) settings.
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Where downloaded images are written before they are attached.
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Conversation id -> endpoint id. Overridden by CHANNEL_URL_MAP env.
    #[serde(default)]
    pub channels: ChannelEndpointMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    /// Bot login token. Overridden by DISCORD_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
}

/// Job service endpoints, auth and polling policy.
///
/// URL templates use `{endpoint}` and `{task_id}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsConfig {
    /// Value sent as `Authorization: Basic <token>`. Overridden by BEAM_AUTH_TOKEN env.
    pub auth_token: Option<String>,

    /// Job creation URL (default "https://{endpoint}.apps.beam.cloud").
    #[serde(default = "default_submit_url")]
    pub submit_url: String,

    /// Task status URL (default "https://api.beam.cloud/v1/task/{task_id}/status/").
    #[serde(default = "default_status_url")]
    pub status_url: String,

    /// Link posted to the conversation once a task is accepted.
    #[serde(default = "default_task_url")]
    pub task_url: String,

    /// Key of the generated image in the status response `outputs` object.
    #[serde(default = "default_output_key")]
    pub output_key: String,

    /// Delay before each status query (default 3).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Status queries before giving up on a task (default 600).
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Per-request HTTP timeout (default 60).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_submit_url() -> String {
    "https://{endpoint}.apps.beam.cloud".to_string()
}

fn default_status_url() -> String {
    "https://api.beam.cloud/v1/task/{task_id}/status/".to_string()
}

fn default_task_url() -> String {
    "https://www.beam.cloud/apps/{endpoint}/tasks/{task_id}".to_string()
}

fn default_output_key() -> String {
    "./output.png".to_string()
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_max_poll_attempts() -> u32 {
    600
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            submit_url: default_submit_url(),
            status_url: default_status_url(),
            task_url: default_task_url(),
            output_key: default_output_key(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl JobsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactsConfig {
    /// Directory for downloaded images (default: system temp dir).
    pub directory: Option<PathBuf>,
}

/// Resolve the artifact directory: config override or the system temp dir.
pub fn resolve_artifact_dir(config: &Config) -> PathBuf {
    config
        .artifacts
        .directory
        .clone()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(std::env::temp_dir)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Parse a JSON object of conversation id -> endpoint id (the CHANNEL_URL_MAP format).
pub fn parse_channel_map(raw: &str) -> Result<ChannelEndpointMap> {
    serde_json::from_str(raw)
        .with_context(|| format!("parsing {} as a JSON object of strings", ENV_CHANNEL_MAP))
}

impl Config {
    /// Apply environment overrides using `lookup` (normally `std::env::var(..).ok()`).
    /// Fails when CHANNEL_URL_MAP is set but is not a JSON object of strings.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = non_blank(lookup(ENV_JOB_TOKEN)) {
            self.jobs.auth_token = Some(token);
        }
        if let Some(token) = non_blank(lookup(ENV_DISCORD_TOKEN)) {
            self.discord.bot_token = Some(token);
        }
        if let Some(raw) = non_blank(lookup(ENV_CHANNEL_MAP)) {
            self.channels = parse_channel_map(&raw)?;
        }
        Ok(())
    }

    /// Endpoint id for a conversation, if the conversation is mapped.
    pub fn endpoint_for(&self, conversation_id: &str) -> Option<&str> {
        self.channels.get(conversation_id).map(String::as_str)
    }
}

/// Resolve the job service token; required at startup.
pub fn resolve_job_token(config: &Config) -> Result<String> {
    non_blank(config.jobs.auth_token.clone()).with_context(|| {
        format!(
            "job service token not configured (set {} or jobs.authToken)",
            ENV_JOB_TOKEN
        )
    })
}

/// Resolve the Discord bot token; required at startup.
pub fn resolve_discord_token(config: &Config) -> Result<String> {
    non_blank(config.discord.bot_token.clone()).with_context(|| {
        format!(
            "discord bot token not configured (set {} or discord.botToken)",
            ENV_DISCORD_TOKEN
        )
    })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var(ENV_CONFIG_PATH).map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".beambot").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or BEAMBOT_CONFIG_PATH), then apply process env overrides.
/// Missing file => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok((config, path))
}
