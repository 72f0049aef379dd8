//! Discord adapter for beambot (serenity).
//!
//! Connects to the Discord gateway, turns message events into `InboundMessage`s for the
//! relay, and announces presence once the guild cache is ready.

mod channel;
mod handler;

pub use channel::DiscordChannel;
pub use handler::DiscordHandler;

use anyhow::{Context, Result};
use lib::relay::Relay;
use serenity::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Log in and process events until the client stops or `shutdown` is cancelled.
pub async fn run(token: &str, relay: Arc<Relay>, shutdown: CancellationToken) -> Result<()> {
    let mut client = Client::builder(token, DiscordHandler::intents())
        .event_handler(DiscordHandler::new(relay))
        .await
        .context("building discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        log::info!("discord: shutting down shards");
        shard_manager.shutdown_all().await;
    });

    log::info!("discord: connecting to gateway");
    client.start().await.context("discord client stopped")?;
    log::info!("discord: client stopped");
    Ok(())
}
