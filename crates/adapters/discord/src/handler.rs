//! Discord event handler for serenity.
//!
//! Implements the EventHandler trait: message events go to the relay, the first
//! cache-ready event triggers the online announcement.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lib::channels::InboundMessage;
use lib::presence;
use lib::relay::{Outcome, Relay};
use serenity::all::{ChannelType, Context, EventHandler, GatewayIntents, GuildId, Message, Ready};
use serenity::async_trait;

use crate::channel::{DiscordChannel, CHANNEL_ID};

/// Handler for Discord gateway events.
pub struct DiscordHandler {
    relay: Arc<Relay>,
    announced: AtomicBool,
}

impl DiscordHandler {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self {
            relay,
            announced: AtomicBool::new(false),
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::GUILD_MESSAGE_REACTIONS
            | GatewayIntents::MESSAGE_CONTENT
    }
}

pub(crate) fn to_inbound(msg: &Message) -> InboundMessage {
    InboundMessage {
        channel_id: CHANNEL_ID.to_string(),
        conversation_id: msg.channel_id.to_string(),
        message_id: Some(msg.id.to_string()),
        author_is_bot: msg.author.bot,
        text: msg.content.clone(),
    }
}

/// Guild text channels in the cache where the bot may send messages.
fn writable_text_channels(ctx: &Context, guilds: &[GuildId]) -> Vec<String> {
    let bot_id = ctx.cache.current_user().id;
    let mut out = Vec::new();
    for guild_id in guilds {
        let Some(guild) = ctx.cache.guild(*guild_id) else {
            continue;
        };
        let Some(member) = guild.members.get(&bot_id) else {
            log::debug!("discord: own member missing in guild {}", guild_id);
            continue;
        };
        for channel in guild.channels.values() {
            if channel.kind != ChannelType::Text {
                continue;
            }
            if guild.user_permissions_in(channel, member).send_messages() {
                out.push(channel.id.to_string());
            }
        }
    }
    out
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        log::info!(
            "discord: logged in as {} ({} guild(s))",
            ready.user.tag(),
            ready.guilds.len()
        );
    }

    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        if self.announced.swap(true, Ordering::SeqCst) {
            return;
        }
        let targets = writable_text_channels(&ctx, &guilds);
        let channel = DiscordChannel::new(ctx.http.clone());
        let report = presence::announce_online(&channel, &targets).await;
        log::info!(
            "discord: online notice sent to {} channel(s), {} failed",
            report.delivered,
            report.failed
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let bot_user_id = ctx.cache.current_user().id.to_string();
        let inbound = to_inbound(&msg);
        let channel = DiscordChannel::new(ctx.http.clone());
        match self.relay.handle(&inbound, &bot_user_id, &channel).await {
            Outcome::Ignored(reason) => {
                log::trace!("discord: message {} ignored: {:?}", msg.id, reason)
            }
            outcome => log::debug!("discord: message {} -> {:?}", msg.id, outcome),
        }
    }
}
