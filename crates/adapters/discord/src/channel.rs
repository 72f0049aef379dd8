//! `ChannelHandle` over serenity's HTTP client.

use async_trait::async_trait;
use lib::channels::{ChannelHandle, ReplyTarget};
use serenity::builder::{CreateAttachment, CreateMessage};
use serenity::http::Http;
use serenity::model::id::{ChannelId, MessageId};
use std::path::Path;
use std::sync::Arc;

pub const CHANNEL_ID: &str = "discord";

/// Sends replies into Discord channels, threaded onto the triggering message when known.
pub struct DiscordChannel {
    http: Arc<Http>,
}

impl DiscordChannel {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

/// Discord snowflakes are non-zero u64s; serenity's id constructors panic on zero.
pub(crate) fn parse_snowflake(raw: &str) -> Result<u64, String> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(format!("invalid discord id: {:?}", raw)),
        Ok(id) => Ok(id),
    }
}

fn base_message(target: &ReplyTarget, content: &str) -> Result<(ChannelId, CreateMessage), String> {
    let channel = ChannelId::new(parse_snowflake(&target.conversation_id)?);
    let mut builder = CreateMessage::new().content(content);
    if let Some(message_id) = target.message_id.as_deref() {
        let message = MessageId::new(parse_snowflake(message_id)?);
        builder = builder.reference_message((channel, message));
    }
    Ok((channel, builder))
}

#[async_trait]
impl ChannelHandle for DiscordChannel {
    fn id(&self) -> &str {
        CHANNEL_ID
    }

    async fn send_message(&self, target: &ReplyTarget, text: &str) -> Result<(), String> {
        let (channel, builder) = base_message(target, text)?;
        channel
            .send_message(&*self.http, builder)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn send_file(
        &self,
        target: &ReplyTarget,
        caption: &str,
        path: &Path,
        file_name: &str,
    ) -> Result<(), String> {
        let mut attachment = CreateAttachment::path(path)
            .await
            .map_err(|e| e.to_string())?;
        attachment.filename = file_name.to_string();
        let (channel, builder) = base_message(target, caption)?;
        channel
            .send_message(&*self.http, builder.add_file(attachment))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflakes_must_be_non_zero_numbers() {
        assert_eq!(parse_snowflake("1090112233445566"), Ok(1090112233445566));
        assert!(parse_snowflake("0").is_err());
        assert!(parse_snowflake("general").is_err());
        assert!(parse_snowflake("").is_err());
    }

    #[test]
    fn bad_conversation_id_is_rejected_before_sending() {
        let target = ReplyTarget {
            conversation_id: "not-a-channel".to_string(),
            message_id: None,
        };
        assert!(base_message(&target, "hi").is_err());

        let target = ReplyTarget {
            conversation_id: "42".to_string(),
            message_id: Some("0".to_string()),
        };
        assert!(base_message(&target, "hi").is_err());
    }
}
