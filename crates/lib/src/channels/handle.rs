//! Outbound side of a channel: how the relay talks back to a conversation.

use crate::channels::inbound::ReplyTarget;
use async_trait::async_trait;
use std::path::Path;

/// Handle to a connected channel (send text, send file).
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "discord").
    fn id(&self) -> &str;

    /// Send a text message to a conversation.
    async fn send_message(&self, target: &ReplyTarget, text: &str) -> Result<(), String>;

    /// Send a message with one file attached. Default returns error.
    async fn send_file(
        &self,
        _target: &ReplyTarget,
        _caption: &str,
        _path: &Path,
        _file_name: &str,
    ) -> Result<(), String> {
        Err("file upload not implemented".to_string())
    }
}
