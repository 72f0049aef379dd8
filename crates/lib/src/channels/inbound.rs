//! Inbound message from a channel: delivered to the relay for prompt handling.

/// A message from a channel, normalized by the platform adapter.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Connector id (e.g. "discord").
    pub channel_id: String,
    pub conversation_id: String,
    /// Platform id of the message itself, so replies can reference it.
    pub message_id: Option<String>,
    /// True when the author is an automated account (including this bot).
    pub author_is_bot: bool,
    pub text: String,
}

/// Where a reply goes: the conversation, optionally threaded onto a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub conversation_id: String,
    pub message_id: Option<String>,
}

impl InboundMessage {
    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget {
            conversation_id: self.conversation_id.clone(),
            message_id: self.message_id.clone(),
        }
    }
}
