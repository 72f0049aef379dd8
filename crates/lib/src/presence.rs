//! Startup presence notice: tell every writable conversation the bot is online.

use crate::channels::{ChannelHandle, ReplyTarget};
use futures_util::future::join_all;

pub const ONLINE_NOTICE: &str = "I am now online!";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnounceReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Send `ONLINE_NOTICE` to each conversation. A failed send is logged and does not
/// affect the others.
pub async fn announce_online(channel: &dyn ChannelHandle, conversations: &[String]) -> AnnounceReport {
    let sends = conversations.iter().map(|conversation_id| async move {
        let target = ReplyTarget {
            conversation_id: conversation_id.clone(),
            message_id: None,
        };
        match channel.send_message(&target, ONLINE_NOTICE).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "{}: online notice to {} failed: {}",
                    channel.id(),
                    conversation_id,
                    e
                );
                false
            }
        }
    });
    let mut report = AnnounceReport::default();
    for ok in join_all(sends).await {
        if ok {
            report.delivered += 1;
        } else {
            report.failed += 1;
        }
    }
    report
}
