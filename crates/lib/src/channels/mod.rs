//! Communication channels (e.g. Discord).
//!
//! Platform adapters normalize inbound events into `InboundMessage` and implement
//! `ChannelHandle` so the relay can reply without knowing the platform.

mod handle;
mod inbound;
#[cfg(test)]
pub(crate) mod testing;

pub use handle::ChannelHandle;
pub use inbound::{InboundMessage, ReplyTarget};
