//! Wire-level message definitions for the WebSocket adapter.
//!
//! Outbound payloads are the domain events themselves
//! ([`crate::domain::ChatMessageEvent`], [`crate::domain::NotificationEvent`])
//! serialised to JSON; only the inbound chat frame needs its own shape.

use serde::Deserialize;

/// Inbound chat frame sent by a client on a conversation channel.
#[derive(Debug, Deserialize)]
pub struct InboundChatMessage {
    /// Message text; must not be blank.
    pub text: String,
}
