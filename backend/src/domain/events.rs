//! Live events published to connected clients.
//!
//! Events are produced by domain services only after the corresponding
//! state change is durably committed, and fan out through the injected
//! [`EventBus`](crate::domain::ports::EventBus) to per-user and
//! per-conversation channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::UserId;

/// Address of one broadcast channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelTopic {
    /// Per-user channel carrying notification events.
    User(UserId),
    /// Per-conversation channel carrying chat events.
    Conversation(Uuid),
}

/// Chat message broadcast to a conversation channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageEvent {
    /// Message identifier.
    pub id: Uuid,
    /// Sender identifier.
    pub sender: UserId,
    /// Sender display name at send time.
    pub sender_name: String,
    /// Sender avatar URL, if any.
    pub sender_avatar: Option<String>,
    /// Message body.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Notification broadcast to a user channel, identical in shape to the
/// unread backlog flushed on reconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Conversation the notification points at.
    pub conversation: Uuid,
    /// Notification text.
    pub text: String,
    /// Counterpart user, when the conversation has exactly one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
    /// Notification identifier.
    pub id: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Union of everything a live channel can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiveEvent {
    /// A chat message on a conversation channel.
    Chat(ChatMessageEvent),
    /// A notification on a user channel.
    Notification(NotificationEvent),
}
