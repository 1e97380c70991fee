//! Port abstraction for conversation and message persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::conversations::{ChatMessage, Conversation};
use crate::domain::user::UserId;

/// Persistence errors raised by conversation repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationRepositoryError {
    /// Repository connection could not be established.
    #[error("conversation repository connection failed: {message}")]
    Connection {
        /// Underlying failure description.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("conversation repository query failed: {message}")]
    Query {
        /// Underlying failure description.
        message: String,
    },
}

impl ConversationRepositoryError {
    /// Create a connection error with the given message.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a query error with the given message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Conversations, their participants, and their messages.
///
/// Creation methods run participant attachment in the same transaction as
/// the conversation row so a direct conversation is never observable
/// without both members.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Fetch one conversation with its participants.
    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<Conversation>, ConversationRepositoryError>;

    /// The direct (non-group) conversation containing exactly `a` and `b`.
    async fn find_direct_between(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Conversation>, ConversationRepositoryError>;

    /// Create the direct conversation for `a` and `b`.
    async fn create_direct(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Conversation, ConversationRepositoryError>;

    /// Create the chat conversation owned by a group, attaching every
    /// member as a participant.
    async fn create_group_chat(
        &self,
        group_id: Uuid,
        members: &[UserId],
    ) -> Result<Conversation, ConversationRepositoryError>;

    /// Conversations the user participates in, newest first.
    async fn list_for_user(
        &self,
        user: &UserId,
    ) -> Result<Vec<Conversation>, ConversationRepositoryError>;

    /// Append a message to a conversation.
    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender: &UserId,
        text: &str,
    ) -> Result<ChatMessage, ConversationRepositoryError>;

    /// Messages of a conversation ordered by creation time.
    async fn list_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<ChatMessage>, ConversationRepositoryError>;
}
