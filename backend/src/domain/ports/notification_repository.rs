//! Port abstraction for the persisted notification log.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::notifications::Notification;
use crate::domain::user::UserId;

/// Persistence errors raised by notification repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationRepositoryError {
    /// Repository connection could not be established.
    #[error("notification repository connection failed: {message}")]
    Connection {
        /// Underlying failure description.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("notification repository query failed: {message}")]
    Query {
        /// Underlying failure description.
        message: String,
    },
}

impl NotificationRepositoryError {
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

/// Durable per-user notification rows; the log is append-only except for
/// the read flag.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Persist an unread notification.
    async fn insert(
        &self,
        user: &UserId,
        conversation_id: Uuid,
        text: &str,
    ) -> Result<Notification, NotificationRepositoryError>;

    /// Unread notifications for a user, most recent first.
    async fn unread_for(
        &self,
        user: &UserId,
    ) -> Result<Vec<Notification>, NotificationRepositoryError>;

    /// Flip one notification to read.
    async fn mark_read(&self, id: Uuid) -> Result<(), NotificationRepositoryError>;
}
