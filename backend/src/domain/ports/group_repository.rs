//! Port abstraction for interest-group persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::grouping::{Group, GroupMember};
use crate::domain::user::UserId;

/// Persistence errors raised by group repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupRepositoryError {
    /// Repository connection could not be established.
    #[error("group repository connection failed: {message}")]
    Connection {
        /// Underlying failure description.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("group repository query failed: {message}")]
    Query {
        /// Underlying failure description.
        message: String,
    },
}

impl GroupRepositoryError {
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

/// Groups and their memberships.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Fetch one group.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, GroupRepositoryError>;

    /// Whether a group already exists whose member set equals `member_ids`
    /// exactly. Callers pass the ids sorted ascending.
    async fn member_set_exists(&self, member_ids: &[UserId])
    -> Result<bool, GroupRepositoryError>;

    /// Create a group with the given members (non-admin, active).
    async fn create_group(
        &self,
        name: &str,
        description: &str,
        member_ids: &[UserId],
    ) -> Result<Group, GroupRepositoryError>;

    /// Groups where the user is an active member, newest first.
    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Group>, GroupRepositoryError>;

    /// Active members of a group in join order.
    async fn list_members(&self, group_id: Uuid)
    -> Result<Vec<GroupMember>, GroupRepositoryError>;
}
