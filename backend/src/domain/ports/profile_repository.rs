//! Port abstraction for reading profiles and flipping activity state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::user::{Profile, UserId};

/// Persistence errors raised by profile repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileRepositoryError {
    /// Repository connection could not be established.
    #[error("profile repository connection failed: {message}")]
    Connection {
        /// Underlying failure description.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("profile repository query failed: {message}")]
    Query {
        /// Underlying failure description.
        message: String,
    },
}

impl ProfileRepositoryError {
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

/// Read access to profiles plus the single activity-state mutation the
/// core owns (the inactivity sweep).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch one profile by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, ProfileRepositoryError>;

    /// Fetch profiles for a set of identifiers; missing ids are skipped.
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<Profile>, ProfileRepositoryError>;

    /// Active users eligible as candidates for `for_user`: excludes the
    /// requester and anyone the requester already liked or rejected.
    /// Ordered by ascending id for deterministic truncation.
    async fn candidate_pool(&self, for_user: &UserId)
    -> Result<Vec<Profile>, ProfileRepositoryError>;

    /// Every active profile.
    async fn list_active(&self) -> Result<Vec<Profile>, ProfileRepositoryError>;

    /// Deactivate users whose last activity predates `cutoff`; returns the
    /// number of rows changed.
    async fn deactivate_idle_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, ProfileRepositoryError>;
}
