//! Port interface for caching ranked candidate pools.
//!
//! Cache absence is never an error: the serving path recomputes on a miss
//! and backend failures are logged and swallowed by callers.

use async_trait::async_trait;

use crate::domain::matching::RankedCandidate;
use crate::domain::user::UserId;

/// Errors surfaced by the caching adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CandidateCacheError {
    /// Cache backend is unavailable or timing out.
    #[error("candidate cache backend failure: {message}")]
    Backend {
        /// Underlying failure description.
        message: String,
    },
    /// Serialisation or deserialisation of cached content failed.
    #[error("candidate cache serialisation failed: {message}")]
    Serialization {
        /// Underlying failure description.
        message: String,
    },
}

impl CandidateCacheError {
    /// Create a backend error with the given message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a serialisation error with the given message.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

/// Time-boxed cache of one user's ranked candidate pool.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CandidateCache: Send + Sync {
    /// Read the cached pool for a user, `None` on miss or expiry.
    async fn get(
        &self,
        user: &UserId,
    ) -> Result<Option<Vec<RankedCandidate>>, CandidateCacheError>;

    /// Store a freshly ranked pool for a user.
    async fn put(
        &self,
        user: &UserId,
        entries: &[RankedCandidate],
    ) -> Result<(), CandidateCacheError>;

    /// Drop the cached pool for a user.
    async fn invalidate(&self, user: &UserId) -> Result<(), CandidateCacheError>;
}
