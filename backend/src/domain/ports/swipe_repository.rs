//! Port abstraction for the directed like/reject edge store.

use async_trait::async_trait;

use crate::domain::swipes::RejectReason;
use crate::domain::user::UserId;

/// Persistence errors raised by swipe repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwipeRepositoryError {
    /// Repository connection could not be established.
    #[error("swipe repository connection failed: {message}")]
    Connection {
        /// Underlying failure description.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("swipe repository query failed: {message}")]
    Query {
        /// Underlying failure description.
        message: String,
    },
}

impl SwipeRepositoryError {
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

/// Directed like/reject edges between user pairs.
///
/// Inserts are idempotent at the data layer (unique keys on the ordered
/// pair); the boolean results report whether a row was newly created.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SwipeRepository: Send + Sync {
    /// Record `user` liking `target`; `false` when the edge already existed.
    async fn insert_like(
        &self,
        user: &UserId,
        target: &UserId,
    ) -> Result<bool, SwipeRepositoryError>;

    /// Whether a like edge from `user` to `target` exists.
    async fn like_exists(
        &self,
        user: &UserId,
        target: &UserId,
    ) -> Result<bool, SwipeRepositoryError>;

    /// Record `user` rejecting `target` with the given reason; `false` when
    /// the edge already existed.
    async fn insert_rejection(
        &self,
        user: &UserId,
        target: &UserId,
        reason: RejectReason,
    ) -> Result<bool, SwipeRepositoryError>;

    /// Delete every rejection edge originating at `user`; returns the
    /// number of rows removed.
    async fn delete_rejections(&self, user: &UserId) -> Result<u64, SwipeRepositoryError>;

    /// Delete all rejection edges from `user` to `target` (any reason);
    /// returns the number of rows removed.
    async fn delete_rejection(
        &self,
        user: &UserId,
        target: &UserId,
    ) -> Result<u64, SwipeRepositoryError>;

    /// Users `user` has liked, ascending by id.
    async fn liked_ids(&self, user: &UserId) -> Result<Vec<UserId>, SwipeRepositoryError>;

    /// Users `user` has rejected (deduplicated across reasons), ascending.
    async fn rejected_ids(&self, user: &UserId) -> Result<Vec<UserId>, SwipeRepositoryError>;

    /// Every unordered pair with likes in both directions. Each pair is
    /// reported once with the smaller id first.
    async fn mutual_pairs(&self) -> Result<Vec<(UserId, UserId)>, SwipeRepositoryError>;
}
