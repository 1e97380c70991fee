//! PostgreSQL-backed `SwipeRepository` implementation using Diesel.
//!
//! Edge inserts lean on `ON CONFLICT DO NOTHING` against the primary keys,
//! which is what makes swipes idempotent under concurrent requests.

use std::collections::HashSet;

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{SwipeRepository, SwipeRepositoryError};
use crate::domain::swipes::RejectReason;
use crate::domain::user::UserId;

use super::error_mapping::{diesel_error_into, pool_error_into};
use super::models::{NewLikeRow, NewRejectionRow};
use super::pool::{DbPool, PoolError};
use super::schema::{user_likes, user_rejections};

/// Diesel-backed implementation of the swipe repository port.
#[derive(Clone)]
pub struct DieselSwipeRepository {
    pool: DbPool,
}

impl DieselSwipeRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> SwipeRepositoryError {
    pool_error_into(error, SwipeRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> SwipeRepositoryError {
    diesel_error_into(
        error,
        SwipeRepositoryError::query,
        SwipeRepositoryError::connection,
    )
}

/// Fold directed like edges into unordered mutual pairs, smaller id first.
fn mutual_pairs_from_edges(edges: &[(Uuid, Uuid)]) -> Vec<(UserId, UserId)> {
    let directed: HashSet<(Uuid, Uuid)> = edges.iter().copied().collect();
    let mut pairs: Vec<(UserId, UserId)> = directed
        .iter()
        .filter(|(a, b)| a < b && directed.contains(&(*b, *a)))
        .map(|(a, b)| (UserId::new(*a), UserId::new(*b)))
        .collect();
    pairs.sort_unstable();
    pairs
}

#[async_trait]
impl SwipeRepository for DieselSwipeRepository {
    async fn insert_like(
        &self,
        user: &UserId,
        target: &UserId,
    ) -> Result<bool, SwipeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let inserted = diesel::insert_into(user_likes::table)
            .values(&NewLikeRow {
                user_id: *user.as_uuid(),
                liked_user_id: *target.as_uuid(),
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(inserted > 0)
    }

    async fn like_exists(
        &self,
        user: &UserId,
        target: &UserId,
    ) -> Result<bool, SwipeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::select(exists(
            user_likes::table
                .filter(user_likes::user_id.eq(user.as_uuid()))
                .filter(user_likes::liked_user_id.eq(target.as_uuid())),
        ))
        .get_result::<bool>(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn insert_rejection(
        &self,
        user: &UserId,
        target: &UserId,
        reason: RejectReason,
    ) -> Result<bool, SwipeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let inserted = diesel::insert_into(user_rejections::table)
            .values(&NewRejectionRow {
                user_id: *user.as_uuid(),
                rejected_user_id: *target.as_uuid(),
                reason: reason.as_str(),
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(inserted > 0)
    }

    async fn delete_rejections(&self, user: &UserId) -> Result<u64, SwipeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(
            user_rejections::table.filter(user_rejections::user_id.eq(user.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(deleted as u64)
    }

    async fn delete_rejection(
        &self,
        user: &UserId,
        target: &UserId,
    ) -> Result<u64, SwipeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(
            user_rejections::table
                .filter(user_rejections::user_id.eq(user.as_uuid()))
                .filter(user_rejections::rejected_user_id.eq(target.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(deleted as u64)
    }

    async fn liked_ids(&self, user: &UserId) -> Result<Vec<UserId>, SwipeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let ids = user_likes::table
            .filter(user_likes::user_id.eq(user.as_uuid()))
            .order(user_likes::liked_user_id.asc())
            .select(user_likes::liked_user_id)
            .load::<Uuid>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }

    async fn rejected_ids(&self, user: &UserId) -> Result<Vec<UserId>, SwipeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let ids = user_rejections::table
            .filter(user_rejections::user_id.eq(user.as_uuid()))
            .select(user_rejections::rejected_user_id)
            .distinct()
            .order(user_rejections::rejected_user_id.asc())
            .load::<Uuid>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }

    async fn mutual_pairs(&self) -> Result<Vec<(UserId, UserId)>, SwipeRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let edges = user_likes::table
            .select((user_likes::user_id, user_likes::liked_user_id))
            .load::<(Uuid, Uuid)>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(mutual_pairs_from_edges(&edges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn mutual_pairs_require_both_directions() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let edges = vec![(a, b), (b, a), (a, c)];
        let pairs = mutual_pairs_from_edges(&edges);

        let expected = if a < b {
            (UserId::new(a), UserId::new(b))
        } else {
            (UserId::new(b), UserId::new(a))
        };
        assert_eq!(pairs, vec![expected]);
    }

    #[rstest]
    fn mutual_pairs_are_reported_once() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let edges = vec![(a, b), (b, a), (a, b)];
        assert_eq!(mutual_pairs_from_edges(&edges).len(), 1);
    }

    #[rstest]
    fn no_edges_no_pairs() {
        assert!(mutual_pairs_from_edges(&[]).is_empty());
    }
}
