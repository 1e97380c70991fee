//! PostgreSQL-backed `ProfileRepository` implementation using Diesel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{ProfileRepository, ProfileRepositoryError};
use crate::domain::user::{Profile, UserId};

use super::error_mapping::{diesel_error_into, pool_error_into};
use super::models::UserRow;
use super::pool::{DbPool, PoolError};
use super::schema::{user_likes, user_rejections, users};

/// Diesel-backed implementation of the profile repository port.
#[derive(Clone)]
pub struct DieselProfileRepository {
    pool: DbPool,
}

impl DieselProfileRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ProfileRepositoryError {
    pool_error_into(error, ProfileRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> ProfileRepositoryError {
    diesel_error_into(
        error,
        ProfileRepositoryError::query,
        ProfileRepositoryError::connection,
    )
}

fn row_to_profile(row: UserRow) -> Result<Profile, ProfileRepositoryError> {
    row.into_profile()
        .map_err(|err| ProfileRepositoryError::query(err.to_string()))
}

fn rows_to_profiles(rows: Vec<UserRow>) -> Result<Vec<Profile>, ProfileRepositoryError> {
    rows.into_iter().map(row_to_profile).collect()
}

#[async_trait]
impl ProfileRepository for DieselProfileRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, ProfileRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = users::table
            .find(id.as_uuid())
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_profile).transpose()
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<Profile>, ProfileRepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let raw: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

        let rows = users::table
            .filter(users::id.eq_any(raw))
            .order(users::id.asc())
            .select(UserRow::as_select())
            .load::<UserRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows_to_profiles(rows)
    }

    async fn candidate_pool(
        &self,
        for_user: &UserId,
    ) -> Result<Vec<Profile>, ProfileRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let me = *for_user.as_uuid();

        let liked = user_likes::table
            .filter(user_likes::user_id.eq(me))
            .select(user_likes::liked_user_id);
        let rejected = user_rejections::table
            .filter(user_rejections::user_id.eq(me))
            .select(user_rejections::rejected_user_id);

        let rows = users::table
            .filter(users::is_active.eq(true))
            .filter(users::id.ne(me))
            .filter(users::id.ne_all(liked))
            .filter(users::id.ne_all(rejected))
            .order(users::id.asc())
            .select(UserRow::as_select())
            .load::<UserRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows_to_profiles(rows)
    }

    async fn list_active(&self) -> Result<Vec<Profile>, ProfileRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows = users::table
            .filter(users::is_active.eq(true))
            .order(users::id.asc())
            .select(UserRow::as_select())
            .load::<UserRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows_to_profiles(rows)
    }

    async fn deactivate_idle_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, ProfileRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let changed = diesel::update(
            users::table
                .filter(users::is_active.eq(true))
                .filter(users::last_seen_at.lt(cutoff)),
        )
        .set(users::is_active.eq(false))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(changed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample_row() -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            display_name: "Ada Lovelace".to_owned(),
            avatar_url: None,
            interest_vector: Some(vec![Some(4.0), None, Some(2.0)]),
            privacy_vector: None,
            lat: Some(52.52),
            lng: Some(13.405),
            is_active: true,
            last_seen_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[rstest]
    fn row_conversion_builds_location_and_vector() {
        let profile = row_to_profile(sample_row()).expect("row converts");
        assert!(profile.location.is_some());
        let vector = profile.interest_vector.expect("vector present");
        assert_eq!(vector.slots().first(), Some(&Some(4.0)));
        assert_eq!(vector.slots().get(1), Some(&None));
    }

    #[rstest]
    fn row_conversion_rejects_invalid_display_name() {
        let mut row = sample_row();
        row.display_name = String::new();
        let error = row_to_profile(row).expect_err("empty name fails");
        assert!(matches!(error, ProfileRepositoryError::Query { .. }));
    }

    #[rstest]
    fn partial_coordinates_resolve_to_no_location() {
        let mut row = sample_row();
        row.lng = None;
        let profile = row_to_profile(row).expect("row converts");
        assert!(profile.location.is_none());
    }

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let repo_err = map_pool_error(PoolError::checkout("connection refused"));
        assert!(matches!(repo_err, ProfileRepositoryError::Connection { .. }));
    }
}
