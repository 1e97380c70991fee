//! PostgreSQL-backed `GroupRepository` implementation using Diesel.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::grouping::{Group, GroupMember};
use crate::domain::ports::{GroupRepository, GroupRepositoryError};
use crate::domain::user::UserId;

use super::error_mapping::{diesel_error_into, pool_error_into};
use super::models::{GroupMemberRow, GroupRow, NewGroupMemberRow, NewGroupRow};
use super::pool::{DbPool, PoolError};
use super::schema::{group_members, groups};

/// Diesel-backed implementation of the group repository port.
#[derive(Clone)]
pub struct DieselGroupRepository {
    pool: DbPool,
}

impl DieselGroupRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> GroupRepositoryError {
    pool_error_into(error, GroupRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> GroupRepositoryError {
    diesel_error_into(
        error,
        GroupRepositoryError::query,
        GroupRepositoryError::connection,
    )
}

/// Whether any group's full member set equals `wanted`.
fn any_set_matches(memberships: &[(Uuid, Uuid)], wanted: &HashSet<Uuid>) -> bool {
    let mut by_group: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
    for (group_id, user_id) in memberships {
        by_group.entry(*group_id).or_default().insert(*user_id);
    }
    by_group.values().any(|members| members == wanted)
}

#[async_trait]
impl GroupRepository for DieselGroupRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = groups::table
            .find(id)
            .select(GroupRow::as_select())
            .first::<GroupRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(Into::into))
    }

    async fn member_set_exists(
        &self,
        member_ids: &[UserId],
    ) -> Result<bool, GroupRepositoryError> {
        let Some(first) = member_ids.first() else {
            return Ok(false);
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        // Only groups containing the first member can possibly match;
        // their full member sets are then compared in memory.
        let candidate_ids: Vec<Uuid> = group_members::table
            .filter(group_members::user_id.eq(first.as_uuid()))
            .select(group_members::group_id)
            .load::<Uuid>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if candidate_ids.is_empty() {
            return Ok(false);
        }

        let memberships = group_members::table
            .filter(group_members::group_id.eq_any(candidate_ids))
            .select((group_members::group_id, group_members::user_id))
            .load::<(Uuid, Uuid)>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let wanted: HashSet<Uuid> = member_ids.iter().map(|id| *id.as_uuid()).collect();
        Ok(any_set_matches(&memberships, &wanted))
    }

    async fn create_group(
        &self,
        name: &str,
        description: &str,
        member_ids: &[UserId],
    ) -> Result<Group, GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id = Uuid::new_v4();
        let member_rows: Vec<NewGroupMemberRow> = member_ids
            .iter()
            .map(|member| NewGroupMemberRow {
                group_id: id,
                user_id: *member.as_uuid(),
                is_admin: false,
                is_active: true,
            })
            .collect();

        let row = conn
            .transaction::<GroupRow, diesel::result::Error, _>(|conn| {
                async move {
                    let row: GroupRow = diesel::insert_into(groups::table)
                        .values(&NewGroupRow {
                            id,
                            name,
                            description,
                        })
                        .returning(GroupRow::as_returning())
                        .get_result(conn)
                        .await?;

                    diesel::insert_into(group_members::table)
                        .values(&member_rows)
                        .execute(conn)
                        .await?;

                    Ok(row)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        Ok(row.into())
    }

    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Group>, GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let ids: Vec<Uuid> = group_members::table
            .filter(group_members::user_id.eq(user.as_uuid()))
            .filter(group_members::is_active.eq(true))
            .select(group_members::group_id)
            .load::<Uuid>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = groups::table
            .filter(groups::id.eq_any(ids))
            .order(groups::created_at.desc())
            .select(GroupRow::as_select())
            .load::<GroupRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_members(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<GroupMember>, GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows = group_members::table
            .filter(group_members::group_id.eq(group_id))
            .filter(group_members::is_active.eq(true))
            .order(group_members::joined_at.asc())
            .select(GroupMemberRow::as_select())
            .load::<GroupMemberRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn member_set_comparison_is_exact() {
        let (g1, g2) = (Uuid::new_v4(), Uuid::new_v4());
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        // g1 = {a, b, c}, g2 = {a, b}
        let memberships = vec![(g1, a), (g1, b), (g1, c), (g2, a), (g2, b)];

        let pair: HashSet<Uuid> = [a, b].into_iter().collect();
        let triple: HashSet<Uuid> = [a, b, c].into_iter().collect();
        let superset: HashSet<Uuid> = [a, b, c, Uuid::new_v4()].into_iter().collect();

        assert!(any_set_matches(&memberships, &pair));
        assert!(any_set_matches(&memberships, &triple));
        assert!(!any_set_matches(&memberships, &superset));
    }
}
