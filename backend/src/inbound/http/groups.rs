//! Interest-group HTTP handlers.
//!
//! ```text
//! GET /api/v1/groups
//! GET /api/v1/groups/{id}/members
//! ```

use actix_web::{get, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::grouping::{Group, GroupMember};
use crate::domain::{Error, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Identity;
use crate::inbound::http::state::HttpState;

/// Group payload.
#[derive(Debug, Serialize)]
pub struct GroupBody {
    /// Group identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Group> for GroupBody {
    fn from(value: Group) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            created_at: value.created_at,
        }
    }
}

/// Group membership payload.
#[derive(Debug, Serialize)]
pub struct GroupMemberBody {
    /// Member identifier.
    pub user: UserId,
    /// Whether the member administers the group.
    pub is_admin: bool,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
}

impl From<GroupMember> for GroupMemberBody {
    fn from(value: GroupMember) -> Self {
        Self {
            user: value.user,
            is_admin: value.is_admin,
            joined_at: value.joined_at,
        }
    }
}

fn map_group_error(error: crate::domain::ports::GroupRepositoryError) -> Error {
    use crate::domain::ports::GroupRepositoryError;
    match error {
        GroupRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("group repository unavailable: {message}"))
        }
        GroupRepositoryError::Query { message } => {
            Error::internal(format!("group repository error: {message}"))
        }
    }
}

/// Groups where the caller is an active member.
#[get("/groups")]
pub async fn list_groups(
    state: web::Data<HttpState>,
    identity: Identity,
) -> ApiResult<web::Json<Vec<GroupBody>>> {
    let groups = state
        .groups
        .list_for_user(identity.user_id())
        .await
        .map_err(map_group_error)?;
    Ok(web::Json(groups.into_iter().map(Into::into).collect()))
}

/// Active members of one group.
#[get("/groups/{id}/members")]
pub async fn list_group_members(
    state: web::Data<HttpState>,
    _identity: Identity,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<Vec<GroupMemberBody>>> {
    let group_id = path.into_inner();
    state
        .groups
        .find_by_id(group_id)
        .await
        .map_err(map_group_error)?
        .ok_or_else(|| Error::not_found(format!("group {group_id} not found")))?;

    let members = state
        .groups
        .list_members(group_id)
        .await
        .map_err(map_group_error)?;
    Ok(web::Json(members.into_iter().map(Into::into).collect()))
}
