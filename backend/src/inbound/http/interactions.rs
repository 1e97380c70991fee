//! Like/reject history HTTP handlers.
//!
//! ```text
//! GET    /api/v1/interactions
//! POST   /api/v1/interactions/reset
//! DELETE /api/v1/interactions/{id}
//! ```

use actix_web::{delete, get, post, web};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::user::Profile;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Identity;
use crate::inbound::http::state::HttpState;

/// Compact user payload for history listings.
#[derive(Debug, Serialize)]
pub struct ShortUserBody {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub display_name: String,
    /// Avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<Profile> for ShortUserBody {
    fn from(value: Profile) -> Self {
        Self {
            id: value.id,
            display_name: value.display_name.to_string(),
            avatar_url: value.avatar_url,
        }
    }
}

/// Interaction history payload.
#[derive(Debug, Serialize)]
pub struct InteractionsBody {
    /// Users the caller liked.
    pub liked: Vec<ShortUserBody>,
    /// Users the caller rejected.
    pub rejected: Vec<ShortUserBody>,
}

/// Acknowledgement payload for history mutations.
#[derive(Debug, Serialize)]
pub struct StatusBody {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Number of rows removed.
    pub removed: u64,
}

/// The caller's like/reject history.
#[get("/interactions")]
pub async fn list_interactions(
    state: web::Data<HttpState>,
    identity: Identity,
) -> ApiResult<web::Json<InteractionsBody>> {
    let interactions = state.swipes.list_interactions(identity.user_id()).await?;
    Ok(web::Json(InteractionsBody {
        liked: interactions.liked.into_iter().map(Into::into).collect(),
        rejected: interactions.rejected.into_iter().map(Into::into).collect(),
    }))
}

/// Clear the caller's entire skip/dislike history.
#[post("/interactions/reset")]
pub async fn reset_rejections(
    state: web::Data<HttpState>,
    identity: Identity,
) -> ApiResult<web::Json<StatusBody>> {
    let removed = state.swipes.reset_rejections(identity.user_id()).await?;
    Ok(web::Json(StatusBody {
        status: "ok",
        removed,
    }))
}

/// Remove the caller's rejection of one user.
#[delete("/interactions/{id}")]
pub async fn remove_rejection(
    state: web::Data<HttpState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<StatusBody>> {
    let target = UserId::new(path.into_inner());
    let removed = state
        .swipes
        .remove_rejection(identity.user_id(), &target)
        .await?;
    Ok(web::Json(StatusBody {
        status: "ok",
        removed,
    }))
}
