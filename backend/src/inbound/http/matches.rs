//! Candidate ranking and swipe HTTP handlers.
//!
//! ```text
//! GET  /api/v1/matches
//! POST /api/v1/matches/{id}/swipe
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::matching::{MatchParams, RankedCandidate};
use crate::domain::swipes::{SwipeAction, SwipeOutcome};
use crate::domain::{Error, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Identity;
use crate::inbound::http::state::HttpState;

/// Query knobs for the matches listing; all optional.
#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    /// Maximum results returned.
    pub limit: Option<usize>,
    /// Blend weight in `[0, 1]`.
    pub alpha: Option<f64>,
    /// Geo radius in kilometres.
    pub radius_km: Option<f64>,
    /// Pool cap applied before scoring.
    pub pool_size: Option<usize>,
}

/// One ranked candidate in the response.
#[derive(Debug, Serialize)]
pub struct MatchCandidateBody {
    /// Candidate identifier.
    pub id: UserId,
    /// Candidate display name.
    pub display_name: String,
    /// Candidate avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Blended similarity score.
    pub score: f64,
    /// Distance in kilometres, when shareable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl From<RankedCandidate> for MatchCandidateBody {
    fn from(value: RankedCandidate) -> Self {
        Self {
            id: value.user,
            display_name: value.display_name,
            avatar_url: value.avatar_url,
            score: value.score,
            distance_km: value.distance_km,
        }
    }
}

fn params_from_query(query: MatchQuery) -> Result<MatchParams, Error> {
    let mut params = MatchParams::default();
    if let Some(limit) = query.limit {
        if limit == 0 {
            return Err(Error::invalid_request("limit must be at least 1"));
        }
        params.limit = limit;
    }
    if let Some(alpha) = query.alpha {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(Error::invalid_request("alpha must be within [0, 1]"));
        }
        params.alpha = alpha;
    }
    if let Some(radius_km) = query.radius_km {
        if radius_km <= 0.0 {
            return Err(Error::invalid_request("radius_km must be positive"));
        }
        params.radius_km = radius_km;
    }
    if let Some(pool_size) = query.pool_size {
        if pool_size == 0 {
            return Err(Error::invalid_request("pool_size must be at least 1"));
        }
        params.pool_size = pool_size;
    }
    Ok(params)
}

/// Ranked candidates for the authenticated user.
#[get("/matches")]
pub async fn list_matches(
    state: web::Data<HttpState>,
    identity: Identity,
    query: web::Query<MatchQuery>,
) -> ApiResult<web::Json<Vec<MatchCandidateBody>>> {
    let params = params_from_query(query.into_inner())?;
    let ranked = state
        .matching
        .rank_candidates(identity.user_id(), &params)
        .await?;
    Ok(web::Json(ranked.into_iter().map(Into::into).collect()))
}

/// Swipe request payload. Serde rejects unknown actions before the
/// handler runs.
#[derive(Debug, Deserialize)]
pub struct SwipeBody {
    /// The swipe decision.
    pub action: SwipeAction,
}

/// Swipe response payload.
#[derive(Debug, Serialize)]
pub struct SwipeResponseBody {
    /// Whether the swipe completed a mutual match.
    pub mutual: bool,
    /// The pair's direct conversation, present on mutual.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Uuid>,
}

impl From<&SwipeOutcome> for SwipeResponseBody {
    fn from(value: &SwipeOutcome) -> Self {
        Self {
            mutual: value.mutual,
            conversation_id: value.conversation_id,
        }
    }
}

/// Apply a swipe to the target user. Returns 201 when the mutual match
/// created the pair's conversation, 200 otherwise.
#[post("/matches/{id}/swipe")]
pub async fn swipe(
    state: web::Data<HttpState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<SwipeBody>,
) -> ApiResult<HttpResponse> {
    let target = UserId::new(path.into_inner());
    let outcome = state
        .swipes
        .swipe(identity.user_id(), &target, body.action)
        .await?;

    let payload = SwipeResponseBody::from(&outcome);
    if outcome.created_conversation {
        Ok(HttpResponse::Created().json(payload))
    } else {
        Ok(HttpResponse::Ok().json(payload))
    }
}
