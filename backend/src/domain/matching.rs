//! Candidate ranking and the time-boxed candidate cache.
//!
//! The pool is bounded before scoring: geography (when known) orders and
//! restricts it, then it is truncated to `pool_size` so scoring cost stays
//! capped regardless of population. Exclusion is asymmetric on purpose:
//! only the requester's own outgoing like/reject edges hide a candidate.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::Error;
use crate::domain::ports::{
    CandidateCache, ProfileRepository, ProfileRepositoryError,
};
use crate::domain::scoring::blend_similarity;
use crate::domain::user::{InterestVector, PrivacyField, Profile, UserId};

/// Default number of candidates returned to the client.
pub const DEFAULT_LIMIT: usize = 10;
/// Default blend weight between cosine and closeness.
pub const DEFAULT_ALPHA: f64 = 0.5;
/// Default geo radius in kilometres.
pub const DEFAULT_RADIUS_KM: f64 = 50.0;
/// Default cap on the scored pool.
pub const DEFAULT_POOL_SIZE: usize = 200;
/// Number of entries kept in a cached pool refresh.
const CACHE_POOL_LIMIT: usize = 100;

/// Tunable knobs for one ranking request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchParams {
    /// Maximum number of results returned.
    pub limit: usize,
    /// Blend weight `alpha` in `[0, 1]`.
    pub alpha: f64,
    /// Geo radius in kilometres, applied when the requester has a location.
    pub radius_km: f64,
    /// Pool cap applied before scoring.
    pub pool_size: usize,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            alpha: DEFAULT_ALPHA,
            radius_km: DEFAULT_RADIUS_KM,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl MatchParams {
    /// Whether every ranking-affecting knob matches the defaults, making a
    /// cached pool reusable for this request (`limit` only slices).
    fn uses_default_knobs(&self) -> bool {
        let defaults = Self::default();
        self.alpha == defaults.alpha
            && self.radius_km == defaults.radius_km
            && self.pool_size == defaults.pool_size
    }
}

/// One scored candidate, ready for the boundary layer.
///
/// `distance_km` is already filtered through the candidate's privacy
/// flags, so cached entries can be served verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// Candidate identifier.
    pub user: UserId,
    /// Candidate display name.
    pub display_name: String,
    /// Candidate avatar, when the profile has one.
    pub avatar_url: Option<String>,
    /// Blended similarity score.
    pub score: f64,
    /// Distance from the requester in kilometres, when both locations are
    /// known and the candidate shares theirs.
    pub distance_km: Option<f64>,
}

fn map_repository_error(error: ProfileRepositoryError) -> Error {
    match error {
        ProfileRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("profile repository unavailable: {message}"))
        }
        ProfileRepositoryError::Query { message } => {
            Error::internal(format!("profile repository error: {message}"))
        }
    }
}

/// Candidate ranking service with cache read-through.
#[derive(Clone)]
pub struct MatchingService {
    profiles: Arc<dyn ProfileRepository>,
    cache: Arc<dyn CandidateCache>,
}

impl MatchingService {
    /// Create a new matching service.
    pub fn new(profiles: Arc<dyn ProfileRepository>, cache: Arc<dyn CandidateCache>) -> Self {
        Self { profiles, cache }
    }

    /// Rank candidates for a user.
    ///
    /// Serves from the cache when the request uses default knobs and a
    /// fresh entry exists; otherwise recomputes (and, for default knobs,
    /// writes the result back). Cache trouble is logged, never surfaced.
    pub async fn rank_candidates(
        &self,
        user: &UserId,
        params: &MatchParams,
    ) -> Result<Vec<RankedCandidate>, Error> {
        if params.uses_default_knobs() {
            match self.cache.get(user).await {
                Ok(Some(mut cached)) => {
                    cached.truncate(params.limit);
                    return Ok(cached);
                }
                Ok(None) => {}
                Err(error) => warn!(%user, %error, "candidate cache read failed"),
            }
        }

        let mut ranked = self.compute_ranked(user, params).await?;

        if params.uses_default_knobs() {
            let head: Vec<RankedCandidate> =
                ranked.iter().take(CACHE_POOL_LIMIT).cloned().collect();
            if let Err(error) = self.cache.put(user, &head).await {
                warn!(%user, %error, "candidate cache write failed");
            }
        }

        ranked.truncate(params.limit);
        Ok(ranked)
    }

    /// Recompute and cache one user's pool, replacing any existing entry.
    pub async fn refresh_cache(&self, user: &UserId) -> Result<(), Error> {
        let params = MatchParams {
            limit: CACHE_POOL_LIMIT,
            ..MatchParams::default()
        };
        let mut ranked = self.compute_ranked(user, &params).await?;
        ranked.truncate(CACHE_POOL_LIMIT);
        if let Err(error) = self.cache.put(user, &ranked).await {
            warn!(%user, %error, "candidate cache write failed");
        }
        Ok(())
    }

    /// Refresh the cached pool of every active user; returns how many
    /// users were processed.
    pub async fn refresh_all_caches(&self) -> Result<usize, Error> {
        let active = self
            .profiles
            .list_active()
            .await
            .map_err(map_repository_error)?;
        let mut refreshed = 0;
        for profile in &active {
            match self.refresh_cache(&profile.id).await {
                Ok(()) => refreshed += 1,
                // A vanished user between listing and refresh is not worth
                // failing the whole sweep over.
                Err(error) => warn!(user = %profile.id, %error, "cache refresh skipped"),
            }
        }
        Ok(refreshed)
    }

    async fn compute_ranked(
        &self,
        user: &UserId,
        params: &MatchParams,
    ) -> Result<Vec<RankedCandidate>, Error> {
        let requester = self
            .profiles
            .find_by_id(user)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("user {user} not found")))?;

        let pool = self
            .profiles
            .candidate_pool(user)
            .await
            .map_err(map_repository_error)?;

        let my_vector = requester.interests_or_neutral();
        let mut pool = apply_geo(pool, &requester, params.radius_km);
        pool.truncate(params.pool_size);

        let mut ranked: Vec<RankedCandidate> = pool
            .into_iter()
            .map(|(profile, distance_km)| score_candidate(&my_vector, profile, distance_km, params))
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.user.cmp(&b.user))
        });
        Ok(ranked)
    }
}

/// Apply the geo radius and distance ordering when the requester has a
/// location; otherwise keep the repository's stable id order.
fn apply_geo(
    pool: Vec<Profile>,
    requester: &Profile,
    radius_km: f64,
) -> Vec<(Profile, Option<f64>)> {
    let Some(origin) = requester.location else {
        return pool.into_iter().map(|profile| (profile, None)).collect();
    };

    let mut located: Vec<(Profile, Option<f64>)> = pool
        .into_iter()
        .filter_map(|profile| {
            let distance = profile.location.map(|point| origin.distance_km(&point))?;
            (distance <= radius_km).then_some((profile, Some(distance)))
        })
        .collect();

    located.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.0.id.cmp(&b.0.id)),
        _ => Ordering::Equal,
    });
    located
}

fn score_candidate(
    my_vector: &InterestVector,
    profile: Profile,
    distance_km: Option<f64>,
    params: &MatchParams,
) -> RankedCandidate {
    let score = blend_similarity(my_vector, &profile.interests_or_neutral(), params.alpha);
    let distance_km = distance_km.filter(|_| profile.privacy.allows(PrivacyField::Location));
    RankedCandidate {
        user: profile.id,
        display_name: profile.display_name.to_string(),
        avatar_url: profile.avatar_url,
        score,
        distance_km,
    }
}
