//! Candidate cache adapters.
//!
//! Two implementations of the cache port: a process-local TTL map for
//! database-less deployments and tests, and a Redis adapter over
//! `bb8-redis` with namespaced keys and TTL jitter so a fleet of entries
//! written together does not expire together.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bb8_redis::redis::AsyncCommands;
use bb8_redis::{RedisConnectionManager, bb8};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::domain::matching::RankedCandidate;
use crate::domain::ports::{CandidateCache, CandidateCacheError};
use crate::domain::user::UserId;

/// Base lifetime of a cached candidate pool.
const CACHE_TTL: Duration = Duration::from_secs(24 * 3600);
/// Upper bound of the additive jitter, as a fraction of the base TTL.
const JITTER_FRACTION: f64 = 0.1;

/// Key namespace; bump the version to invalidate across deploys.
fn cache_key(user: &UserId) -> String {
    format!("cand:v1:{user}")
}

/// Base TTL plus up to [`JITTER_FRACTION`] of random slack.
fn jittered_ttl() -> Duration {
    let base = CACHE_TTL.as_secs();
    let jitter_cap = (base as f64 * JITTER_FRACTION) as u64;
    let mut rng = SmallRng::from_entropy();
    Duration::from_secs(base + rng.gen_range(0..=jitter_cap))
}

struct MemoryEntry {
    expires_at: Instant,
    entries: Vec<RankedCandidate>,
}

/// Process-local candidate cache with per-entry expiry.
#[derive(Default)]
pub struct InMemoryCandidateCache {
    entries: Mutex<HashMap<UserId, MemoryEntry>>,
}

impl InMemoryCandidateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandidateCache for InMemoryCandidateCache {
    async fn get(
        &self,
        user: &UserId,
    ) -> Result<Option<Vec<RankedCandidate>>, CandidateCacheError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match entries.get(user) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.entries.clone())),
            Some(_) => {
                entries.remove(user);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        user: &UserId,
        pool: &[RankedCandidate],
    ) -> Result<(), CandidateCacheError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(
            *user,
            MemoryEntry {
                expires_at: Instant::now() + jittered_ttl(),
                entries: pool.to_vec(),
            },
        );
        Ok(())
    }

    async fn invalidate(&self, user: &UserId) -> Result<(), CandidateCacheError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(user);
        Ok(())
    }
}

/// Redis-backed candidate cache over a bb8 connection pool.
#[derive(Clone)]
pub struct RedisCandidateCache {
    pool: bb8::Pool<RedisConnectionManager>,
}

impl RedisCandidateCache {
    /// Connect to Redis and build the connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`CandidateCacheError::Backend`] when the URL is invalid or
    /// the pool cannot be built.
    pub async fn connect(url: &str) -> Result<Self, CandidateCacheError> {
        let manager = RedisConnectionManager::new(url)
            .map_err(|err| CandidateCacheError::backend(err.to_string()))?;
        let pool = bb8::Pool::builder()
            .build(manager)
            .await
            .map_err(|err| CandidateCacheError::backend(err.to_string()))?;
        Ok(Self { pool })
    }

    async fn connection(
        &self,
    ) -> Result<bb8::PooledConnection<'_, RedisConnectionManager>, CandidateCacheError> {
        self.pool
            .get()
            .await
            .map_err(|err| CandidateCacheError::backend(err.to_string()))
    }
}

#[async_trait]
impl CandidateCache for RedisCandidateCache {
    async fn get(
        &self,
        user: &UserId,
    ) -> Result<Option<Vec<RankedCandidate>>, CandidateCacheError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(cache_key(user))
            .await
            .map_err(|err| CandidateCacheError::backend(err.to_string()))?;

        raw.map(|body| {
            serde_json::from_str(&body)
                .map_err(|err| CandidateCacheError::serialization(err.to_string()))
        })
        .transpose()
    }

    async fn put(
        &self,
        user: &UserId,
        pool: &[RankedCandidate],
    ) -> Result<(), CandidateCacheError> {
        let body = serde_json::to_string(pool)
            .map_err(|err| CandidateCacheError::serialization(err.to_string()))?;
        let mut conn = self.connection().await?;
        let _: () = conn
            .set_ex(cache_key(user), body, jittered_ttl().as_secs())
            .await
            .map_err(|err| CandidateCacheError::backend(err.to_string()))?;
        Ok(())
    }

    async fn invalidate(&self, user: &UserId) -> Result<(), CandidateCacheError> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .del(cache_key(user))
            .await
            .map_err(|err| CandidateCacheError::backend(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entry(score: f64) -> RankedCandidate {
        RankedCandidate {
            user: UserId::random(),
            display_name: "Cached".to_owned(),
            avatar_url: None,
            score,
            distance_km: None,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn memory_cache_round_trips() {
        let cache = InMemoryCandidateCache::new();
        let user = UserId::random();
        let pool = vec![entry(0.7), entry(0.3)];

        cache.put(&user, &pool).await.expect("put succeeds");
        let got = cache.get(&user).await.expect("get succeeds");
        assert_eq!(got, Some(pool));
    }

    #[rstest]
    #[tokio::test]
    async fn memory_cache_misses_for_unknown_user() {
        let cache = InMemoryCandidateCache::new();
        let got = cache.get(&UserId::random()).await.expect("get succeeds");
        assert!(got.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn memory_cache_invalidate_removes_entry() {
        let cache = InMemoryCandidateCache::new();
        let user = UserId::random();
        cache.put(&user, &[entry(0.5)]).await.expect("put succeeds");
        cache.invalidate(&user).await.expect("invalidate succeeds");
        assert!(cache.get(&user).await.expect("get succeeds").is_none());
    }

    #[rstest]
    fn jitter_stays_within_bounds() {
        for _ in 0..32 {
            let ttl = jittered_ttl().as_secs();
            assert!(ttl >= CACHE_TTL.as_secs());
            assert!(ttl <= CACHE_TTL.as_secs() + CACHE_TTL.as_secs() / 10);
        }
    }

    #[rstest]
    fn keys_are_namespaced_per_user() {
        let user = UserId::random();
        let key = cache_key(&user);
        assert!(key.starts_with("cand:v1:"));
        assert!(key.ends_with(&user.to_string()));
    }
}
