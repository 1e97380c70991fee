//! Database-backed identity resolver.
//!
//! Stands in for the external authenticator: the bearer token is the
//! user's UUID, accepted when the row exists and is active. Resolution
//! also touches `last_seen_at`, which is what the seven-day inactivity
//! sweep keys off.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;

use crate::domain::ports::{IdentityError, IdentityResolver};
use crate::domain::user::UserId;

use super::pool::DbPool;
use super::schema::users;

/// Diesel-backed implementation of the identity resolver port.
#[derive(Clone)]
pub struct DieselIdentityResolver {
    pool: DbPool,
}

impl DieselIdentityResolver {
    /// Create a new resolver with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityResolver for DieselIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Option<UserId>, IdentityError> {
        let Ok(id) = UserId::parse(token) else {
            return Ok(None);
        };

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| IdentityError::unavailable(err.to_string()))?;

        let known: Option<uuid::Uuid> = users::table
            .find(id.as_uuid())
            .filter(users::is_active.eq(true))
            .select(users::id)
            .first::<uuid::Uuid>(&mut conn)
            .await
            .optional()
            .map_err(|err| IdentityError::unavailable(err.to_string()))?;

        let Some(known) = known else {
            return Ok(None);
        };

        // Activity bookkeeping is best effort; authentication already
        // succeeded.
        if let Err(error) = diesel::update(users::table.find(known))
            .set(users::last_seen_at.eq(Utc::now()))
            .execute(&mut conn)
            .await
        {
            warn!(user = %known, %error, "failed to touch last_seen_at");
        }

        Ok(Some(UserId::new(known)))
    }
}
