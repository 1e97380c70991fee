//! PostgreSQL-backed interest catalogue.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{InterestCatalog, InterestCatalogError};

use super::pool::DbPool;
use super::schema::interests;

/// Diesel-backed implementation of the interest catalogue port.
#[derive(Clone)]
pub struct DieselInterestCatalog {
    pool: DbPool,
}

impl DieselInterestCatalog {
    /// Create a new catalogue with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterestCatalog for DieselInterestCatalog {
    async fn names(&self) -> Result<Vec<String>, InterestCatalogError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| InterestCatalogError::unavailable(err.to_string()))?;

        interests::table
            .order(interests::id.asc())
            .select(interests::name)
            .load::<String>(&mut conn)
            .await
            .map_err(|err| InterestCatalogError::unavailable(err.to_string()))
    }
}
