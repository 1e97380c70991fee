//! Diesel-based persistence adapters for the domain ports.

use diesel_async::AsyncPgConnection;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

mod diesel_conversation_repository;
mod diesel_group_repository;
mod diesel_identity_resolver;
mod diesel_interest_catalog;
mod diesel_notification_repository;
mod diesel_profile_repository;
mod diesel_swipe_repository;
mod error_mapping;
pub mod models;
pub mod pool;
pub mod schema;

pub use diesel_conversation_repository::DieselConversationRepository;
pub use diesel_group_repository::DieselGroupRepository;
pub use diesel_identity_resolver::DieselIdentityResolver;
pub use diesel_interest_catalog::DieselInterestCatalog;
pub use diesel_notification_repository::DieselNotificationRepository;
pub use diesel_profile_repository::DieselProfileRepository;
pub use diesel_swipe_repository::DieselSwipeRepository;
pub use pool::{DbPool, PoolConfig, PoolError};

/// Migrations compiled into the binary from `migrations/`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Apply all pending migrations against the database.
///
/// Runs on a blocking thread: the migration harness drives a synchronous
/// connection facade.
///
/// # Errors
///
/// Returns [`PoolError::Build`] when connecting or migrating fails.
pub async fn run_pending_migrations(database_url: &str) -> Result<(), PoolError> {
    let url = database_url.to_owned();
    tokio::task::spawn_blocking(move || {
        use diesel::Connection;
        use diesel_migrations::MigrationHarness;

        let mut conn = AsyncConnectionWrapper::<AsyncPgConnection>::establish(&url)
            .map_err(|err| PoolError::build(err.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map(|_| ())
            .map_err(|err| PoolError::build(err.to_string()))
    })
    .await
    .map_err(|err| PoolError::build(err.to_string()))?
}
