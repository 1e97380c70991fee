//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::time::Duration;

/// Default grouping sweep cadence.
const DEFAULT_GROUPING_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Default full cache refresh cadence.
const DEFAULT_CACHE_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Default inactivity sweep cadence.
const DEFAULT_DEACTIVATION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Builder-style configuration for creating the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) database_url: Option<String>,
    pub(crate) redis_url: Option<String>,
    pub(crate) grouping_interval: Duration,
    pub(crate) cache_refresh_interval: Duration,
    pub(crate) deactivation_interval: Duration,
}

impl ServerConfig {
    /// Construct a configuration with default job cadences and no
    /// external backends (in-memory adapters).
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            database_url: None,
            redis_url: None,
            grouping_interval: DEFAULT_GROUPING_INTERVAL,
            cache_refresh_interval: DEFAULT_CACHE_REFRESH_INTERVAL,
            deactivation_interval: DEFAULT_DEACTIVATION_INTERVAL,
        }
    }

    /// Attach a PostgreSQL URL; enables the Diesel adapters.
    #[must_use]
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Attach a Redis URL; enables the Redis candidate cache.
    #[must_use]
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Override the grouping sweep cadence.
    #[must_use]
    pub fn with_grouping_interval(mut self, interval: Duration) -> Self {
        self.grouping_interval = interval;
        self
    }

    /// Override the full cache refresh cadence.
    #[must_use]
    pub fn with_cache_refresh_interval(mut self, interval: Duration) -> Self {
        self.cache_refresh_interval = interval;
        self
    }

    /// Override the inactivity sweep cadence.
    #[must_use]
    pub fn with_deactivation_interval(mut self, interval: Duration) -> Self {
        self.deactivation_interval = interval;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_have_no_external_backends() {
        let config = ServerConfig::new(([127, 0, 0, 1], 8080).into());
        assert!(config.database_url.is_none());
        assert!(config.redis_url.is_none());
        assert_eq!(config.grouping_interval, DEFAULT_GROUPING_INTERVAL);
    }

    #[rstest]
    fn builder_overrides_apply() {
        let config = ServerConfig::new(([127, 0, 0, 1], 8080).into())
            .with_database_url("postgres://localhost/app")
            .with_redis_url("redis://localhost")
            .with_grouping_interval(Duration::from_secs(30));
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/app"));
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost"));
        assert_eq!(config.grouping_interval, Duration::from_secs(30));
    }
}
