//! Interval-driven background jobs.
//!
//! The grouping sweep, cache refresh, and inactivity sweep run on their
//! own schedules in separate tasks so the request-serving path never
//! waits on them. All three are idempotent, which is what makes the
//! cadence safe to tune aggressively.

use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::server::config::ServerConfig;
use crate::server::state_builders::AppState;

pub(crate) fn spawn_background_jobs(state: &AppState, config: &ServerConfig) {
    let grouping = state.http_state.grouping.clone();
    let grouping_interval = config.grouping_interval;
    tokio::spawn(async move {
        let mut ticker = time::interval(grouping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so startup stays
        // light.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(error) = grouping.run_sweep().await {
                warn!(%error, "scheduled grouping sweep failed");
            }
        }
    });

    let matching = state.http_state.matching.clone();
    let cache_interval = config.cache_refresh_interval;
    tokio::spawn(async move {
        let mut ticker = time::interval(cache_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(error) = matching.refresh_all_caches().await {
                warn!(%error, "scheduled cache refresh failed");
            }
        }
    });

    let maintenance = state.http_state.maintenance.clone();
    let deactivation_interval = config.deactivation_interval;
    tokio::spawn(async move {
        let mut ticker = time::interval(deactivation_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match maintenance.deactivate_idle().await {
                Ok(0) => {}
                Ok(deactivated) => info!(deactivated, "deactivated idle users"),
                Err(error) => warn!(%error, "scheduled inactivity sweep failed"),
            }
        }
    });
}
