//! Housekeeping over the user base.

use std::sync::Arc;

use chrono::Duration;

use crate::domain::Error;
use crate::domain::ports::{Clock, ProfileRepository, ProfileRepositoryError};

/// Days of silence after which a user is deactivated.
pub const IDLE_DAYS: i64 = 7;

fn map_profile_error(error: ProfileRepositoryError) -> Error {
    match error {
        ProfileRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("profile repository unavailable: {message}"))
        }
        ProfileRepositoryError::Query { message } => {
            Error::internal(format!("profile repository error: {message}"))
        }
    }
}

/// Scheduled housekeeping tasks.
#[derive(Clone)]
pub struct MaintenanceService {
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl MaintenanceService {
    /// Create a new maintenance service.
    pub fn new(profiles: Arc<dyn ProfileRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { profiles, clock }
    }

    /// Deactivate users idle for at least [`IDLE_DAYS`]; returns how many
    /// rows changed.
    pub async fn deactivate_idle(&self) -> Result<u64, Error> {
        let cutoff = self.clock.now() - Duration::days(IDLE_DAYS);
        self.profiles
            .deactivate_idle_since(cutoff)
            .await
            .map_err(map_profile_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockClock, MockProfileRepository};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn cutoff_is_seven_days_before_now() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).single().expect("valid timestamp");
        let mut clock = MockClock::new();
        clock.expect_now().return_const(now);

        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_deactivate_idle_since()
            .withf(move |cutoff| *cutoff == now - Duration::days(7))
            .returning(|_| Ok(3));

        let service = MaintenanceService::new(Arc::new(profiles), Arc::new(clock));
        assert_eq!(service.deactivate_idle().await.expect("sweep succeeds"), 3);
    }
}
