//! Operator-triggered job endpoints.
//!
//! The same work the scheduler runs on an interval, exposed for external
//! triggering. Each handler is idempotent and safe to re-run.
//!
//! ```text
//! POST /api/v1/jobs/refresh-cache/{user_id}
//! POST /api/v1/jobs/refresh-caches
//! POST /api/v1/jobs/grouping
//! POST /api/v1/jobs/deactivate-idle
//! ```

use actix_web::{post, web};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::UserId;
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Acknowledgement payload for job triggers.
#[derive(Debug, Serialize)]
pub struct JobStatusBody {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Units of work processed, where the job counts any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<u64>,
}

impl JobStatusBody {
    fn ok() -> Self {
        Self {
            status: "ok",
            processed: None,
        }
    }

    fn processed(count: u64) -> Self {
        Self {
            status: "ok",
            processed: Some(count),
        }
    }
}

/// Recompute one user's cached candidate pool.
#[post("/jobs/refresh-cache/{user_id}")]
pub async fn refresh_cache(
    state: web::Data<HttpState>,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<JobStatusBody>> {
    let user = UserId::new(path.into_inner());
    state.matching.refresh_cache(&user).await?;
    Ok(web::Json(JobStatusBody::ok()))
}

/// Recompute every active user's cached candidate pool.
#[post("/jobs/refresh-caches")]
pub async fn refresh_all_caches(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<JobStatusBody>> {
    let refreshed = state.matching.refresh_all_caches().await?;
    Ok(web::Json(JobStatusBody::processed(refreshed as u64)))
}

/// Run one grouping sweep.
#[post("/jobs/grouping")]
pub async fn run_grouping(state: web::Data<HttpState>) -> ApiResult<web::Json<JobStatusBody>> {
    let report = state.grouping.run_sweep().await?;
    Ok(web::Json(JobStatusBody::processed(report.groups_created as u64)))
}

/// Deactivate users idle for at least seven days.
#[post("/jobs/deactivate-idle")]
pub async fn deactivate_idle(state: web::Data<HttpState>) -> ApiResult<web::Json<JobStatusBody>> {
    let deactivated = state.maintenance.deactivate_idle().await?;
    Ok(web::Json(JobStatusBody::processed(deactivated)))
}
