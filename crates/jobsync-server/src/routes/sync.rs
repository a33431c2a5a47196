use axum::extract::State;
use axum::Json;
use jobsync_core::SyncReport;
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct SyncResponse {
    message: &'static str,
    report: SyncReport,
}

/// Runs one sync and acknowledges it.
///
/// The acknowledgement carries the full report so callers can see partial
/// failures (`stats.failed`, `rejected`) instead of a bare success flag.
pub async fn fetch_jobs_handler(
    State(state): State<AppState>,
) -> Result<Json<SyncResponse>, ApiError> {
    match state.sync.sync_jobs().await {
        Ok(report) => Ok(Json(SyncResponse {
            message: "Jobs fetched and stored successfully!",
            report,
        })),
        Err(e) => {
            tracing::error!(error = %e, "Job sync failed");
            Err(ApiError::sync_failed(e))
        }
    }
}
