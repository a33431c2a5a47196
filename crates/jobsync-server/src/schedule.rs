use std::sync::Arc;
use std::time::Duration;

use jobsync_core::SyncService;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Runs `sync_jobs` every `period` until the returned handle is aborted.
///
/// The first run starts immediately. A run that outlasts the period delays
/// the next tick instead of queueing extra runs, so two scheduled syncs never
/// overlap. Failures are logged and the schedule continues.
pub fn spawn_scheduled_sync(service: Arc<SyncService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match service.sync_jobs().await {
                Ok(report) => tracing::info!(
                    created = report.stats.created,
                    updated = report.stats.updated,
                    unchanged = report.stats.unchanged,
                    failed = report.stats.failed,
                    rejected = report.rejected.len(),
                    "Scheduled sync finished"
                ),
                Err(e) => tracing::error!(error = %e, "Scheduled sync failed"),
            }
        }
    })
}
