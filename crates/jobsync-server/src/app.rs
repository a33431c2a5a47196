//! Application setup: shared state and the router.

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use jobsync_core::{JobStore, SyncService};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::routes::{fetch_jobs_handler, get_job_handler, health_handler, list_jobs_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SyncService>,
}

impl AppState {
    pub fn new(sync: Arc<SyncService>) -> Self {
        Self { sync }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        self.sync.store()
    }
}

/// Builds the HTTP API.
///
/// | method | path               | purpose                        |
/// |--------|--------------------|--------------------------------|
/// | GET    | `/jobs/fetch-jobs` | run a sync, return its report  |
/// | POST   | `/jobs/sync`       | same as above                  |
/// | GET    | `/jobs`            | list stored jobs               |
/// | GET    | `/jobs/:id`        | one stored job by external id  |
/// | GET    | `/health`          | store liveness                 |
pub fn build_router(sync: Arc<SyncService>) -> Router {
    Router::new()
        .route("/jobs/fetch-jobs", get(fetch_jobs_handler))
        .route("/jobs/sync", post(fetch_jobs_handler))
        .route("/jobs", get(list_jobs_handler))
        .route("/jobs/:external_id", get(get_job_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(sync))
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn run<F>(
    listener: TcpListener,
    sync: Arc<SyncService>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(sync))
        .with_graceful_shutdown(shutdown)
        .await
}
