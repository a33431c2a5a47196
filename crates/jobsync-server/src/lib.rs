//! jobsync Server - HTTP API over the sync service.

pub mod app;
pub mod error;
pub mod routes;
pub mod schedule;

pub use app::{build_router, run, AppState};
pub use error::{ApiError, ErrorBody};
pub use schedule::spawn_scheduled_sync;
