//! jobsync Core - Domain types, error handling, configuration and the sync engine.

pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod sync;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{
    default_config_path, load_config, parse_config, DbConfig, FeedConfig, FileConfig, HttpConfig,
    SyncConfig, DEFAULT_FEED_URL,
};
pub use error::AppError;
pub use models::{
    EmploymentType, FeedBatch, JobPosting, JobQuery, RejectedRecord, StoreStats, StoredJob,
};
pub use store::{JobFeed, JobStore};
pub use sync::{
    collapse_duplicates, needs_reprocessing, quarantine_invalid, ReprocessingDecision, SyncOutcome,
    SyncReport, SyncService, SyncStats,
};
