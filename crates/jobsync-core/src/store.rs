//! Seams between the sync engine and its collaborators.
//!
//! The engine never reaches for a global connection: a [`JobStore`] and a
//! [`JobFeed`] are handed to it, which lets tests swap in the doubles from
//! [`crate::testing`].

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{FeedBatch, JobPosting, JobQuery, StoreStats, StoredJob};

/// Persistent collection of job postings keyed by external identifier.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts the posting, or replaces every field of the record with the
    /// same `external_id`. Returns the store id of the affected record.
    async fn upsert(&self, posting: &JobPosting, content_hash: &str) -> Result<Uuid, AppError>;

    /// Returns `external_id -> content_hash` for every stored record.
    async fn content_hashes(&self) -> Result<HashMap<String, Option<String>>, AppError>;

    /// Refreshes `last_updated_at` without touching the data. Returns true if a record matched.
    async fn touch(&self, external_id: &str) -> Result<bool, AppError>;

    async fn get(&self, external_id: &str) -> Result<Option<StoredJob>, AppError>;

    /// Lists stored jobs, most recently updated first.
    async fn list(&self, query: &JobQuery) -> Result<Vec<StoredJob>, AppError>;

    async fn stats(&self) -> Result<StoreStats, AppError>;

    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Source of job postings.
#[async_trait]
pub trait JobFeed: Send + Sync {
    /// Fetches one batch. Any error means nothing usable was received.
    async fn fetch_batch(&self) -> Result<FeedBatch, AppError>;
}
