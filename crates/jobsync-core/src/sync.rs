//! Job synchronization: delta detection, statistics and the sync run itself.
//!
//! A run fetches one batch from the feed and reconciles it into the store
//! with one upsert per external identifier. Per-record failures are counted
//! and never abort the rest of the batch; a feed failure aborts the run
//! before anything is written.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::AppError;
use crate::models::{FeedBatch, JobPosting, RejectedRecord};
use crate::store::{JobFeed, JobStore};

/// Outcome of processing a single posting during sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Content hash matches the stored record - only the timestamp was refreshed
    Unchanged,
    /// Content changed - stored record replaced
    Updated,
    /// First time this identifier was seen
    Created,
    /// The store rejected the write for this posting
    Failed,
}

/// Statistics for a sync run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub unchanged: usize,
    pub updated: usize,
    pub created: usize,
    pub failed: usize,
}

impl SyncStats {
    /// Creates a new empty stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome, incrementing the appropriate counter.
    pub fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Unchanged => self.unchanged += 1,
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::Created => self.created += 1,
            SyncOutcome::Failed => self.failed += 1,
        }
    }

    /// Returns the total number of processed postings.
    pub fn total(&self) -> usize {
        self.unchanged + self.updated + self.created + self.failed
    }

}

/// Result of delta detection for a posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReprocessingDecision {
    /// Whether the full record has to be written
    pub needs_write: bool,
    /// The outcome classification if the write succeeds
    pub outcome: SyncOutcome,
    /// Human-readable reason for the decision
    pub reason: &'static str,
}

/// Determines if a posting needs to be written based on content hash comparison.
///
/// # Arguments
/// * `existing_hash` - The stored content hash for this identifier (None if new)
/// * `new_hash` - The content hash of the incoming posting
pub fn needs_reprocessing(
    existing_hash: Option<&Option<String>>,
    new_hash: &str,
) -> ReprocessingDecision {
    match existing_hash {
        Some(Some(hash)) if hash == new_hash => ReprocessingDecision {
            needs_write: false,
            outcome: SyncOutcome::Unchanged,
            reason: "content hash matches",
        },
        Some(Some(_)) => ReprocessingDecision {
            needs_write: true,
            outcome: SyncOutcome::Updated,
            reason: "content hash changed",
        },
        Some(None) => ReprocessingDecision {
            needs_write: true,
            outcome: SyncOutcome::Updated,
            reason: "legacy record without hash",
        },
        None => ReprocessingDecision {
            needs_write: true,
            outcome: SyncOutcome::Created,
            reason: "new posting",
        },
    }
}

/// Collapses repeated identifiers so each appears once.
///
/// The later occurrence in feed order wins; it takes the slot of the first
/// occurrence. Returns the unique postings and how many were superseded.
pub fn collapse_duplicates(postings: Vec<JobPosting>) -> (Vec<JobPosting>, usize) {
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(postings.len());
    let mut unique: Vec<JobPosting> = Vec::with_capacity(postings.len());
    let mut superseded = 0;

    for posting in postings {
        match slots.get(&posting.external_id) {
            Some(&slot) => {
                unique[slot] = posting;
                superseded += 1;
            }
            None => {
                slots.insert(posting.external_id.clone(), unique.len());
                unique.push(posting);
            }
        }
    }

    (unique, superseded)
}

/// Splits a fetched batch into postings that pass [`JobPosting::validate`]
/// and quarantined records.
///
/// Records already rejected by the feed are kept first. A posting that
/// fails here is indexed by its position among the batch's postings.
pub fn quarantine_invalid(batch: FeedBatch) -> (Vec<JobPosting>, Vec<RejectedRecord>) {
    let FeedBatch {
        postings,
        mut rejected,
    } = batch;
    let mut valid = Vec::with_capacity(postings.len());

    for (index, posting) in postings.into_iter().enumerate() {
        match posting.validate() {
            Ok(()) => valid.push(posting),
            Err(reason) => {
                let id = posting.external_id.trim();
                rejected.push(RejectedRecord {
                    index,
                    external_id: (!id.is_empty()).then(|| id.to_string()),
                    reason,
                });
            }
        }
    }

    (valid, rejected)
}

/// What a sync run did, reported back to whoever triggered it.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Records in the feed response, valid or not.
    pub fetched: usize,
    pub stats: SyncStats,
    /// Records quarantined by validation.
    pub rejected: Vec<RejectedRecord>,
    /// Occurrences dropped because a later record had the same identifier.
    pub duplicates: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    /// True when every fetched record was valid and stored.
    pub fn is_clean(&self) -> bool {
        self.stats.failed == 0 && self.rejected.is_empty()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Runs job synchronization against injected collaborators.
///
/// The store and feed are trait objects, so the same service drives
/// PostgreSQL in production and the doubles in `testing` under test.
#[derive(Clone)]
pub struct SyncService {
    store: Arc<dyn JobStore>,
    feed: Arc<dyn JobFeed>,
    config: SyncConfig,
}

impl SyncService {
    pub fn new(store: Arc<dyn JobStore>, feed: Arc<dyn JobFeed>, config: SyncConfig) -> Self {
        Self {
            store,
            feed,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Fetches one batch from the feed and reconciles it into the store.
    ///
    /// # Errors
    ///
    /// Returns the feed error if the batch could not be fetched or parsed,
    /// or the store error if existing hashes could not be loaded. In both
    /// cases nothing has been written. Failures of individual writes are
    /// reported in [`SyncStats::failed`] instead.
    pub async fn sync_jobs(&self) -> Result<SyncReport, AppError> {
        let started_at = Utc::now();

        info!("Fetching job feed...");
        let batch = self.feed.fetch_batch().await?;
        let fetched = batch.fetched();
        let (postings, rejected) = quarantine_invalid(batch);

        for rejected in &rejected {
            warn!(
                "Quarantined record #{} ({}): {}",
                rejected.index,
                rejected.external_id.as_deref().unwrap_or("no id"),
                rejected.reason
            );
        }

        let (postings, duplicates) = collapse_duplicates(postings);
        if duplicates > 0 {
            info!(
                "{} duplicate identifiers in batch, keeping the last occurrence of each",
                duplicates
            );
        }

        let existing = self.store.content_hashes().await?;
        let total = postings.len();
        info!(
            "Fetched {} records ({} valid, {} unique). Reconciling...",
            fetched,
            fetched - rejected.len(),
            total
        );

        let existing = &existing;
        let stats = stream::iter(postings.into_iter().enumerate())
            .map(|(i, posting)| async move {
                let existing_hash = existing.get(&posting.external_id);
                self.apply(i + 1, total, posting, existing_hash).await
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .fold(SyncStats::new(), |mut stats, outcome| async move {
                stats.record(outcome);
                stats
            })
            .await;

        let report = SyncReport {
            fetched,
            stats,
            rejected,
            duplicates,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            "Sync complete: {} created, {} updated, {} unchanged, {} failed, {} rejected",
            report.stats.created,
            report.stats.updated,
            report.stats.unchanged,
            report.stats.failed,
            report.rejected.len()
        );

        Ok(report)
    }

    async fn apply(
        &self,
        position: usize,
        total: usize,
        posting: JobPosting,
        existing_hash: Option<&Option<String>>,
    ) -> SyncOutcome {
        let new_hash = posting.content_hash();
        let decision = needs_reprocessing(existing_hash, &new_hash);

        let result = if decision.needs_write {
            self.store
                .upsert(&posting, &new_hash)
                .await
                .map(|_| decision.outcome)
        } else {
            match self.store.touch(&posting.external_id).await {
                Ok(true) => Ok(SyncOutcome::Unchanged),
                // Removed from the store since the hashes were read.
                Ok(false) => self
                    .store
                    .upsert(&posting, &new_hash)
                    .await
                    .map(|_| SyncOutcome::Created),
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(outcome) => {
                debug!(
                    "[{}/{}] {:?}: {} ({}; {})",
                    position, total, outcome, posting.title, posting.external_id, decision.reason
                );
                outcome
            }
            Err(e) => {
                error!(
                    "[{}/{}] Failed to save {}: {}",
                    position, total, posting.external_id, e
                );
                SyncOutcome::Failed
            }
        }
    }
}
