//! In-memory implementations of [`JobStore`] and [`JobFeed`] for tests.
//!
//! Both are usable from other crates' tests, so server and CLI tests can
//! drive a full sync without PostgreSQL or the network.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{FeedBatch, JobPosting, JobQuery, StoreStats, StoredJob};
use crate::store::{JobFeed, JobStore};

/// `JobStore` backed by a `HashMap`, with switches for injecting failures.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<String, StoredJob>>,
    failing_ids: Mutex<HashSet<String>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record directly, bypassing failure switches and write counting.
    pub fn seed(&self, posting: JobPosting) {
        let now = Utc::now();
        let hash = posting.content_hash();
        self.jobs().insert(
            posting.external_id.clone(),
            StoredJob {
                id: Uuid::new_v4(),
                posting,
                content_hash: Some(hash),
                first_seen_at: now,
                last_updated_at: now,
            },
        );
    }

    /// Makes every write for `external_id` fail.
    pub fn fail_writes_for(&self, external_id: &str) {
        self.failing().insert(external_id.to_string());
    }

    /// Makes every call fail, as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Deletes a record directly. Returns false if it was not stored.
    pub fn remove(&self, external_id: &str) -> bool {
        self.jobs().remove(external_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs().is_empty()
    }

    /// Number of successful `upsert` and `touch` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Stored postings sorted by identifier, for before/after comparisons.
    pub fn snapshot(&self) -> Vec<JobPosting> {
        let mut postings: Vec<JobPosting> =
            self.jobs().values().map(|job| job.posting.clone()).collect();
        postings.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        postings
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<String, StoredJob>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn failing(&self) -> MutexGuard<'_, HashSet<String>> {
        self.failing_ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn upsert(&self, posting: &JobPosting, content_hash: &str) -> Result<Uuid, AppError> {
        self.check_available()?;
        if self.failing().contains(&posting.external_id) {
            return Err(AppError::DatabaseError(sqlx::Error::Protocol(format!(
                "constraint violation for {}",
                posting.external_id
            ))));
        }

        let now = Utc::now();
        let mut jobs = self.jobs();
        let id = match jobs.get_mut(&posting.external_id) {
            Some(existing) => {
                existing.posting = posting.clone();
                existing.content_hash = Some(content_hash.to_string());
                existing.last_updated_at = now;
                existing.id
            }
            None => {
                let id = Uuid::new_v4();
                jobs.insert(
                    posting.external_id.clone(),
                    StoredJob {
                        id,
                        posting: posting.clone(),
                        content_hash: Some(content_hash.to_string()),
                        first_seen_at: now,
                        last_updated_at: now,
                    },
                );
                id
            }
        };
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn content_hashes(&self) -> Result<HashMap<String, Option<String>>, AppError> {
        self.check_available()?;
        Ok(self
            .jobs()
            .iter()
            .map(|(id, job)| (id.clone(), job.content_hash.clone()))
            .collect())
    }

    async fn touch(&self, external_id: &str) -> Result<bool, AppError> {
        self.check_available()?;
        if self.failing().contains(external_id) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        let touched = match self.jobs().get_mut(external_id) {
            Some(job) => {
                job.last_updated_at = Utc::now();
                true
            }
            None => false,
        };
        if touched {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(touched)
    }

    async fn get(&self, external_id: &str) -> Result<Option<StoredJob>, AppError> {
        self.check_available()?;
        Ok(self.jobs().get(external_id).cloned())
    }

    async fn list(&self, query: &JobQuery) -> Result<Vec<StoredJob>, AppError> {
        self.check_available()?;
        let mut jobs: Vec<StoredJob> = self
            .jobs()
            .values()
            .filter(|job| query.matches(&job.posting))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| {
            b.last_updated_at
                .cmp(&a.last_updated_at)
                .then_with(|| a.posting.external_id.cmp(&b.posting.external_id))
        });
        Ok(jobs
            .into_iter()
            .skip(query.offset)
            .take(query.effective_limit())
            .collect())
    }

    async fn stats(&self) -> Result<StoreStats, AppError> {
        self.check_available()?;
        let jobs = self.jobs();
        let companies: HashSet<&str> = jobs
            .values()
            .filter_map(|job| job.posting.company.as_deref())
            .collect();
        Ok(StoreStats {
            total_jobs: jobs.len() as i64,
            remote_jobs: jobs.values().filter(|j| j.posting.is_remote_work).count() as i64,
            companies: companies.len() as i64,
            last_update: jobs.values().map(|j| j.last_updated_at).max(),
        })
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_available()
    }
}

type ErrorFactory = Box<dyn Fn() -> AppError + Send + Sync>;

/// `JobFeed` that always returns the same batch, or always fails.
pub struct StaticFeed {
    response: Result<FeedBatch, ErrorFactory>,
    calls: AtomicUsize,
}

impl StaticFeed {
    pub fn new(batch: FeedBatch) -> Self {
        Self {
            response: Ok(batch),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_postings(postings: Vec<JobPosting>) -> Self {
        Self::new(FeedBatch::new(postings))
    }

    /// A feed whose every fetch fails with the error built by `make_error`.
    pub fn failing<F>(make_error: F) -> Self
    where
        F: Fn() -> AppError + Send + Sync + 'static,
    {
        Self {
            response: Err(Box::new(make_error)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobFeed for StaticFeed {
    async fn fetch_batch(&self) -> Result<FeedBatch, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Ok(batch) => Ok(batch.clone()),
            Err(make_error) => Err(make_error()),
        }
    }
}

/// Deterministic posting builders.
pub mod fixtures {
    use crate::models::{EmploymentType, JobPosting};

    const CATEGORIES: [&str; 4] = ["Engineering", "Design", "Sales", "Support"];

    /// A valid posting with only identifier and title set.
    pub fn posting(external_id: &str, title: &str) -> JobPosting {
        JobPosting::new(external_id, title)
    }

    /// A fully populated posting whose fields derive from `n`.
    pub fn detailed(n: usize) -> JobPosting {
        let mut job = JobPosting::new(format!("job-{:04}", n), format!("Position {}", n));
        job.description = Some(format!("Description for position {}", n));
        job.company = Some(format!("Company {}", n % 7));
        job.location = Some(if n % 2 == 0 { "Lahore" } else { "Karachi" }.to_string());
        job.salary_from = Some(50_000.0 + (n as f64) * 1_000.0);
        job.salary_to = Some(80_000.0 + (n as f64) * 1_000.0);
        job.employment_type = Some(if n % 3 == 0 {
            EmploymentType::Contract
        } else {
            EmploymentType::FullTime
        });
        job.application_deadline = Some("2026-12-31".to_string());
        job.qualifications = vec!["Bachelor's degree".to_string(), format!("{}+ years", n % 5)];
        job.contact = Some(format!("hr{}@example.com", n % 7));
        job.job_category = Some(CATEGORIES[n % CATEGORIES.len()].to_string());
        job.is_remote_work = n % 4 == 0;
        job.number_of_openings = Some((n % 3) as i32 + 1);
        job.created_at = Some("2026-01-01 09:00:00".to_string());
        job.updated_at = Some("2026-01-02 09:00:00".to_string());
        job
    }

    /// `count` detailed postings with distinct identifiers.
    pub fn batch(count: usize) -> Vec<JobPosting> {
        (0..count).map(detailed).collect()
    }
}
