use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Default page size for listing stored jobs.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Upper bound on a single listing page.
pub const MAX_LIST_LIMIT: usize = 1000;

/// Employment type advertised by a posting.
///
/// Feeds spell these inconsistently, so parsing ignores case and the
/// separators `-`, `_` and space. Anything unrecognised is kept verbatim.
///
/// # Examples
///
/// ```
/// use jobsync_core::EmploymentType;
///
/// assert_eq!(EmploymentType::parse("Full-time"), EmploymentType::FullTime);
/// assert_eq!(EmploymentType::parse("PART_TIME"), EmploymentType::PartTime);
/// assert_eq!(EmploymentType::parse("Seasonal").as_str(), "Seasonal");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
    Other(String),
}

impl EmploymentType {
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "fulltime" => EmploymentType::FullTime,
            "parttime" => EmploymentType::PartTime,
            "contract" | "contractor" => EmploymentType::Contract,
            "temporary" | "temp" => EmploymentType::Temporary,
            "internship" | "intern" => EmploymentType::Internship,
            _ => EmploymentType::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EmploymentType::FullTime => "full-time",
            EmploymentType::PartTime => "part-time",
            EmploymentType::Contract => "contract",
            EmploymentType::Temporary => "temporary",
            EmploymentType::Internship => "internship",
            EmploymentType::Other(raw) => raw,
        }
    }
}

impl From<String> for EmploymentType {
    fn from(raw: String) -> Self {
        EmploymentType::parse(&raw)
    }
}

impl From<EmploymentType> for String {
    fn from(kind: EmploymentType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One externally-sourced job advertisement, validated at the ingestion boundary.
///
/// `external_id` is the feed's stable key. The store holds at most one
/// record per `external_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary_from: Option<f64>,
    pub salary_to: Option<f64>,
    pub employment_type: Option<EmploymentType>,
    pub application_deadline: Option<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    pub contact: Option<String>,
    pub job_category: Option<String>,
    #[serde(default)]
    pub is_remote_work: bool,
    pub number_of_openings: Option<i32>,
    /// Source-side creation timestamp, stored verbatim.
    pub created_at: Option<String>,
    /// Source-side update timestamp, stored verbatim.
    pub updated_at: Option<String>,
}

impl JobPosting {
    /// Creates a posting with only the required fields set.
    pub fn new(external_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
            description: None,
            company: None,
            location: None,
            salary_from: None,
            salary_to: None,
            employment_type: None,
            application_deadline: None,
            qualifications: Vec::new(),
            contact: None,
            job_category: None,
            is_remote_work: false,
            number_of_openings: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Checks the invariants a posting must satisfy before it may be stored.
    ///
    /// Returns a human-readable reason on failure; the caller quarantines
    /// the record instead of writing it.
    pub fn validate(&self) -> Result<(), String> {
        if self.external_id.trim().is_empty() {
            return Err("missing job identifier".to_string());
        }
        if self.title.trim().is_empty() {
            return Err("missing title".to_string());
        }

        for (name, value) in [("salary_from", self.salary_from), ("salary_to", self.salary_to)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(format!("{} must be a non-negative number, got {}", name, v));
                }
            }
        }

        if let (Some(from), Some(to)) = (self.salary_from, self.salary_to) {
            if from > to {
                return Err(format!(
                    "salary range is inverted ({} > {})",
                    from, to
                ));
            }
        }

        if let Some(n) = self.number_of_openings {
            if n < 0 {
                return Err(format!("number_of_openings must be >= 0, got {}", n));
            }
        }

        Ok(())
    }

    /// Computes the SHA-256 content hash used for delta detection.
    ///
    /// The hash covers every field of the posting, so any change in the
    /// feed's data produces a different hash.
    ///
    /// # Examples
    ///
    /// ```
    /// use jobsync_core::JobPosting;
    ///
    /// let a = JobPosting::new("J1", "Engineer");
    /// let mut b = a.clone();
    /// assert_eq!(a.content_hash(), b.content_hash());
    ///
    /// b.title = "Senior Engineer".to_string();
    /// assert_ne!(a.content_hash(), b.content_hash());
    /// assert_eq!(a.content_hash().len(), 64);
    /// ```
    pub fn content_hash(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }
}

/// A posting as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredJob {
    pub id: Uuid,
    #[serde(flatten)]
    pub posting: JobPosting,
    pub content_hash: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

/// A feed record that failed validation and was not written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    /// Position of the record in the feed's `data` array.
    pub index: usize,
    pub external_id: Option<String>,
    pub reason: String,
}

/// One fetched batch, already split into valid postings and quarantined records.
#[derive(Debug, Clone, Default)]
pub struct FeedBatch {
    pub postings: Vec<JobPosting>,
    pub rejected: Vec<RejectedRecord>,
}

impl FeedBatch {
    pub fn new(postings: Vec<JobPosting>) -> Self {
        Self {
            postings,
            rejected: Vec::new(),
        }
    }

    /// Number of records the feed returned, valid or not.
    pub fn fetched(&self) -> usize {
        self.postings.len() + self.rejected.len()
    }
}

/// Filters for listing stored jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    pub category: Option<String>,
    pub remote: Option<bool>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            category: None,
            remote: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl JobQuery {
    /// Page size clamped to `1..=MAX_LIST_LIMIT`.
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIST_LIMIT)
    }

    /// Returns true if `job` passes the category and remote filters.
    pub fn matches(&self, job: &JobPosting) -> bool {
        let category_ok = match &self.category {
            Some(wanted) => job.job_category.as_deref() == Some(wanted.as_str()),
            None => true,
        };
        let remote_ok = match self.remote {
            Some(wanted) => job.is_remote_work == wanted,
            None => true,
        };
        category_ok && remote_ok
    }
}

/// Aggregated store statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_jobs: i64,
    pub remote_jobs: i64,
    pub companies: i64,
    pub last_update: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employment_type_parsing() {
        assert_eq!(EmploymentType::parse("Full-time"), EmploymentType::FullTime);
        assert_eq!(EmploymentType::parse("full time"), EmploymentType::FullTime);
        assert_eq!(EmploymentType::parse("FULL_TIME"), EmploymentType::FullTime);
        assert_eq!(EmploymentType::parse("Part-time"), EmploymentType::PartTime);
        assert_eq!(EmploymentType::parse("Contractor"), EmploymentType::Contract);
        assert_eq!(EmploymentType::parse("Temp"), EmploymentType::Temporary);
        assert_eq!(EmploymentType::parse("Intern"), EmploymentType::Internship);
        assert_eq!(
            EmploymentType::parse(" Freelance "),
            EmploymentType::Other("Freelance".to_string())
        );
    }

    #[test]
    fn test_employment_type_serde_uses_canonical_string() {
        let json = serde_json::to_string(&EmploymentType::FullTime).unwrap();
        assert_eq!(json, "\"full-time\"");

        let parsed: EmploymentType = serde_json::from_str("\"Contract\"").unwrap();
        assert_eq!(parsed, EmploymentType::Contract);
    }

    #[test]
    fn test_validate_accepts_minimal_posting() {
        assert!(JobPosting::new("J1", "Engineer").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_identifier() {
        let err = JobPosting::new("  ", "Engineer").validate().unwrap_err();
        assert_eq!(err, "missing job identifier");
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let err = JobPosting::new("J1", "").validate().unwrap_err();
        assert_eq!(err, "missing title");
    }

    #[test]
    fn test_validate_rejects_inverted_salary_range() {
        let mut job = JobPosting::new("J1", "Engineer");
        job.salary_from = Some(90_000.0);
        job.salary_to = Some(80_000.0);
        let err = job.validate().unwrap_err();
        assert!(err.contains("inverted"));
    }

    #[test]
    fn test_validate_rejects_negative_values() {
        let mut job = JobPosting::new("J1", "Engineer");
        job.salary_from = Some(-1.0);
        assert!(job.validate().is_err());

        let mut job = JobPosting::new("J1", "Engineer");
        job.number_of_openings = Some(-3);
        assert!(job.validate().is_err());
    }

    #[test]
    fn test_content_hash_tracks_every_field() {
        let base = JobPosting::new("J1", "Engineer");
        let mut remote = base.clone();
        remote.is_remote_work = true;
        let mut qualified = base.clone();
        qualified.qualifications = vec!["Rust".to_string()];

        assert_ne!(base.content_hash(), remote.content_hash());
        assert_ne!(base.content_hash(), qualified.content_hash());
        assert_ne!(remote.content_hash(), qualified.content_hash());
    }

    #[test]
    fn test_feed_batch_fetched_counts_rejected() {
        let batch = FeedBatch {
            postings: vec![JobPosting::new("J1", "Engineer")],
            rejected: vec![RejectedRecord {
                index: 1,
                external_id: None,
                reason: "missing job identifier".to_string(),
            }],
        };
        assert_eq!(batch.fetched(), 2);
    }

    #[test]
    fn test_job_query_limit_is_clamped() {
        let mut query = JobQuery::default();
        assert_eq!(query.effective_limit(), DEFAULT_LIST_LIMIT);

        query.limit = 0;
        assert_eq!(query.effective_limit(), 1);

        query.limit = 50_000;
        assert_eq!(query.effective_limit(), MAX_LIST_LIMIT);
    }

    #[test]
    fn test_job_query_matches_filters() {
        let mut job = JobPosting::new("J1", "Engineer");
        job.job_category = Some("IT".to_string());
        job.is_remote_work = true;

        let query = JobQuery {
            category: Some("IT".to_string()),
            remote: Some(true),
            ..JobQuery::default()
        };
        assert!(query.matches(&job));

        let query = JobQuery {
            remote: Some(false),
            ..JobQuery::default()
        };
        assert!(!query.matches(&job));
    }

    #[test]
    fn test_stored_job_serializes_flat() {
        let stored = StoredJob {
            id: Uuid::nil(),
            posting: JobPosting::new("J1", "Engineer"),
            content_hash: None,
            first_seen_at: Utc::now(),
            last_updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["external_id"], "J1");
        assert_eq!(value["title"], "Engineer");
        assert!(value.get("posting").is_none());
    }
}
