use async_trait::async_trait;
use jobsync_core::config::{FeedConfig, HttpConfig};
use jobsync_core::error::AppError;
use jobsync_core::models::{EmploymentType, FeedBatch, JobPosting, RejectedRecord};
use jobsync_core::store::JobFeed;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

/// Envelope of the job feed response.
///
/// The feed always answers with:
/// ```json
/// {
///     "data": [ { "id": "...", "title": "...", ... } ]
/// }
/// ```
/// Records are kept as raw JSON here so one bad record cannot fail the batch.
#[derive(Deserialize, Debug)]
struct FeedEnvelope {
    data: Vec<Value>,
}

/// Data Transfer Object for one record of the job feed.
///
/// Fields whose JSON type varies between feeds (identifier, numbers,
/// flags, qualification lists) are kept as raw values and normalized in
/// [`RawJobPosting::into_posting`].
///
/// # Examples
///
/// ```
/// use jobsync_client::feed::RawJobPosting;
///
/// let json = r#"{
///     "id": "9b2f",
///     "title": "Backend Engineer",
///     "salary_from": "65000",
///     "qualifications": "[\"Rust\", \"SQL\"]",
///     "is_remote_work": 1
/// }"#;
///
/// let raw: RawJobPosting = serde_json::from_str(json).unwrap();
/// let job = raw.into_posting().unwrap();
/// assert_eq!(job.external_id, "9b2f");
/// assert_eq!(job.salary_from, Some(65000.0));
/// assert_eq!(job.qualifications, vec!["Rust", "SQL"]);
/// assert!(job.is_remote_work);
/// ```
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RawJobPosting {
    pub id: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary_from: Option<Value>,
    pub salary_to: Option<Value>,
    pub employment_type: Option<String>,
    pub application_deadline: Option<String>,
    pub qualifications: Option<Value>,
    pub contact: Option<String>,
    pub job_category: Option<String>,
    pub is_remote_work: Option<Value>,
    #[serde(alias = "number_of_openings")]
    pub number_of_opening: Option<Value>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl RawJobPosting {
    /// Normalizes the record into a validated [`JobPosting`].
    ///
    /// Returns the rejection reason if a field cannot be interpreted or the
    /// posting fails [`JobPosting::validate`].
    pub fn into_posting(self) -> Result<JobPosting, String> {
        let external_id =
            identifier(self.id.as_ref()).ok_or_else(|| "missing job identifier".to_string())?;

        let posting = JobPosting {
            external_id,
            title: self.title.map(|t| t.trim().to_string()).unwrap_or_default(),
            description: non_blank(self.description),
            company: non_blank(self.company),
            location: non_blank(self.location),
            salary_from: number("salary_from", self.salary_from.as_ref())?,
            salary_to: number("salary_to", self.salary_to.as_ref())?,
            employment_type: non_blank(self.employment_type).map(|t| EmploymentType::parse(&t)),
            application_deadline: non_blank(self.application_deadline),
            qualifications: qualifications(self.qualifications.as_ref())?,
            contact: non_blank(self.contact),
            job_category: non_blank(self.job_category),
            is_remote_work: flag(self.is_remote_work.as_ref())?,
            number_of_openings: openings(self.number_of_opening.as_ref())?,
            created_at: non_blank(self.created_at),
            updated_at: non_blank(self.updated_at),
        };

        posting.validate()?;
        Ok(posting)
    }
}

/// Parses a feed response body into valid postings and quarantined records.
///
/// # Errors
///
/// Returns `AppError::EmptyResponse` for an empty body and
/// `AppError::MalformedFeed` if the body is not JSON or has no `data` array.
/// Individual bad records never produce an error.
pub fn parse_feed_body(body: &[u8]) -> Result<FeedBatch, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::EmptyResponse);
    }

    let envelope: FeedEnvelope =
        serde_json::from_slice(body).map_err(|e| AppError::MalformedFeed(e.to_string()))?;

    let mut batch = FeedBatch::default();
    for (index, record) in envelope.data.into_iter().enumerate() {
        let external_id = identifier(record.get("id"));
        let parsed = serde_json::from_value::<RawJobPosting>(record)
            .map_err(|e| e.to_string())
            .and_then(RawJobPosting::into_posting);

        match parsed {
            Ok(posting) => batch.postings.push(posting),
            Err(reason) => batch.rejected.push(RejectedRecord {
                index,
                external_id,
                reason,
            }),
        }
    }

    Ok(batch)
}

fn identifier(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn number(field: &str, value: Option<&Value>) -> Result<Option<f64>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("{} is out of range", field)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("{} is not a number: {:?}", field, s)),
        Some(other) => Err(format!("{} has unexpected type: {}", field, other)),
    }
}

fn openings(value: Option<&Value>) -> Result<Option<i32>, String> {
    match number("number_of_opening", value)? {
        None => Ok(None),
        Some(n) if n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64 => {
            Ok(Some(n as i32))
        }
        Some(n) => Err(format!("number_of_opening is not an integer: {}", n)),
    }
}

fn flag(value: Option<&Value>) -> Result<bool, String> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(format!("is_remote_work must be 0 or 1, got {}", n)),
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(format!("is_remote_work is not a flag: {:?}", other)),
        },
        Some(other) => Err(format!("is_remote_work has unexpected type: {}", other)),
    }
}

/// Accepts an array of strings, a JSON-encoded array inside a string, or a
/// single plain string.
fn qualifications(value: Option<&Value>) -> Result<Vec<String>, String> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(Vec::new());
            }
            if trimmed.starts_with('[') {
                serde_json::from_str::<Vec<Value>>(trimmed)
                    .map_err(|e| format!("qualifications is not a valid list: {}", e))?
            } else {
                vec![Value::String(trimmed.to_string())]
            }
        }
        Some(other) => return Err(format!("qualifications has unexpected type: {}", other)),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(Ok(s.trim().to_string())),
            Value::Null => None,
            other => Some(Err(format!(
                "qualifications entry is not a string: {}",
                other
            ))),
        })
        .collect()
}

/// HTTP client for the external job feed.
///
/// # Examples
///
/// ```no_run
/// use jobsync_client::JobFeedClient;
/// use jobsync_core::FeedConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = JobFeedClient::new(&FeedConfig::default())?;
/// let batch = client.fetch_batch().await?;
/// println!("Fetched {} postings", batch.postings.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct JobFeedClient {
    client: Client,
    url: Url,
    http: HttpConfig,
}

impl JobFeedClient {
    /// Creates a client for the configured feed URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidFeedUrl` if the URL is malformed or not HTTP(S).
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(config: &FeedConfig) -> Result<Self, AppError> {
        let url =
            Url::parse(&config.url).map_err(|_| AppError::InvalidFeedUrl(config.url.clone()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::InvalidFeedUrl(config.url.clone()));
        }

        let client = Client::builder()
            .user_agent(concat!("jobsync/", env!("CARGO_PKG_VERSION")))
            .timeout(config.http.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            url,
            http: config.http.clone(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetches and parses one batch from the feed.
    pub async fn fetch_batch(&self) -> Result<FeedBatch, AppError> {
        let resp = self.request_with_retry().await?;
        let body = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        let batch = parse_feed_body(&body)?;

        debug!(
            "Feed returned {} records ({} rejected)",
            batch.fetched(),
            batch.rejected.len()
        );
        Ok(batch)
    }

    /// Makes an HTTP GET request with automatic retry on transient failures.
    ///
    /// Retries on:
    /// - Network errors
    /// - Timeouts
    /// - Server errors (5xx)
    /// - Rate limiting (429), with exponential backoff
    async fn request_with_retry(&self) -> Result<reqwest::Response, AppError> {
        let attempts = self.http.max_retries.max(1);
        let base_delay = self.http.retry_base_delay;
        let mut last_error = AppError::Generic("No attempts made".to_string());

        for attempt in 1..=attempts {
            match self.client.get(self.url.clone()).send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        return Ok(resp);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = AppError::RateLimitExceeded;
                        if attempt < attempts {
                            sleep(backoff(base_delay, attempt, true)).await;
                            continue;
                        }
                        break;
                    }

                    if status.is_server_error() {
                        last_error = AppError::ClientError(format!(
                            "Server error: HTTP {}",
                            status.as_u16()
                        ));
                        if attempt < attempts {
                            warn!(
                                "Feed answered HTTP {} (attempt {}/{}), retrying",
                                status.as_u16(),
                                attempt,
                                attempts
                            );
                            sleep(backoff(base_delay, attempt, false)).await;
                            continue;
                        }
                        break;
                    }

                    // Client error (4xx except 429) - don't retry
                    return Err(AppError::ClientError(format!(
                        "HTTP {} from {}",
                        status.as_u16(),
                        self.url
                    )));
                }
                Err(e) => {
                    last_error = self.transport_error(e);

                    if attempt < attempts && last_error.is_retryable() {
                        warn!(
                            "Feed request failed (attempt {}/{}): {}, retrying",
                            attempt, attempts, last_error
                        );
                        sleep(backoff(base_delay, attempt, false)).await;
                        continue;
                    }
                    break;
                }
            }
        }

        Err(last_error)
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(whole_seconds(self.http.timeout))
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {}", e))
        } else {
            AppError::ClientError(e.to_string())
        }
    }
}

/// Delay before retrying after `attempt`: `base * 2^attempt` when
/// `exponential`, `base * attempt` otherwise. Saturates instead of overflowing.
fn backoff(base: Duration, attempt: u32, exponential: bool) -> Duration {
    let factor = if exponential {
        2_u32.saturating_pow(attempt)
    } else {
        attempt
    };
    base.saturating_mul(factor)
}

/// Rounds up so sub-second timeouts never report as 0 seconds.
fn whole_seconds(timeout: Duration) -> u64 {
    timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0)
}

#[async_trait]
impl JobFeed for JobFeedClient {
    async fn fetch_batch(&self) -> Result<FeedBatch, AppError> {
        JobFeedClient::fetch_batch(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> FeedConfig {
        FeedConfig {
            url: url.to_string(),
            ..FeedConfig::default()
        }
    }

    #[test]
    fn test_new_with_valid_url() {
        let client = JobFeedClient::new(&config("https://jsonfakery.com/jobs/infinite-scroll"))
            .unwrap();
        assert_eq!(
            client.url().as_str(),
            "https://jsonfakery.com/jobs/infinite-scroll"
        );
    }

    #[test]
    fn test_backoff_saturates_on_large_attempts() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff(base, 1, true), Duration::from_secs(1));
        assert_eq!(backoff(base, 3, false), Duration::from_millis(1500));
        assert_eq!(backoff(Duration::ZERO, 40, true), Duration::ZERO);
        assert_eq!(backoff(base, 40, true), base.saturating_mul(u32::MAX));
    }

    #[test]
    fn test_whole_seconds_rounds_up() {
        assert_eq!(whole_seconds(Duration::from_secs(30)), 30);
        assert_eq!(whole_seconds(Duration::from_millis(100)), 1);
        assert_eq!(whole_seconds(Duration::from_millis(1500)), 2);
    }

    #[test]
    fn test_new_with_invalid_url() {
        let result = JobFeedClient::new(&config("not-a-valid-url"));
        assert!(matches!(result, Err(AppError::InvalidFeedUrl(_))));
    }

    #[test]
    fn test_new_rejects_non_http_scheme() {
        let result = JobFeedClient::new(&config("ftp://example.com/jobs"));
        assert!(matches!(result, Err(AppError::InvalidFeedUrl(_))));
    }

    #[test]
    fn test_parse_feed_body_concrete_record() {
        let body = br#"{"data": [{"id": "J1", "title": "Engineer", "salary_from": 80000}]}"#;
        let batch = parse_feed_body(body).unwrap();

        assert_eq!(batch.postings.len(), 1);
        let job = &batch.postings[0];
        assert_eq!(job.external_id, "J1");
        assert_eq!(job.title, "Engineer");
        assert_eq!(job.salary_from, Some(80000.0));
        assert!(batch.rejected.is_empty());
    }

    #[test]
    fn test_parse_feed_body_full_record() {
        let body = br#"{
            "current_page": 1,
            "data": [{
                "id": "9d2c1f0e",
                "title": "Data Analyst",
                "description": "Analyse things",
                "company": "Acme",
                "location": "Remote",
                "salary_from": 5000,
                "salary_to": 7000.5,
                "employment_type": "Full-time",
                "application_deadline": "2026-11-30",
                "qualifications": "[\"SQL\",\"Python\"]",
                "contact": "hr@acme.test",
                "job_category": "Data",
                "is_remote_work": 1,
                "number_of_opening": 3,
                "created_at": "2026-01-01 10:00:00",
                "updated_at": "2026-01-02 10:00:00"
            }]
        }"#;

        let batch = parse_feed_body(body).unwrap();
        let job = &batch.postings[0];
        assert_eq!(job.company.as_deref(), Some("Acme"));
        assert_eq!(job.salary_to, Some(7000.5));
        assert_eq!(job.employment_type, Some(EmploymentType::FullTime));
        assert_eq!(job.qualifications, vec!["SQL", "Python"]);
        assert!(job.is_remote_work);
        assert_eq!(job.number_of_openings, Some(3));
        assert_eq!(job.updated_at.as_deref(), Some("2026-01-02 10:00:00"));
    }

    #[test]
    fn test_numeric_identifier_is_accepted() {
        let batch = parse_feed_body(br#"{"data": [{"id": 42, "title": "Engineer"}]}"#).unwrap();
        assert_eq!(batch.postings[0].external_id, "42");
    }

    #[test]
    fn test_bad_records_are_quarantined() {
        let body = br#"{"data": [
            {"id": "J1", "title": "Engineer"},
            {"title": "No id"},
            {"id": "J3", "title": "Inverted", "salary_from": 9, "salary_to": 1},
            {"id": "J4", "title": 17},
            {"id": "J5", "title": "Remote?", "is_remote_work": "maybe"},
            "not an object"
        ]}"#;

        let batch = parse_feed_body(body).unwrap();

        assert_eq!(batch.postings.len(), 1);
        assert_eq!(batch.rejected.len(), 5);
        assert_eq!(batch.fetched(), 6);

        let indexes: Vec<usize> = batch.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![1, 2, 3, 4, 5]);
        assert_eq!(batch.rejected[0].external_id, None);
        assert_eq!(batch.rejected[0].reason, "missing job identifier");
        assert_eq!(batch.rejected[1].external_id.as_deref(), Some("J3"));
        assert!(batch.rejected[1].reason.contains("inverted"));
        assert_eq!(batch.rejected[2].external_id.as_deref(), Some("J4"));
    }

    #[test]
    fn test_missing_data_field_is_malformed() {
        let err = parse_feed_body(br#"{"jobs": []}"#).unwrap_err();
        assert!(matches!(err, AppError::MalformedFeed(_)));
    }

    #[test]
    fn test_non_json_body_is_malformed() {
        let err = parse_feed_body(b"<html>Bad gateway</html>").unwrap_err();
        assert!(matches!(err, AppError::MalformedFeed(_)));
    }

    #[test]
    fn test_empty_body() {
        let err = parse_feed_body(b"  \n").unwrap_err();
        assert!(matches!(err, AppError::EmptyResponse));
    }

    #[test]
    fn test_qualification_shapes() {
        assert_eq!(
            qualifications(Some(&serde_json::json!(["A", " B ", ""]))).unwrap(),
            vec!["A", "B"]
        );
        assert_eq!(
            qualifications(Some(&serde_json::json!("Single requirement"))).unwrap(),
            vec!["Single requirement"]
        );
        assert!(qualifications(Some(&serde_json::json!("[broken"))).is_err());
        assert!(qualifications(Some(&serde_json::json!(5))).is_err());
    }

    #[test]
    fn test_flag_shapes() {
        assert!(flag(Some(&serde_json::json!(true))).unwrap());
        assert!(flag(Some(&serde_json::json!(1))).unwrap());
        assert!(!flag(Some(&serde_json::json!("false"))).unwrap());
        assert!(!flag(None).unwrap());
        assert!(flag(Some(&serde_json::json!(2))).is_err());
    }

    #[test]
    fn test_openings_must_be_integral() {
        assert_eq!(openings(Some(&serde_json::json!(4))).unwrap(), Some(4));
        assert_eq!(openings(Some(&serde_json::json!("2"))).unwrap(), Some(2));
        assert!(openings(Some(&serde_json::json!(1.5))).is_err());
    }
}
