use thiserror::Error;

/// Application-wide error types.
///
/// This enum represents all possible errors that can occur while fetching,
/// validating and storing job postings. It uses the `thiserror` crate for
/// ergonomic error handling and automatic conversion from underlying library
/// errors.
///
/// # Error Conversion
///
/// `sqlx::Error` converts into `AppError::DatabaseError` through `#[from]`.
///
/// # Examples
///
/// ```no_run
/// use jobsync_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::Generic("Something went wrong".to_string()))
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// This error wraps all errors from SQLx database operations, including
    /// connection failures, query errors, and constraint violations.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// HTTP client request failed.
    ///
    /// This error occurs when the feed request fails with a status the
    /// client does not retry, or when the client cannot be built.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// Invalid job feed URL provided.
    #[error("Invalid job feed URL: {0}")]
    InvalidFeedUrl(String),

    /// The feed answered but its body is not the expected `{ "data": [...] }` shape.
    #[error("Malformed feed response: {0}")]
    MalformedFeed(String),

    /// Job posting not found in the store.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// API response contained no data.
    #[error("Empty response from API")]
    EmptyResponse,

    /// Network or connection error.
    ///
    /// This error occurs when a network request fails due to connectivity issues,
    /// DNS resolution failures, or the remote server being unreachable.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimitExceeded,

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic application error for cases not covered by specific variants.
    ///
    /// Use this sparingly - prefer creating specific error variants
    /// for better error handling and debugging.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => {
                if e.to_string().contains("connection") {
                    "Cannot connect to database. Is PostgreSQL running?\n   Check DATABASE_URL."
                        .to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            AppError::ClientError(msg) => {
                if msg.contains("timeout") || msg.contains("timed out") {
                    "Request timed out. The job feed may be slow or unreachable.\n   Try again later or check the feed URL.".to_string()
                } else if msg.contains("connect") {
                    format!(
                        "Cannot connect to job feed: {}\n   Check your internet connection and the feed URL.",
                        msg
                    )
                } else {
                    format!("API error: {}", msg)
                }
            }
            AppError::InvalidFeedUrl(url) => {
                format!(
                    "Invalid job feed URL: {}\n   Example: https://jsonfakery.com/jobs/infinite-scroll",
                    url
                )
            }
            AppError::MalformedFeed(msg) => {
                format!(
                    "The job feed returned an unexpected body: {}\n   Nothing was written.",
                    msg
                )
            }
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!(
                    "Request timed out after {} seconds.\n   The feed may be overloaded. Try again later.",
                    secs
                )
            }
            AppError::RateLimitExceeded => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            AppError::EmptyResponse => {
                "The feed returned no data. It may be temporarily unavailable.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if a failed feed request is worth repeating.
    ///
    /// Client errors (bad status, unbuildable client) are final.
    ///
    /// # Examples
    ///
    /// ```
    /// use jobsync_core::error::AppError;
    ///
    /// let err = AppError::NetworkError("connection reset".to_string());
    /// assert!(err.is_retryable());
    ///
    /// let err = AppError::JobNotFound("J1".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::NetworkError(_)
                | AppError::Timeout(_)
                | AppError::RateLimitExceeded
        )
    }

    /// Returns true if the error originated in the persistent store rather than the feed.
    pub fn is_store_error(&self) -> bool {
        matches!(self, AppError::DatabaseError(_))
    }
}
