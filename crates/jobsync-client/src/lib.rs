//! jobsync Client - HTTP client for the external job feed
//!
//! - [`feed`] - fetching, parsing and validating job feed batches
//!
//! The client handles request building, timeouts, retries with backoff,
//! response parsing and per-record validation. Records that fail
//! validation are returned as quarantined entries rather than errors.

pub mod feed;

pub use feed::{parse_feed_body, JobFeedClient, RawJobPosting};
