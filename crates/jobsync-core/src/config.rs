//! Configuration types for jobsync components.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! whatever the CLI applies on top (flags and environment variables).
//!
//! ```toml
//! [feed]
//! url = "https://jsonfakery.com/jobs/infinite-scroll"
//! timeout_secs = 30
//! max_retries = 3
//!
//! [sync]
//! concurrency = 4
//! interval_secs = 3600
//!
//! [database]
//! max_connections = 5
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;

/// Feed polled when nothing else is configured.
pub const DEFAULT_FEED_URL: &str = "https://jsonfakery.com/jobs/infinite-scroll";

/// Database connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { max_connections: 5 }
    }
}

/// HTTP client configuration for the outbound feed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Where to fetch jobs from and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub url: String,
    pub http: HttpConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            http: HttpConfig::default(),
        }
    }
}

/// Job synchronization configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Upper bound on concurrent store writes within one run.
    pub concurrency: usize,
    /// Period of the scheduled sync when serving. `None` disables it.
    pub interval: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            interval: None,
        }
    }
}

/// Contents of a `config.toml` file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub feed: FeedSection,
    pub sync: SyncSection,
    pub database: DatabaseSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedSection {
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    pub concurrency: Option<usize>,
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    pub max_connections: Option<u32>,
}

impl FileConfig {
    pub fn feed_config(&self) -> FeedConfig {
        let defaults = HttpConfig::default();
        FeedConfig {
            url: self
                .feed
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            http: HttpConfig {
                timeout: self
                    .feed
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.timeout),
                max_retries: self.feed.max_retries.unwrap_or(defaults.max_retries),
                retry_base_delay: self
                    .feed
                    .retry_base_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry_base_delay),
            },
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        let defaults = SyncConfig::default();
        SyncConfig {
            concurrency: self
                .sync
                .concurrency
                .unwrap_or(defaults.concurrency)
                .max(1),
            interval: self
                .sync
                .interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            max_connections: self
                .database
                .max_connections
                .unwrap_or_else(|| DbConfig::default().max_connections),
        }
    }
}

/// Returns the default config location, e.g. `~/.config/jobsync/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("jobsync").join("config.toml"))
}

/// Parses TOML configuration text.
pub fn parse_config(contents: &str) -> Result<FileConfig, AppError> {
    toml::from_str(contents).map_err(|e| AppError::ConfigError(e.to_string()))
}

/// Loads the configuration file.
///
/// An explicit `path` must exist. Without one, the default location is
/// tried and a missing file yields the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<FileConfig, AppError> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match default_config_path() {
            Some(p) => (p, false),
            None => return Ok(FileConfig::default()),
        },
    };

    if !path.exists() {
        if required {
            return Err(AppError::ConfigError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(FileConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(|e| {
        AppError::ConfigError(format!("cannot read {}: {}", path.display(), e))
    })?;
    tracing::debug!("Loaded configuration from {}", path.display());
    parse_config(&contents)
}
