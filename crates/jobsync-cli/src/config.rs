use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "jobsync")]
#[command(author, version, about = "Syncs an external job feed into PostgreSQL")]
#[command(after_help = "Examples:
  jobsync sync
  jobsync serve --port 8080 --interval-secs 3600
  jobsync export --format jsonl > jobs.jsonl
  jobsync stats")]
pub struct Config {
    /// PostgreSQL database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Job feed URL (overrides the config file)
    #[arg(long, env = "JOBSYNC_FEED_URL")]
    pub feed_url: Option<String>,

    /// Path to config.toml (default: ~/.config/jobsync/config.toml)
    #[arg(short, long, env = "JOBSYNC_CONFIG", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the feed once and store every record
    Sync,
    /// Serve the HTTP API, optionally syncing on a timer
    #[command(after_help = "Examples:
  jobsync serve                          # Listen on $PORT or 3000
  jobsync serve --interval-secs 900      # Also sync every 15 minutes")]
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "3000")]
        port: u16,
        /// Seconds between scheduled syncs (overrides the config file, 0 disables)
        #[arg(short, long, value_name = "SECS")]
        interval_secs: Option<u64>,
    },
    /// Export stored jobs to various formats
    #[command(after_help = "Examples:
  jobsync export --format jsonl > jobs.jsonl
  jobsync export --format csv --category Engineering")]
    Export {
        /// Output format for exported data
        #[arg(short, long, default_value = "jsonl")]
        format: ExportFormat,
        /// Filter by job category
        #[arg(long)]
        category: Option<String>,
        /// Maximum number of jobs to export
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show database statistics
    Stats,
    /// Apply pending database migrations
    Migrate,
}

/// Supported export formats
#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// JSON Lines format (one JSON object per line)
    Jsonl,
    /// Standard JSON array format
    Json,
    /// CSV format (comma-separated values)
    Csv,
}
