//! jobsync CLI - Command-line interface for the job ingestion service
//!
//! This crate provides the `jobsync` binary that ties the feed client, the
//! PostgreSQL store and the HTTP API together.

pub mod config;

pub use config::{Command, Config, ExportFormat};
