//! jobsync DB - PostgreSQL persistence for job postings.
//!
//! [`JobRepository`] implements [`jobsync_core::JobStore`] on top of a
//! `sqlx` connection pool. Schema changes live in `migrations/` and are
//! applied with [`run_migrations`].

pub mod repository;

pub use repository::{run_migrations, JobRepository};
