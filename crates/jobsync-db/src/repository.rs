//! Job repository for PostgreSQL.
//!
//! The `jobs` table carries a unique constraint on `external_id`; every
//! write goes through `INSERT ... ON CONFLICT (external_id) DO UPDATE`, so
//! a sync never creates a second row for an identifier it has seen before.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobsync_core::error::AppError;
use jobsync_core::models::{EmploymentType, JobPosting, JobQuery, StoreStats, StoredJob};
use jobsync_core::store::JobStore;
use sqlx::types::Json;
use sqlx::{PgPool, Pool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

/// Column list for SELECT queries. Must remain a const literal to ensure SQL safety
/// since format!() bypasses sqlx compile-time validation.
const JOB_COLUMNS: &str = "id, external_id, title, description, company, location, salary_from, salary_to, employment_type, application_deadline, qualifications, contact, job_category, is_remote_work, number_of_openings, source_created_at, source_updated_at, content_hash, first_seen_at, last_updated_at";

/// Applies the migrations under `crates/jobsync-db/migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.into()))
}

/// Repository for job postings in PostgreSQL.
///
/// # Examples
///
/// ```no_run
/// use sqlx::postgres::PgPoolOptions;
/// use jobsync_db::JobRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PgPoolOptions::new()
///     .max_connections(5)
///     .connect("postgresql://localhost/jobsync")
///     .await?;
///
/// let repo = JobRepository::new(pool);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct JobRepository {
    pool: Pool<Postgres>,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts or replaces a posting. Returns the UUID of the affected row.
    ///
    /// On conflict every data column is overwritten with the incoming
    /// value (last write wins); `first_seen_at` is preserved.
    pub async fn upsert(&self, job: &JobPosting, content_hash: &str) -> Result<Uuid, AppError> {
        let rec: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO jobs (
                external_id,
                title,
                description,
                company,
                location,
                salary_from,
                salary_to,
                employment_type,
                application_deadline,
                qualifications,
                contact,
                job_category,
                is_remote_work,
                number_of_openings,
                source_created_at,
                source_updated_at,
                content_hash,
                last_updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, NOW())
            ON CONFLICT (external_id)
            DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                company = EXCLUDED.company,
                location = EXCLUDED.location,
                salary_from = EXCLUDED.salary_from,
                salary_to = EXCLUDED.salary_to,
                employment_type = EXCLUDED.employment_type,
                application_deadline = EXCLUDED.application_deadline,
                qualifications = EXCLUDED.qualifications,
                contact = EXCLUDED.contact,
                job_category = EXCLUDED.job_category,
                is_remote_work = EXCLUDED.is_remote_work,
                number_of_openings = EXCLUDED.number_of_openings,
                source_created_at = EXCLUDED.source_created_at,
                source_updated_at = EXCLUDED.source_updated_at,
                content_hash = EXCLUDED.content_hash,
                last_updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(&job.external_id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.company)
        .bind(&job.location)
        .bind(job.salary_from)
        .bind(job.salary_to)
        .bind(job.employment_type.as_ref().map(EmploymentType::as_str))
        .bind(&job.application_deadline)
        .bind(Json(&job.qualifications))
        .bind(&job.contact)
        .bind(&job.job_category)
        .bind(job.is_remote_work)
        .bind(job.number_of_openings)
        .bind(&job.created_at)
        .bind(&job.updated_at)
        .bind(content_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(rec.0)
    }

    /// Returns a map of external_id → content_hash for every stored job.
    pub async fn get_hashes(&self) -> Result<HashMap<String, Option<String>>, AppError> {
        let rows: Vec<HashRow> = sqlx::query_as(
            r#"
            SELECT external_id, content_hash
            FROM jobs
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(rows
            .into_iter()
            .map(|row| (row.external_id, row.content_hash))
            .collect())
    }

    /// Updates only the timestamp for unchanged jobs. Returns true if a row was updated.
    pub async fn update_timestamp_only(&self, external_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET last_updated_at = NOW()
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Retrieves a job by its external identifier.
    pub async fn get_by_external_id(&self, external_id: &str) -> Result<Option<StoredJob>, AppError> {
        let query = format!("SELECT {} FROM jobs WHERE external_id = $1", JOB_COLUMNS);
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(row.map(StoredJob::from))
    }

    /// Lists jobs with optional category and remote filters, newest update first.
    pub async fn list_all(&self, filter: &JobQuery) -> Result<Vec<StoredJob>, AppError> {
        let query = format!(
            "SELECT {} FROM jobs \
             WHERE ($1::text IS NULL OR job_category = $1) \
             AND ($2::boolean IS NULL OR is_remote_work = $2) \
             ORDER BY last_updated_at DESC, external_id \
             LIMIT $3 OFFSET $4",
            JOB_COLUMNS
        );
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .bind(&filter.category)
            .bind(filter.remote)
            .bind(filter.effective_limit() as i64)
            .bind(filter.offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;

        Ok(rows.into_iter().map(StoredJob::from).collect())
    }

    /// Returns aggregated database statistics.
    pub async fn get_stats(&self) -> Result<StoreStats, AppError> {
        let row: StatsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE is_remote_work) as remote,
                COUNT(DISTINCT company) as companies,
                MAX(last_updated_at) as last_update
            FROM jobs
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(StoreStats {
            total_jobs: row.total.unwrap_or(0),
            remote_jobs: row.remote.unwrap_or(0),
            companies: row.companies.unwrap_or(0),
            last_update: row.last_update,
        })
    }
}

#[async_trait]
impl JobStore for JobRepository {
    async fn upsert(&self, posting: &JobPosting, content_hash: &str) -> Result<Uuid, AppError> {
        JobRepository::upsert(self, posting, content_hash).await
    }

    async fn content_hashes(&self) -> Result<HashMap<String, Option<String>>, AppError> {
        self.get_hashes().await
    }

    async fn touch(&self, external_id: &str) -> Result<bool, AppError> {
        self.update_timestamp_only(external_id).await
    }

    async fn get(&self, external_id: &str) -> Result<Option<StoredJob>, AppError> {
        self.get_by_external_id(external_id).await
    }

    async fn list(&self, query: &JobQuery) -> Result<Vec<StoredJob>, AppError> {
        self.list_all(query).await
    }

    async fn stats(&self) -> Result<StoreStats, AppError> {
        self.get_stats().await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(())
    }
}

/// Helper struct for deserializing job rows
#[derive(sqlx::FromRow, Debug, Clone)]
struct JobRow {
    id: Uuid,
    external_id: String,
    title: String,
    description: Option<String>,
    company: Option<String>,
    location: Option<String>,
    salary_from: Option<f64>,
    salary_to: Option<f64>,
    employment_type: Option<String>,
    application_deadline: Option<String>,
    qualifications: Json<Vec<String>>,
    contact: Option<String>,
    job_category: Option<String>,
    is_remote_work: bool,
    number_of_openings: Option<i32>,
    source_created_at: Option<String>,
    source_updated_at: Option<String>,
    content_hash: Option<String>,
    first_seen_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
}

impl From<JobRow> for StoredJob {
    fn from(row: JobRow) -> Self {
        StoredJob {
            id: row.id,
            posting: JobPosting {
                external_id: row.external_id,
                title: row.title,
                description: row.description,
                company: row.company,
                location: row.location,
                salary_from: row.salary_from,
                salary_to: row.salary_to,
                employment_type: row.employment_type.as_deref().map(EmploymentType::parse),
                application_deadline: row.application_deadline,
                qualifications: row.qualifications.0,
                contact: row.contact,
                job_category: row.job_category,
                is_remote_work: row.is_remote_work,
                number_of_openings: row.number_of_openings,
                created_at: row.source_created_at,
                updated_at: row.source_updated_at,
            },
            content_hash: row.content_hash,
            first_seen_at: row.first_seen_at,
            last_updated_at: row.last_updated_at,
        }
    }
}

/// Helper struct for deserializing stats query results
#[derive(sqlx::FromRow)]
struct StatsRow {
    total: Option<i64>,
    remote: Option<i64>,
    companies: Option<i64>,
    last_update: Option<DateTime<Utc>>,
}

/// Helper struct for deserializing hash lookup query results
#[derive(sqlx::FromRow)]
struct HashRow {
    external_id: String,
    content_hash: Option<String>,
}
