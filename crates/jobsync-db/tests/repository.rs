//! Integration tests against a real PostgreSQL instance.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -p jobsync-db -- --ignored`.
//! Tests use identifiers unique to each run so they can share one database.

use jobsync_core::{JobPosting, JobQuery, JobStore};
use jobsync_db::{run_migrations, JobRepository};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

async fn repository() -> JobRepository {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("failed to connect to test database");
    run_migrations(&pool).await.expect("migrations failed");
    JobRepository::new(pool)
}

fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn upsert_inserts_then_updates_in_place() {
    let repo = repository().await;
    let id = unique_id("J1");

    let mut job = JobPosting::new(id.clone(), "Engineer");
    job.salary_from = Some(80_000.0);
    let first = repo.upsert(&job, &job.content_hash()).await.unwrap();

    job.title = "Senior Engineer".to_string();
    let second = repo.upsert(&job, &job.content_hash()).await.unwrap();

    assert_eq!(first, second);
    let stored = repo.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.posting.title, "Senior Engineer");
    assert_eq!(stored.posting.salary_from, Some(80_000.0));
    assert_eq!(stored.content_hash, Some(job.content_hash()));
    assert!(stored.last_updated_at >= stored.first_seen_at);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn hashes_and_touch_reflect_stored_rows() {
    let repo = repository().await;
    let id = unique_id("J2");
    let job = JobPosting::new(id.clone(), "Designer");
    let hash = job.content_hash();
    repo.upsert(&job, &hash).await.unwrap();

    let hashes = repo.content_hashes().await.unwrap();
    assert_eq!(hashes.get(&id), Some(&Some(hash)));

    assert!(repo.touch(&id).await.unwrap());
    assert!(!repo.touch(&unique_id("missing")).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn list_filters_by_category() {
    let repo = repository().await;
    let category = unique_id("cat");
    let mut job = JobPosting::new(unique_id("J3"), "Analyst");
    job.job_category = Some(category.clone());
    job.qualifications = vec!["SQL".to_string()];
    repo.upsert(&job, &job.content_hash()).await.unwrap();

    let listed = repo
        .list(&JobQuery {
            category: Some(category),
            ..JobQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].posting.qualifications, vec!["SQL"]);
    repo.ping().await.unwrap();
}
