use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use jobsync_core::testing::{fixtures, InMemoryJobStore, StaticFeed};
use jobsync_core::{AppError, SyncConfig, SyncService};
use jobsync_server::build_router;
use serde_json::Value;
use tower::ServiceExt;

fn app(store: Arc<InMemoryJobStore>, feed: StaticFeed) -> Router {
    let service = SyncService::new(store, Arc::new(feed), SyncConfig::default());
    build_router(Arc::new(service))
}

async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn fetch_jobs_stores_feed_and_acknowledges() {
    let store = Arc::new(InMemoryJobStore::new());
    let app = app(store.clone(), StaticFeed::with_postings(fixtures::batch(3)));

    let (status, body) = send(app, Method::GET, "/jobs/fetch-jobs").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Jobs fetched and stored successfully!");
    assert_eq!(body["report"]["stats"]["created"], 3);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn post_sync_is_an_alias() {
    let store = Arc::new(InMemoryJobStore::new());
    let app = app(store.clone(), StaticFeed::with_postings(fixtures::batch(2)));

    let (status, body) = send(app, Method::POST, "/jobs/sync").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["fetched"], 2);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn repeated_sync_reports_unchanged() {
    let store = Arc::new(InMemoryJobStore::new());
    for posting in fixtures::batch(2) {
        store.seed(posting);
    }
    let app = app(store.clone(), StaticFeed::with_postings(fixtures::batch(2)));

    let (status, body) = send(app, Method::GET, "/jobs/fetch-jobs").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["stats"]["unchanged"], 2);
    assert_eq!(body["report"]["stats"]["created"], 0);
}

#[tokio::test]
async fn feed_failure_returns_bad_gateway_and_writes_nothing() {
    let store = Arc::new(InMemoryJobStore::new());
    store.seed(fixtures::posting("J1", "Engineer"));
    let before = store.snapshot();
    let app = app(
        store.clone(),
        StaticFeed::failing(|| AppError::NetworkError("connection refused".to_string())),
    );

    let (status, body) = send(app, Method::GET, "/jobs/fetch-jobs").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Failed to fetch jobs");
    assert!(body["details"].as_str().unwrap().contains("connection refused"));
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn store_outage_returns_service_unavailable() {
    let store = Arc::new(InMemoryJobStore::new());
    store.set_unavailable(true);
    let app = app(store, StaticFeed::with_postings(fixtures::batch(1)));

    let (status, body) = send(app, Method::GET, "/jobs/fetch-jobs").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Failed to fetch jobs");
}

#[tokio::test]
async fn lists_jobs_with_filters() {
    let store = Arc::new(InMemoryJobStore::new());
    for posting in fixtures::batch(8) {
        store.seed(posting);
    }
    let app = app(store, StaticFeed::with_postings(Vec::new()));

    let (status, body) = send(app.clone(), Method::GET, "/jobs?remote=true").await;
    assert_eq!(status, StatusCode::OK);
    let jobs = body.as_array().unwrap();
    // job-0000 and job-0004
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|job| job["is_remote_work"] == true));

    let (_, body) = send(app.clone(), Method::GET, "/jobs?category=Design").await;
    let jobs = body.as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|job| job["job_category"] == "Design"));

    let (_, body) = send(app, Method::GET, "/jobs?limit=3&offset=6").await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn bad_list_parameters_return_error_body() {
    let app = app(
        Arc::new(InMemoryJobStore::new()),
        StaticFeed::with_postings(Vec::new()),
    );

    let (status, body) = send(app, Method::GET, "/jobs?remote=maybe").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid query parameters");
    assert!(!body["details"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn gets_job_by_external_id() {
    let store = Arc::new(InMemoryJobStore::new());
    store.seed(fixtures::posting("J1", "Engineer"));
    let app = app(store, StaticFeed::with_postings(Vec::new()));

    let (status, body) = send(app.clone(), Method::GET, "/jobs/J1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["external_id"], "J1");
    assert_eq!(body["title"], "Engineer");

    let (status, body) = send(app, Method::GET, "/jobs/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Job not found");
}

#[tokio::test]
async fn health_reflects_store_state() {
    let store = Arc::new(InMemoryJobStore::new());
    let app = app(store.clone(), StaticFeed::with_postings(Vec::new()));

    let (status, body) = send(app.clone(), Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"status": "healthy"}));

    store.set_unavailable(true);
    let (status, body) = send(app, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn run_stops_on_shutdown_signal() {
    let store = Arc::new(InMemoryJobStore::new());
    let service = SyncService::new(
        store,
        Arc::new(StaticFeed::with_postings(Vec::new())),
        SyncConfig::default(),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        jobsync_server::run(listener, Arc::new(service), async {}),
    )
    .await;

    assert!(matches!(result, Ok(Ok(()))));
}
