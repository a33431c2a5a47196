use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use jobsync_core::models::DEFAULT_LIST_LIMIT;
use jobsync_core::{AppError, JobQuery, StoredJob};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    category: Option<String>,
    remote: Option<bool>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl From<ListParams> for JobQuery {
    fn from(params: ListParams) -> Self {
        JobQuery {
            category: params.category.filter(|c| !c.is_empty()),
            remote: params.remote,
            limit: params.limit.unwrap_or(DEFAULT_LIST_LIMIT),
            offset: params.offset.unwrap_or(0),
        }
    }
}

pub async fn list_jobs_handler(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<StoredJob>>, ApiError> {
    let Query(params) = params.map_err(|e| {
        ApiError::new(StatusCode::BAD_REQUEST, "Invalid query parameters", e.body_text())
    })?;
    let jobs = state.store().list(&JobQuery::from(params)).await?;
    Ok(Json(jobs))
}

pub async fn get_job_handler(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<StoredJob>, ApiError> {
    match state.store().get(&external_id).await? {
        Some(job) => Ok(Json(job)),
        None => Err(AppError::JobNotFound(external_id).into()),
    }
}
