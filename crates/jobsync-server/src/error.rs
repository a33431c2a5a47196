use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jobsync_core::AppError;
use serde::Serialize;

/// Error payload returned by every route: `{ "error": ..., "details": ... }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}

/// An `AppError` paired with the HTTP status it maps to.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                details: details.into(),
            },
        }
    }

    /// Maps a failed sync run: feed problems are upstream failures (502),
    /// store problems mean we are unavailable (503).
    pub fn sync_failed(err: AppError) -> Self {
        let status = if err.is_store_error() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::BAD_GATEWAY
        };
        Self::new(status, "Failed to fetch jobs", err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match &err {
            AppError::JobNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "Job not found", err.to_string())
            }
            AppError::DatabaseError(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Store unavailable",
                err.to_string(),
            ),
            _ => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error",
                err.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
