//! API error types.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::is_production_environment;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("Queue error: {0}")]
    Queue(#[from] textq_queue::QueueError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Response detail; store internals are hidden in production.
    fn detail(&self, production: bool) -> String {
        match self {
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::InvalidBody(rejection) => rejection.body_text(),
            ApiError::Queue(_) if production => {
                if self.status_code() == StatusCode::SERVICE_UNAVAILABLE {
                    "Service temporarily unavailable".to_string()
                } else {
                    "An internal error occurred".to_string()
                }
            }
            ApiError::Queue(_) => self.to_string(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidBody(rejection) => rejection.status(),
            ApiError::Queue(e) if e.is_connectivity() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = %status, "Request failed: {}", self);
        } else {
            debug!(status = %status, "Request rejected: {}", self);
        }

        let production = std::env::var("ENVIRONMENT")
            .map(|v| is_production_environment(&v))
            .unwrap_or(false);
        let detail = self.detail(production);

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
