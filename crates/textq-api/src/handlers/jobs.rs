//! Job submission and status polling handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use textq_models::{JobId, JobView};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Submission body. The text is accepted as-is.
#[derive(Debug, Deserialize)]
pub struct JobRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: String,
}

/// `POST /jobs`: queue a job and return its id without waiting.
pub async fn create_job(
    State(state): State<AppState>,
    body: Result<Json<JobRequest>, JsonRejection>,
) -> ApiResult<Json<JobResponse>> {
    let Json(request) = body?;

    let job_id = state.queue.submit(request.text).await?;
    metrics::record_job_submitted();

    Ok(Json(JobResponse {
        job_id: job_id.to_string(),
    }))
}

/// `GET /jobs/:job_id`: current status and result.
///
/// Expired and never-issued ids both report 404.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let job_id = JobId::from_string(job_id);

    match state.queue.query(&job_id).await? {
        Some(view) => Ok(Json(view)),
        None => Err(ApiError::not_found("Job not found or expired")),
    }
}
