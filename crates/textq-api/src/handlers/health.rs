//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::metrics;
use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Liveness probe. Never touches the store.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Store health response.
#[derive(Serialize)]
pub struct StoreHealthResponse {
    pub status: String,
    pub redis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// `GET /healthz`: verifies store connectivity.
///
/// Reports `unhealthy` with 503 when the store cannot be reached; the
/// process itself keeps serving.
pub async fn healthz(State(state): State<AppState>) -> Response {
    match state.queue.ping().await {
        Ok(()) => Json(StoreHealthResponse {
            status: "ok".to_string(),
            redis: "reachable".to_string(),
            detail: None,
        })
        .into_response(),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(StoreHealthResponse {
                    status: "unhealthy".to_string(),
                    redis: "unreachable".to_string(),
                    detail: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub redis: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dlq_length: Option<u64>,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }
}

/// Readiness probe with queue depth detail.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let start = Instant::now();
    let redis = match state.queue.ping().await {
        Ok(()) => CheckStatus::ok(start.elapsed().as_millis() as u64),
        Err(e) => CheckStatus::error(e.to_string()),
    };

    if redis.status != "ok" {
        let response = ReadinessResponse {
            status: "degraded".to_string(),
            checks: ReadinessChecks {
                redis,
                queue_length: None,
                dlq_length: None,
            },
        };
        return Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)));
    }

    let queue_length = state.queue.len().await.ok();
    let dlq_length = state.queue.dlq_len().await.ok();
    if let Some(len) = queue_length {
        metrics::set_queue_length(len);
    }
    if let Some(len) = dlq_length {
        metrics::set_dlq_length(len);
    }

    Ok(Json(ReadinessResponse {
        status: "ready".to_string(),
        checks: ReadinessChecks {
            redis,
            queue_length,
            dlq_length,
        },
    }))
}
