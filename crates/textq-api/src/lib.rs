//! Axum HTTP API.
//!
//! This crate provides:
//! - Job submission and status polling endpoints
//! - Liveness, readiness and store health checks
//! - Static UI hosting
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
