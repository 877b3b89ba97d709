//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder.
/// Returns a handle that renders the scrape output.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "textq_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "textq_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "textq_http_requests_in_flight";

    // Queue metrics
    pub const QUEUE_LENGTH: &str = "textq_queue_length";
    pub const QUEUE_DLQ_LENGTH: &str = "textq_queue_dlq_length";
    pub const JOBS_SUBMITTED_TOTAL: &str = "textq_jobs_submitted_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "textq_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn set_queue_length(length: u64) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

pub fn set_dlq_length(length: u64) {
    gauge!(names::QUEUE_DLQ_LENGTH).set(length as f64);
}

pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
}

pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Collapse job ids so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    static JOB_PATH: OnceLock<regex_lite::Regex> = OnceLock::new();
    let re = JOB_PATH.get_or_init(|| {
        regex_lite::Regex::new(r"^/jobs/[^/]+").expect("valid job path pattern")
    });
    re.replace(path, "/jobs/:job_id").to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
