//! Prometheus metrics for the worker.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub mod names {
    pub const JOBS_COMPLETED_TOTAL: &str = "textq_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "textq_jobs_failed_total";
    pub const JOBS_SKIPPED_TOTAL: &str = "textq_jobs_skipped_total";
    pub const JOB_DURATION_SECONDS: &str = "textq_job_duration_seconds";
    pub const STORE_ERRORS_TOTAL: &str = "textq_worker_store_errors_total";
}

/// Install the recorder and serve `/metrics` on `0.0.0.0:<port>`.
///
/// Must be called from within the tokio runtime.
pub fn init_metrics(port: u16) -> Result<(), BuildError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()
}

pub fn record_job_completed(transform: &str, duration_secs: f64) {
    let labels = [("transform", transform.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_job_failed(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_job_skipped() {
    counter!(names::JOBS_SKIPPED_TOTAL).increment(1);
}

pub fn record_store_error() {
    counter!(names::STORE_ERRORS_TOTAL).increment(1);
}
