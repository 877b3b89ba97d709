//! HTTP-level tests against an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use textq_api::{create_router, ApiConfig, AppState};
use textq_models::JobId;
use textq_queue::{InMemoryStore, JobQueue, JobStore, QueueConfig, QueueError, QueueResult};

/// A store that is never reachable.
struct DownStore;

#[async_trait]
impl JobStore for DownStore {
    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> QueueResult<()> {
        Err(QueueError::connection_failed("connection refused"))
    }

    async fn set_many_ex(&self, _entries: &[(String, String)], _ttl: Duration) -> QueueResult<()> {
        Err(QueueError::connection_failed("connection refused"))
    }

    async fn get(&self, _key: &str) -> QueueResult<Option<String>> {
        Err(QueueError::connection_failed("connection refused"))
    }

    async fn delete(&self, _key: &str) -> QueueResult<()> {
        Err(QueueError::connection_failed("connection refused"))
    }

    async fn push(&self, _list: &str, _value: &str) -> QueueResult<()> {
        Err(QueueError::connection_failed("connection refused"))
    }

    async fn push_capped(&self, _list: &str, _value: &str, _max_len: u64) -> QueueResult<()> {
        Err(QueueError::connection_failed("connection refused"))
    }

    async fn pop(&self, _list: &str) -> QueueResult<Option<String>> {
        Err(QueueError::connection_failed("connection refused"))
    }

    async fn pop_blocking(&self, _list: &str, _timeout: Duration) -> QueueResult<Option<String>> {
        Err(QueueError::connection_failed("connection refused"))
    }

    async fn list_len(&self, _list: &str) -> QueueResult<u64> {
        Err(QueueError::connection_failed("connection refused"))
    }

    async fn ping(&self) -> QueueResult<()> {
        Err(QueueError::connection_failed("connection refused"))
    }
}

fn test_config() -> ApiConfig {
    ApiConfig {
        static_dir: "does-not-exist".into(),
        ..ApiConfig::default()
    }
}

fn app_with_store(store: Arc<dyn JobStore>, config: ApiConfig) -> (Router, JobQueue) {
    let queue = JobQueue::new(store, QueueConfig::default());
    let state = AppState::new(config, queue.clone());
    (create_router(state, None), queue)
}

fn memory_app() -> (Router, JobQueue) {
    app_with_store(Arc::new(InMemoryStore::new()), test_config())
}

fn submit_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/jobs")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn submitted_job_is_immediately_queued() {
    let (app, _queue) = memory_app();

    let response = app
        .clone()
        .oneshot(submit_request(r#"{"text":"hello"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let job_id = json_body(response).await["job_id"].as_str().unwrap().to_string();
    assert!(!job_id.is_empty());

    let response = app
        .oneshot(get_request(&format!("/jobs/{}", job_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["job_id"], json!(job_id));
    assert_eq!(body["status"], json!("queued"));
    assert_eq!(body["result"], Value::Null);
}

#[tokio::test]
async fn completed_job_reports_result() {
    let (app, queue) = memory_app();

    let response = app
        .clone()
        .oneshot(submit_request(r#"{"text":"hello"}"#))
        .await
        .unwrap();
    let job_id = json_body(response).await["job_id"].as_str().unwrap().to_string();

    queue
        .complete(&JobId::from_string(job_id.clone()), "HELLO")
        .await
        .unwrap();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(get_request(&format!("/jobs/{}", job_id)))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["status"], json!("done"));
        assert_eq!(body["result"], json!("HELLO"));
    }
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let (app, _queue) = memory_app();

    let response = app.oneshot(get_request("/jobs/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await,
        json!({"detail": "Job not found or expired"})
    );
}

#[tokio::test]
async fn concurrent_submissions_get_distinct_ids() {
    let (app, queue) = memory_app();

    let mut handles = Vec::new();
    for i in 0..20 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let body = format!(r#"{{"text":"text-{}"}}"#, i);
            let response = app.oneshot(submit_request(&body)).await.unwrap();
            json_body(response).await["job_id"].as_str().unwrap().to_string()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
    assert_eq!(queue.len().await.unwrap(), 20);
}

#[tokio::test]
async fn missing_text_is_rejected() {
    let (app, queue) = memory_app();

    let response = app.oneshot(submit_request("{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json_body(response).await["detail"].is_string());
    assert_eq!(queue.len().await.unwrap(), 0);
}

#[tokio::test]
async fn healthz_reports_reachable_store() {
    let (app, _queue) = memory_app();

    let response = app.oneshot(get_request("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["redis"], json!("reachable"));
}

#[tokio::test]
async fn healthz_reports_unreachable_store() {
    let (app, _queue) = app_with_store(Arc::new(DownStore), test_config());

    let response = app.oneshot(get_request("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], json!("unhealthy"));
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn store_outage_maps_to_service_unavailable() {
    let (app, _queue) = app_with_store(Arc::new(DownStore), test_config());

    let response = app
        .clone()
        .oneshot(submit_request(r#"{"text":"hello"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.oneshot(get_request("/jobs/abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn liveness_does_not_touch_store() {
    let (app, _queue) = app_with_store(Arc::new(DownStore), test_config());

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], json!("healthy"));
}

#[tokio::test]
async fn readiness_reports_queue_depth() {
    let (app, queue) = memory_app();
    queue.submit("a").await.unwrap();
    queue.submit("b").await.unwrap();

    let response = app.oneshot(get_request("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], json!("ready"));
    assert_eq!(body["checks"]["queue_length"], json!(2));
    assert_eq!(body["checks"]["dlq_length"], json!(0));

    let (app, _queue) = app_with_store(Arc::new(DownStore), test_config());
    let response = app.oneshot(get_request("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["status"], json!("degraded"));
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let (app, _queue) = memory_app();

    let response = app.oneshot(get_request("/health")).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn job_routes_are_rate_limited_per_client() {
    let config = ApiConfig {
        rate_limit_rps: 1,
        ..test_config()
    };
    let (app, _queue) = app_with_store(Arc::new(InMemoryStore::new()), config);

    let request = |ip: &str| {
        Request::builder()
            .uri("/jobs/abc")
            .header("X-Forwarded-For", ip)
            .body(Body::empty())
            .unwrap()
    };

    let first = app.clone().oneshot(request("198.51.100.1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::NOT_FOUND);

    let second = app.clone().oneshot(request("198.51.100.1")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = app.oneshot(request("198.51.100.2")).await.unwrap();
    assert_eq!(other.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn static_ui_is_served_when_present() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>textq</h1>").unwrap();

    let config = ApiConfig {
        static_dir: dir.path().to_path_buf(),
        ..ApiConfig::default()
    };
    let (app, _queue) = app_with_store(Arc::new(InMemoryStore::new()), config);

    let response = app.oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>textq</h1>");
}
