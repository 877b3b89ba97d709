//! Text processing worker binary.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use textq_queue::JobQueue;
use textq_worker::executor::join_with_grace;
use textq_worker::{metrics, transform, Worker, WorkerConfig, WorkerError};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rediss:// connections)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("rustls crypto provider already installed");
    }

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("textq=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting textq-worker");

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(port) = config.metrics_port {
        match metrics::init_metrics(port) {
            Ok(()) => info!("Prometheus metrics listening on port {}", port),
            Err(e) => error!("Failed to start metrics exporter: {}", e),
        }
    }

    let transform = match transform::by_name(&config.transform) {
        Some(t) => t,
        None => {
            let e = WorkerError::config_error(format!("unknown transform '{}'", config.transform));
            error!("{}", e);
            std::process::exit(1);
        }
    };

    // Create queue client
    let queue = match JobQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };
    info!("Consuming queue '{}'", queue.config().queue_name);

    let grace = config.poll_timeout + config.job_timeout + Duration::from_secs(1);
    let worker = Arc::new(Worker::new(config, queue, transform));

    let handle = {
        let worker = Arc::clone(&worker);
        tokio::spawn(async move { worker.run().await })
    };

    shutdown_signal().await;
    info!("Received shutdown signal, finishing current job");
    worker.shutdown();

    join_with_grace(handle, grace).await;
    info!("Worker shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
