//! mtqueue -- priority-queued machine translation service.
//!
//! Callers submit text with a priority (0 = most urgent). Jobs wait in an
//! in-memory priority queue and a single background worker hands them to the
//! translation processor one at a time, delivering each outcome back to the
//! waiting request.

pub mod api;
pub mod config;
pub mod metrics;
pub mod processor;
pub mod queue;
pub mod service;
pub mod worker;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::ServiceConfig;
use crate::metrics::{MetricsRecorder, PrometheusRecorder};
use crate::service::Service;

/// Start the daemon: processor, worker, and API server. Runs until Ctrl-C or
/// SIGTERM, then shuts down gracefully.
pub async fn serve(config: ServiceConfig) -> Result<()> {
    // 1. Processor
    let processor = processor::from_config(&config.processor).await?;
    tracing::info!(
        model_loaded = processor.is_ready(),
        device = %processor.device(),
        "Processor initialized"
    );

    // 2. Metrics
    let metrics: Arc<dyn MetricsRecorder> = Arc::new(
        PrometheusRecorder::new(&config.metrics).context("failed to register metrics")?,
    );

    // 3. Queue + worker
    let service = Service::start(processor, metrics, config.server.request_timeout());
    let app = service.router();

    // 4. API server
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", addr))?;
    tracing::info!(%addr, "mtqueue listening");

    let grace = config.server.shutdown_grace();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutting down translation service");
            // Stop the worker first so requests still waiting on queued jobs
            // are answered before the HTTP server drains.
            service.shutdown(grace).await;
        })
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
