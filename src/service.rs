//! Assembly of queue, worker and HTTP state into one running service.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::api::{self, state::AppState};
use crate::metrics::MetricsRecorder;
use crate::processor::Processor;
use crate::queue::JobQueue;
use crate::worker::{Worker, WorkerHandle, WorkerReport};

/// A queue with its worker running and the state the HTTP layer needs.
///
/// Must be created inside a Tokio runtime; the worker is spawned on it.
pub struct Service {
    state: AppState,
    worker: WorkerHandle,
}

impl Service {
    pub fn start(
        processor: Arc<dyn Processor>,
        metrics: Arc<dyn MetricsRecorder>,
        request_timeout: Duration,
    ) -> Self {
        let queue = Arc::new(JobQueue::new());
        let worker = Worker::new(queue.clone(), processor.clone(), metrics.clone()).spawn();

        Self {
            state: AppState {
                queue,
                processor,
                metrics,
                request_timeout,
            },
            worker,
        }
    }

    pub fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Stop the worker and abandon whatever is still queued. Waiting
    /// requests then complete with 503.
    pub async fn shutdown(self, grace: Duration) -> WorkerReport {
        self.worker.shutdown(grace).await
    }
}
