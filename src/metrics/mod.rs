//! Metrics recording seam.
//!
//! The worker and the request handlers only see [`MetricsRecorder`]; the
//! Prometheus-backed implementation lives in [`prometheus`] and a no-op one
//! is available for tests and embedding.

mod prometheus;

pub use self::prometheus::PrometheusRecorder;

use std::time::Duration;

use crate::queue::Priority;

/// Sink for service observations, partitioned by priority.
///
/// Each call is one atomic observation; no ordering is implied across calls.
pub trait MetricsRecorder: Send + Sync {
    /// A validated job is about to be enqueued.
    fn record_submission(&self, priority: Priority);

    /// End-to-end time from submission to outcome.
    fn observe_latency(&self, priority: Priority, elapsed: Duration);

    /// Time a job spent queued before the worker picked it up.
    fn observe_queue_time(&self, priority: Priority, waited: Duration);

    /// Time the processor spent on a successful job.
    fn observe_processing_time(&self, priority: Priority, elapsed: Duration);

    /// The worker started processing a job.
    fn job_started(&self, priority: Priority);

    /// The worker finished (or abandoned) a job.
    fn job_finished(&self, priority: Priority);

    /// Render current values in the text exposition format.
    fn render(&self) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct NoopRecorder;

impl MetricsRecorder for NoopRecorder {
    fn record_submission(&self, _priority: Priority) {}
    fn observe_latency(&self, _priority: Priority, _elapsed: Duration) {}
    fn observe_queue_time(&self, _priority: Priority, _waited: Duration) {}
    fn observe_processing_time(&self, _priority: Priority, _elapsed: Duration) {}
    fn job_started(&self, _priority: Priority) {}
    fn job_finished(&self, _priority: Priority) {}

    fn render(&self) -> String {
        String::new()
    }
}

/// Keeps the in-flight gauge balanced even if the job future is dropped.
pub(crate) struct InFlight<'a> {
    metrics: &'a dyn MetricsRecorder,
    priority: Priority,
}

impl<'a> InFlight<'a> {
    pub(crate) fn start(metrics: &'a dyn MetricsRecorder, priority: Priority) -> Self {
        metrics.job_started(priority);
        Self { metrics, priority }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.metrics.job_finished(self.priority);
    }
}
