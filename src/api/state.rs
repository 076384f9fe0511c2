use std::sync::Arc;
use std::time::Duration;

use crate::metrics::MetricsRecorder;
use crate::processor::Processor;
use crate::queue::JobQueue;

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<JobQueue>,
    pub processor: Arc<dyn Processor>,
    pub metrics: Arc<dyn MetricsRecorder>,
    /// Upper bound on how long a request waits for its job's outcome.
    pub request_timeout: Duration,
}
