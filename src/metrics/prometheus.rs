//! Prometheus metrics for the translation queue.
//!
//! Each recorder owns its registry, so several services (or tests) can live
//! in one process without colliding on metric names.

use std::time::Duration;

use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use super::MetricsRecorder;
use crate::config::MetricsConfig;
use crate::queue::Priority;

const PRIORITY_LABEL: &str = "priority";

pub struct PrometheusRecorder {
    registry: Registry,
    requests_total: IntCounterVec,
    request_latency: HistogramVec,
    queue_time: HistogramVec,
    processing_time: HistogramVec,
    in_progress: IntGaugeVec,
}

impl PrometheusRecorder {
    pub fn new(config: &MetricsConfig) -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("mt_requests_total", "Total translation requests"),
            &[PRIORITY_LABEL],
        )?;
        let request_latency = histogram(
            "mt_request_latency_seconds",
            "Total end-to-end request latency (enqueue + processing)",
            config,
        )?;
        let queue_time = histogram(
            "mt_queue_time_seconds",
            "Time spent waiting in the queue before processing",
            config,
        )?;
        let processing_time = histogram(
            "mt_processing_time_seconds",
            "Time spent inside the translation processor",
            config,
        )?;
        let in_progress = IntGaugeVec::new(
            Opts::new("mt_requests_in_progress", "Requests currently being processed"),
            &[PRIORITY_LABEL],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_latency.clone()))?;
        registry.register(Box::new(queue_time.clone()))?;
        registry.register(Box::new(processing_time.clone()))?;
        registry.register(Box::new(in_progress.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_latency,
            queue_time,
            processing_time,
            in_progress,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Submissions counted so far for `priority`.
    pub fn submissions(&self, priority: Priority) -> u64 {
        self.requests_total
            .with_label_values(&[priority.label()])
            .get()
    }

    /// Jobs currently being processed at `priority`.
    pub fn in_progress(&self, priority: Priority) -> i64 {
        self.in_progress.with_label_values(&[priority.label()]).get()
    }

    /// Number of latency observations for `priority`.
    pub fn latency_samples(&self, priority: Priority) -> u64 {
        self.request_latency
            .with_label_values(&[priority.label()])
            .get_sample_count()
    }

    /// Number of queue-time observations for `priority`.
    pub fn queue_time_samples(&self, priority: Priority) -> u64 {
        self.queue_time
            .with_label_values(&[priority.label()])
            .get_sample_count()
    }
}

fn histogram(name: &str, help: &str, config: &MetricsConfig) -> prometheus::Result<HistogramVec> {
    HistogramVec::new(
        HistogramOpts::new(name, help).buckets(config.buckets.clone()),
        &[PRIORITY_LABEL],
    )
}

impl MetricsRecorder for PrometheusRecorder {
    fn record_submission(&self, priority: Priority) {
        self.requests_total
            .with_label_values(&[priority.label()])
            .inc();
    }

    fn observe_latency(&self, priority: Priority, elapsed: Duration) {
        self.request_latency
            .with_label_values(&[priority.label()])
            .observe(elapsed.as_secs_f64());
    }

    fn observe_queue_time(&self, priority: Priority, waited: Duration) {
        self.queue_time
            .with_label_values(&[priority.label()])
            .observe(waited.as_secs_f64());
    }

    fn observe_processing_time(&self, priority: Priority, elapsed: Duration) {
        self.processing_time
            .with_label_values(&[priority.label()])
            .observe(elapsed.as_secs_f64());
    }

    fn job_started(&self, priority: Priority) {
        self.in_progress.with_label_values(&[priority.label()]).inc();
    }

    fn job_finished(&self, priority: Priority) {
        self.in_progress.with_label_values(&[priority.label()]).dec();
    }

    fn render(&self) -> String {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .unwrap_or_else(|e| format!("# Error encoding metrics: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> PrometheusRecorder {
        PrometheusRecorder::new(&MetricsConfig::default()).unwrap()
    }

    #[test]
    fn test_counts_are_partitioned_by_priority() {
        let m = recorder();
        m.record_submission(Priority::CRITICAL);
        m.record_submission(Priority::CRITICAL);
        m.record_submission(Priority::LOW);

        assert_eq!(m.submissions(Priority::CRITICAL), 2);
        assert_eq!(m.submissions(Priority::HIGH), 0);
        assert_eq!(m.submissions(Priority::LOW), 1);
    }

    #[test]
    fn test_histograms_count_samples() {
        let m = recorder();
        m.observe_latency(Priority::NORMAL, Duration::from_millis(120));
        m.observe_queue_time(Priority::NORMAL, Duration::from_millis(20));
        m.observe_queue_time(Priority::NORMAL, Duration::ZERO);

        assert_eq!(m.latency_samples(Priority::NORMAL), 1);
        assert_eq!(m.queue_time_samples(Priority::NORMAL), 2);
        assert_eq!(m.queue_time_samples(Priority::HIGH), 0);
    }

    #[test]
    fn test_render_exposition_text() {
        let m = recorder();
        m.record_submission(Priority::HIGH);
        m.observe_processing_time(Priority::HIGH, Duration::from_millis(5));
        m.job_started(Priority::HIGH);

        let text = m.render();
        assert!(text.contains("# TYPE mt_requests_total counter"));
        assert!(text.contains("mt_requests_total{priority=\"1\"} 1"));
        assert!(text.contains("mt_processing_time_seconds_count{priority=\"1\"} 1"));
        assert!(text.contains("mt_requests_in_progress{priority=\"1\"} 1"));
    }

    #[test]
    fn test_recorders_do_not_share_state() {
        let a = recorder();
        let b = recorder();
        a.record_submission(Priority::LOW);
        assert!(b.registry().gather().is_empty());
        assert_eq!(b.submissions(Priority::LOW), 0);
    }
}
