//! Single background worker that drains the job queue.
//!
//! Exactly one worker exists per queue, so the processor is never called
//! concurrently and jobs are processed in strict priority-then-FIFO order.
//! The [`WorkerHandle`] provides a shutdown channel for graceful termination
//! and reports what happened in a [`WorkerReport`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::metrics::{InFlight, MetricsRecorder};
use crate::processor::{ProcessError, Processor};
use crate::queue::{Job, JobQueue, Outcome, Priority, Translation};

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

pub struct Worker {
    queue: Arc<JobQueue>,
    processor: Arc<dyn Processor>,
    metrics: Arc<dyn MetricsRecorder>,
    processed: Arc<AtomicU64>,
}

impl Worker {
    pub fn new(
        queue: Arc<JobQueue>,
        processor: Arc<dyn Processor>,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            queue,
            processor,
            metrics,
            processed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start the worker on the current runtime.
    pub fn spawn(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let queue = self.queue.clone();
        let processed = self.processed.clone();
        let task = tokio::spawn(self.run(shutdown_rx));

        WorkerHandle {
            shutdown_tx,
            task,
            queue,
            processed,
        }
    }

    /// Main loop. Returns when a shutdown signal arrives (or its sender is
    /// dropped) or the queue is closed. On the way out the queue is closed,
    /// so nothing is accepted that no worker would ever pick up. Returns the
    /// number of queued jobs abandoned by that close.
    pub async fn run(self, shutdown_rx: oneshot::Receiver<()>) -> usize {
        info!("translation worker started");
        tokio::pin!(shutdown_rx);

        loop {
            let job = tokio::select! {
                biased;

                _ = &mut shutdown_rx => {
                    info!("shutdown signal received, stopping worker");
                    break;
                }
                job = self.queue.dequeue() => match job {
                    Some(job) => job,
                    None => {
                        info!("queue closed, stopping worker");
                        break;
                    }
                },
            };

            let Job {
                id,
                priority,
                payload,
                enqueued_at,
                resolver,
            } = job;

            // The resolver stays out here so a fault while handling the job
            // still reaches the caller as a failure.
            let outcome = match AssertUnwindSafe(self.process_job(id, priority, payload, enqueued_at))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let message = panic_message(&*panic);
                    error!(job_id = %id, panic = %message, "worker fault while handling job");
                    Err(ProcessError::Fault(message))
                }
            };
            resolver.resolve(outcome);
            self.processed.fetch_add(1, Ordering::Relaxed);
        }

        let abandoned = self.queue.close().await;
        info!(
            processed = self.processed.load(Ordering::Relaxed),
            abandoned,
            "translation worker stopped"
        );
        abandoned
    }

    /// Run one job through the processor. The in-flight gauge is balanced by
    /// the time this returns (or unwinds).
    async fn process_job(
        &self,
        id: Uuid,
        priority: Priority,
        payload: String,
        enqueued_at: Instant,
    ) -> Outcome {
        let started = Instant::now();
        let queued_time = started.saturating_duration_since(enqueued_at);
        info!(
            job_id = %id,
            priority = priority.level(),
            queue_time_ms = queued_time.as_millis() as u64,
            queue_size = self.queue.size(),
            "dequeued job"
        );

        self.metrics.observe_queue_time(priority, queued_time);
        let _in_flight = InFlight::start(self.metrics.as_ref(), priority);

        let result = AssertUnwindSafe(self.processor.process(&payload))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ProcessError::Panicked(panic_message(&*panic))));

        match result {
            Ok(translated_text) => {
                let processing_time = started.elapsed();
                self.metrics.observe_processing_time(priority, processing_time);
                debug!(
                    job_id = %id,
                    processing_time_ms = processing_time.as_millis() as u64,
                    "job processed"
                );
                Ok(Translation {
                    original_text: payload,
                    translated_text,
                    priority,
                    processing_time,
                    queued_time,
                })
            }
            Err(e) => {
                warn!(job_id = %id, priority = priority.level(), error = %e, "job failed");
                Err(e)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// WorkerHandle
// ---------------------------------------------------------------------------

/// Handle to the running worker.
///
/// Dropping the handle signals the worker to stop after its current job; the
/// queue is closed when it does.
pub struct WorkerHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<usize>,
    queue: Arc<JobQueue>,
    processed: Arc<AtomicU64>,
}

/// What a worker shutdown did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    /// Jobs that received an outcome from the worker.
    pub processed: u64,
    /// Queued jobs dropped at shutdown.
    pub abandoned: usize,
    /// Whether an in-flight job outlived the grace period and was aborted.
    pub aborted: bool,
}

impl WorkerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the worker. An idle worker exits immediately; a busy one gets
    /// `grace` to finish its current job before being aborted. Whatever is
    /// still queued afterwards is abandoned.
    pub async fn shutdown(self, grace: Duration) -> WorkerReport {
        let _ = self.shutdown_tx.send(());

        let mut task = self.task;
        let (aborted, abandoned) = match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(abandoned)) => (false, abandoned),
            Ok(Err(e)) => {
                error!(error = %e, "worker task ended abnormally");
                (false, self.queue.close().await)
            }
            Err(_) => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    "in-flight job exceeded shutdown grace period, aborting worker"
                );
                task.abort();
                // Wait for the abort so the in-flight guard and resolver drop.
                let _ = task.await;
                (true, self.queue.close().await)
            }
        };

        let report = WorkerReport {
            processed: self.processed.load(Ordering::Relaxed),
            abandoned,
            aborted,
        };
        info!(
            processed = report.processed,
            abandoned = report.abandoned,
            aborted = report.aborted,
            "worker shut down"
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
