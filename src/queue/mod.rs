//! In-memory priority job queue.
//!
//! Four FIFO lanes, one per priority level, drained from lane 0 to lane 3.
//! That gives strict priority ordering with FIFO tie-breaking without a heap.
//! The queue is unbounded; there is no admission control.

pub mod handle;
mod priority;

pub use self::handle::{JobError, Outcome, ResultHandle, Resolver};
pub use self::priority::{Priority, PriorityError};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue is closed; the service is shutting down")]
    Closed,
}

/// Result of a successfully processed job.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub original_text: String,
    pub translated_text: String,
    pub priority: Priority,
    pub processing_time: Duration,
    pub queued_time: Duration,
}

/// One queued unit of work.
#[derive(Debug)]
pub struct Job {
    pub id: Uuid,
    pub priority: Priority,
    pub payload: String,
    /// Captured under the queue lock, so it agrees with insertion order.
    pub enqueued_at: Instant,
    pub resolver: Resolver,
}

struct Lanes {
    lanes: [VecDeque<Job>; Priority::LEVELS],
    closed: bool,
}

impl Lanes {
    fn pop_next(&mut self) -> Option<Job> {
        self.lanes.iter_mut().find_map(VecDeque::pop_front)
    }

    fn drain_all(&mut self) -> Vec<Job> {
        self.lanes.iter_mut().flat_map(|lane| lane.drain(..)).collect()
    }
}

/// Concurrency-safe priority queue shared by all submitters and the worker.
pub struct JobQueue {
    inner: Mutex<Lanes>,
    len: AtomicUsize,
    available: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Lanes {
                lanes: Default::default(),
                closed: false,
            }),
            len: AtomicUsize::new(0),
            available: Notify::new(),
        }
    }

    /// Insert a job and return the handle its outcome will arrive on.
    pub async fn enqueue(
        &self,
        priority: Priority,
        payload: String,
    ) -> Result<ResultHandle, QueueError> {
        let id = Uuid::new_v4();
        let (resolver, handle) = handle::channel(id);

        {
            let mut inner = self.inner.lock().await;
            if inner.closed {
                return Err(QueueError::Closed);
            }
            inner.lanes[priority.index()].push_back(Job {
                id,
                priority,
                payload,
                enqueued_at: Instant::now(),
                resolver,
            });
            self.len.fetch_add(1, Ordering::AcqRel);
        }

        self.available.notify_one();
        Ok(handle)
    }

    /// Wait for the most urgent, oldest job and remove it.
    ///
    /// Returns `None` once the queue has been closed. Cancel-safe: a job is
    /// only removed in the same poll that returns it.
    pub async fn dequeue(&self) -> Option<Job> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent close() is not missed.
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock().await;
                if let Some(job) = inner.pop_next() {
                    self.len.fetch_sub(1, Ordering::AcqRel);
                    return Some(job);
                }
                if inner.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Number of queued, not yet dequeued jobs. Never blocks.
    pub fn size(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Refuse further jobs, wake a waiting `dequeue()` and drop everything
    /// still queued. Callers of dropped jobs observe [`JobError::Abandoned`].
    /// Returns the number of jobs dropped.
    pub async fn close(&self) -> usize {
        let abandoned = {
            let mut inner = self.inner.lock().await;
            inner.closed = true;
            let drained = inner.drain_all();
            self.len.fetch_sub(drained.len(), Ordering::AcqRel);
            drained
        };

        self.available.notify_waiters();

        for job in &abandoned {
            debug!(job_id = %job.id, priority = %job.priority, "dropping queued job at shutdown");
        }
        abandoned.len()
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio_test::{assert_pending, assert_ready};

    async fn push(queue: &JobQueue, level: i64, text: &str) -> ResultHandle {
        queue
            .enqueue(Priority::new(level).unwrap(), text.to_string())
            .await
            .unwrap()
    }

    async fn drain(queue: &JobQueue) -> Vec<(u8, String)> {
        let mut order = Vec::new();
        while !queue.is_empty() {
            let job = queue.dequeue().await.unwrap();
            order.push((job.priority.level(), job.payload));
        }
        order
    }

    #[tokio::test]
    async fn test_mixed_priorities_scenario() {
        let queue = JobQueue::new();
        push(&queue, 3, "a").await;
        push(&queue, 0, "b").await;
        push(&queue, 2, "c").await;
        push(&queue, 0, "d").await;

        assert_eq!(
            drain(&queue).await,
            vec![
                (0, "b".to_string()),
                (0, "d".to_string()),
                (2, "c".to_string()),
                (3, "a".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_order_is_stable_sort_of_insertion() {
        let levels = [2, 1, 3, 1, 0, 2, 3, 0, 1, 2, 0, 3];
        let queue = JobQueue::new();
        let mut expected = Vec::new();
        for (seq, level) in levels.iter().enumerate() {
            push(&queue, *level, &seq.to_string()).await;
            expected.push((*level as u8, seq.to_string()));
        }
        expected.sort_by_key(|(level, _)| *level);

        assert_eq!(drain(&queue).await, expected);
    }

    #[tokio::test]
    async fn test_size_tracks_enqueue_and_dequeue() {
        let queue = JobQueue::new();
        assert_eq!(queue.size(), 0);
        push(&queue, 1, "x").await;
        push(&queue, 1, "y").await;
        assert_eq!(queue.size(), 2);
        queue.dequeue().await.unwrap();
        assert_eq!(queue.size(), 1);
        queue.dequeue().await.unwrap();
        assert_eq!(queue.size(), 0);
    }

    #[tokio::test]
    async fn test_enqueued_at_is_monotonic_within_lane() {
        let queue = JobQueue::new();
        push(&queue, 2, "first").await;
        push(&queue, 2, "second").await;
        let first = queue.dequeue().await.unwrap();
        let second = queue.dequeue().await.unwrap();
        assert!(first.enqueued_at <= second.enqueued_at);
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_a_job() {
        let queue = JobQueue::new();
        let mut dequeue = tokio_test::task::spawn(queue.dequeue());
        assert_pending!(dequeue.poll());

        push(&queue, 3, "late").await;
        assert!(dequeue.is_woken());
        let job = assert_ready!(dequeue.poll()).unwrap();
        assert_eq!(job.payload, "late");
    }

    #[tokio::test]
    async fn test_close_interrupts_waiting_dequeue() {
        let queue = Arc::new(JobQueue::new());
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await.map(|job| job.id) })
        };
        tokio::task::yield_now().await;

        assert_eq!(queue.close().await, 0);
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_close_abandons_queued_jobs() {
        let queue = JobQueue::new();
        let handle = push(&queue, 0, "pending").await;

        assert_eq!(queue.close().await, 1);
        assert_eq!(queue.size(), 0);
        assert!(queue.is_closed().await);
        assert!(matches!(handle.wait().await, Err(JobError::Abandoned)));
        assert_eq!(
            queue.enqueue(Priority::LOW, "too late".into()).await.unwrap_err(),
            QueueError::Closed
        );
    }

    #[tokio::test]
    async fn test_concurrent_enqueues_are_all_delivered() {
        let queue = Arc::new(JobQueue::new());
        let mut tasks = Vec::new();
        for i in 0..64i64 {
            let queue = queue.clone();
            tasks.push(tokio::spawn(async move {
                queue
                    .enqueue(Priority::new(i % 4).unwrap(), i.to_string())
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(queue.size(), 64);

        let order = drain(&queue).await;
        assert_eq!(order.len(), 64);
        assert!(order.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}
