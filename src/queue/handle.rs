//! Single-resolution result delivery between the worker and a waiting caller.
//!
//! [`channel`] creates a connected pair: the [`Resolver`] travels with the job
//! into the queue and is consumed by the worker, the [`ResultHandle`] stays
//! with the submitting caller. Consuming `self` on both sides makes "resolved
//! exactly once" and "awaited exactly once" a property of the types.

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use super::Translation;
use crate::processor::ProcessError;

/// What the worker produces for a single job.
pub type Outcome = Result<Translation, ProcessError>;

/// Why a caller did not receive a translation.
#[derive(Debug, Error)]
pub enum JobError {
    /// The processor failed while handling the job.
    #[error(transparent)]
    Failed(#[from] ProcessError),

    /// The job was dropped without an outcome (worker stopped or shutdown
    /// discarded the queue).
    #[error("job was abandoned before it produced a result")]
    Abandoned,
}

/// Create a connected resolver/handle pair for `job_id`.
pub fn channel(job_id: Uuid) -> (Resolver, ResultHandle) {
    let (tx, rx) = oneshot::channel();
    (Resolver { job_id, tx }, ResultHandle { job_id, rx })
}

/// Writing half, owned by the job.
#[derive(Debug)]
pub struct Resolver {
    job_id: Uuid,
    tx: oneshot::Sender<Outcome>,
}

impl Resolver {
    /// Deliver the outcome. Returns `false` if the caller already stopped
    /// waiting, in which case the outcome is discarded.
    pub fn resolve(self, outcome: Outcome) -> bool {
        match self.tx.send(outcome) {
            Ok(()) => true,
            Err(_) => {
                debug!(job_id = %self.job_id, "caller no longer waiting, outcome discarded");
                false
            }
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }
}

/// Reading half, returned to the submitting caller.
#[derive(Debug)]
pub struct ResultHandle {
    job_id: Uuid,
    rx: oneshot::Receiver<Outcome>,
}

impl ResultHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Suspend until the worker resolves the job.
    ///
    /// Dropping the returned future (e.g. on a request timeout) is safe: the
    /// worker's later resolution becomes a no-op.
    pub async fn wait(self) -> Result<Translation, JobError> {
        match self.rx.await {
            Ok(Ok(translation)) => Ok(translation),
            Ok(Err(e)) => Err(JobError::Failed(e)),
            Err(_) => Err(JobError::Abandoned),
        }
    }
}
