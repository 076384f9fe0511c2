//! Job processors: the capability that turns a payload into a translation.
//!
//! The worker owns the only call site, so implementations are never invoked
//! concurrently.

pub mod echo;
pub mod remote;

use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;

use crate::config::{ProcessorBackend, ProcessorConfig};

pub use self::echo::EchoProcessor;
pub use self::remote::RemoteProcessor;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Model not loaded")]
    Unavailable,

    #[error("translation backend unreachable: {0}")]
    Backend(String),

    #[error("translation backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed backend response: {0}")]
    Malformed(String),

    #[error("processor panicked: {0}")]
    Panicked(String),

    /// The worker failed around the processor call.
    #[error("worker fault: {0}")]
    Fault(String),

    #[error("{0}")]
    Other(String),
}

/// Trait for all job processors.
#[async_trait::async_trait]
pub trait Processor: Send + Sync {
    /// Whether the processor can accept work (the "model loaded" flag).
    fn is_ready(&self) -> bool;

    /// Static identifier of where processing runs, reported by `/health`.
    fn device(&self) -> &str;

    /// Translate `input`.
    async fn process(&self, input: &str) -> Result<String, ProcessError>;
}

/// Build the configured processor. The remote backend is probed once; a
/// failed probe leaves it constructed but not ready.
pub async fn from_config(config: &ProcessorConfig) -> Result<Arc<dyn Processor>> {
    match config.backend {
        ProcessorBackend::Echo => {
            tracing::info!(device = %config.device, "using echo processor");
            Ok(Arc::new(EchoProcessor::new(config.device.clone())))
        }
        ProcessorBackend::Remote => {
            let remote = RemoteProcessor::new(config)?;
            remote.probe().await;
            Ok(Arc::new(remote))
        }
    }
}
