//! Identity processor for local development and smoke tests.

use super::{ProcessError, Processor};

pub struct EchoProcessor {
    device: String,
}

impl EchoProcessor {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl Default for EchoProcessor {
    fn default() -> Self {
        Self::new("cpu")
    }
}

#[async_trait::async_trait]
impl Processor for EchoProcessor {
    fn is_ready(&self) -> bool {
        true
    }

    fn device(&self) -> &str {
        &self.device
    }

    async fn process(&self, input: &str) -> Result<String, ProcessError> {
        Ok(input.to_string())
    }
}
