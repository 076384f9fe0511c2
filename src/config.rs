//! TOML configuration for the mtqueue service.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! runnable service. The file is located through, in order, an explicit
//! path, the `MTQUEUE_CONFIG` environment variable and
//! `/etc/mtqueue/mtqueue.toml`.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "MTQUEUE_CONFIG";

/// Standard system location of the configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/mtqueue/mtqueue.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the service process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded service configuration");
        Ok(config)
    }

    /// Resolve the configuration: an explicit path must load, otherwise
    /// `MTQUEUE_CONFIG`, then the system path, then compiled-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "MTQUEUE_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;
        if self.server.request_timeout_sec == 0 {
            anyhow::bail!("server.request_timeout_sec must be greater than zero");
        }
        if self.processor.timeout_sec == 0 {
            anyhow::bail!("processor.timeout_sec must be greater than zero");
        }
        if self.metrics.buckets.is_empty() {
            anyhow::bail!("metrics.buckets must not be empty");
        }
        if self.metrics.buckets.windows(2).any(|w| w[0] >= w[1]) {
            anyhow::bail!("metrics.buckets must be strictly increasing");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP listener and request lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port for the HTTP listener.
    pub listen_address: String,
    /// How long a caller waits for its job's outcome before giving up.
    pub request_timeout_sec: u64,
    /// How long an in-flight job may keep running once shutdown starts.
    pub shutdown_grace_sec: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8000".to_string(),
            request_timeout_sec: 300,
            shutdown_grace_sec: 10,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_address
            .parse()
            .with_context(|| format!("invalid listen address '{}'", self.listen_address))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_sec)
    }
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Which job processor the worker drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorBackend {
    /// LibreTranslate-compatible HTTP backend.
    Remote,
    /// Returns the input unchanged.
    Echo,
}

/// Translation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub backend: ProcessorBackend,
    /// Base URL of the remote backend.
    pub endpoint: String,
    pub source_lang: String,
    pub target_lang: String,
    /// Per-call timeout for the remote backend (seconds).
    pub timeout_sec: u64,
    /// Identifier reported as `device` by `/health`.
    pub device: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            backend: ProcessorBackend::Remote,
            endpoint: "http://127.0.0.1:5000".to_string(),
            source_lang: "en".to_string(),
            target_lang: "fr".to_string(),
            timeout_sec: 60,
            device: "remote".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Histogram configuration shared by the latency, queue-time and
/// processing-time histograms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Upper bounds (seconds) of the histogram buckets.
    pub buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            buckets: prometheus::DEFAULT_BUCKETS.to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging configuration. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
