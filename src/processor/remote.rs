//! Remote processor speaking the LibreTranslate HTTP API.
//!
//! `POST {endpoint}/translate` with `{q, source, target, format}` returns
//! `{translatedText}`; errors come back as `{error}` with a non-2xx status.
//! Readiness is established once by probing `GET {endpoint}/languages`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ProcessError, Processor};
use crate::config::ProcessorConfig;

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateReply {
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: String,
}

pub struct RemoteProcessor {
    client: Client,
    endpoint: String,
    source_lang: String,
    target_lang: String,
    device: String,
    ready: AtomicBool,
}

impl RemoteProcessor {
    pub fn new(config: &ProcessorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()
            .context("failed to build HTTP client for translation backend")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
            device: config.device.clone(),
            ready: AtomicBool::new(false),
        })
    }

    /// Check that the backend answers and record the result as readiness.
    pub async fn probe(&self) -> bool {
        let url = format!("{}/languages", self.endpoint);
        let ready = match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(endpoint = %self.endpoint, "translation backend ready");
                true
            }
            Ok(resp) => {
                warn!(endpoint = %self.endpoint, status = %resp.status(), "translation backend not ready");
                false
            }
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "translation backend unreachable");
                false
            }
        };
        self.ready.store(ready, Ordering::Release);
        ready
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Processor for RemoteProcessor {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn device(&self) -> &str {
        &self.device
    }

    async fn process(&self, input: &str) -> Result<String, ProcessError> {
        if !self.is_ready() {
            return Err(ProcessError::Unavailable);
        }

        let request = TranslateRequest {
            q: input,
            source: &self.source_lang,
            target: &self.target_lang,
            format: "text",
        };

        let resp = self
            .client
            .post(format!("{}/translate", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProcessError::Backend(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ProcessError::Backend(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorReply>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(ProcessError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let reply: TranslateReply = serde_json::from_slice(&body)
            .map_err(|e| ProcessError::Malformed(e.to_string()))?;
        debug!(chars_in = input.len(), chars_out = reply.translated_text.len(), "backend translated text");
        Ok(reply.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    /// Minimal LibreTranslate stand-in on an ephemeral port.
    async fn spawn_backend() -> String {
        async fn translate(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
            match body["q"].as_str() {
                Some("hello") => {
                    assert_eq!(body["source"], "en");
                    assert_eq!(body["target"], "fr");
                    (StatusCode::OK, Json(json!({ "translatedText": "bonjour" })))
                }
                Some("garbled") => (StatusCode::OK, Json(json!({ "unexpected": true }))),
                _ => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "unsupported text" })),
                ),
            }
        }

        let app = Router::new()
            .route("/languages", get(|| async { Json(json!([{ "code": "fr" }])) }))
            .route("/translate", post(translate));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn config(endpoint: String) -> ProcessorConfig {
        ProcessorConfig {
            endpoint,
            timeout_sec: 5,
            ..ProcessorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_translate_via_backend() {
        let remote = RemoteProcessor::new(&config(spawn_backend().await)).unwrap();
        assert!(!remote.is_ready());
        assert!(remote.probe().await);
        assert!(!remote.endpoint().ends_with('/'));
        assert_eq!(remote.process("hello").await.unwrap(), "bonjour");
    }

    #[tokio::test]
    async fn test_backend_error_is_reported() {
        let remote = RemoteProcessor::new(&config(spawn_backend().await)).unwrap();
        remote.probe().await;
        match remote.process("???").await {
            Err(ProcessError::Status { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "unsupported text");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_reply() {
        let remote = RemoteProcessor::new(&config(spawn_backend().await)).unwrap();
        remote.probe().await;
        assert!(matches!(
            remote.process("garbled").await,
            Err(ProcessError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_not_ready() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote = RemoteProcessor::new(&config(format!("http://{addr}"))).unwrap();
        assert!(!remote.probe().await);
        assert!(matches!(
            remote.process("hello").await,
            Err(ProcessError::Unavailable)
        ));
    }
}
