//! API route definitions.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use tokio::time::Instant;
use tracing::{info, warn};

use super::error::ApiError;
use super::extract::ApiJson;
use super::state::AppState;
use crate::queue::{Priority, PriorityError, Translation};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/translate", post(translate))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    /// Any JSON number is accepted here; range checking happens in the
    /// handler so every bad priority gets the same 400.
    #[serde(default = "default_priority")]
    pub priority: Number,
}

fn default_priority() -> Number {
    Number::from(Priority::NORMAL.level())
}

fn parse_priority(raw: &Number) -> Result<Priority, PriorityError> {
    let level = raw.as_i64().ok_or_else(|| PriorityError {
        got: raw.to_string(),
    })?;
    Priority::try_from(level)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub original_text: String,
    pub translated_text: String,
    pub priority: u8,
    /// Seconds.
    pub processing_time: f64,
    /// Seconds.
    pub queued_time: f64,
    pub model_loaded: bool,
}

impl From<Translation> for TranslateResponse {
    fn from(t: Translation) -> Self {
        Self {
            original_text: t.original_text,
            translated_text: t.translated_text,
            priority: t.priority.level(),
            processing_time: t.processing_time.as_secs_f64(),
            queued_time: t.queued_time.as_secs_f64(),
            model_loaded: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub device: String,
    pub queue_size: usize,
}

async fn translate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TranslateRequest>,
) -> Result<Json<TranslateResponse>, ApiError> {
    if !state.processor.is_ready() {
        return Err(ApiError::ModelNotLoaded);
    }
    let priority = parse_priority(&req.priority)?;

    let submitted = Instant::now();
    state.metrics.record_submission(priority);
    let handle = state.queue.enqueue(priority, req.text).await?;
    info!(
        job_id = %handle.job_id(),
        priority = priority.level(),
        queue_size = state.queue.size(),
        "enqueued job"
    );

    let job_id = handle.job_id();
    let outcome = tokio::time::timeout(state.request_timeout, handle.wait()).await;
    state.metrics.observe_latency(priority, submitted.elapsed());

    match outcome {
        Ok(result) => Ok(Json(result?.into())),
        Err(_) => {
            warn!(job_id = %job_id, "request timed out waiting for job outcome");
            Err(ApiError::Timeout(state.request_timeout))
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: state.processor.is_ready(),
        device: state.processor.device().to_string(),
        queue_size: state.queue.size(),
    })
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        state.metrics.render(),
    )
}
