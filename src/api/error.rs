//! HTTP error mapping for the service boundary.

use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::processor::ProcessError;
use crate::queue::{JobError, PriorityError, QueueError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The processor is not ready; no job was created.
    #[error("Model not loaded")]
    ModelNotLoaded,

    /// The request body could not be read as the expected JSON.
    #[error("{message}")]
    InvalidBody { status: StatusCode, message: String },

    #[error(transparent)]
    InvalidPriority(#[from] PriorityError),

    /// The processor failed on this job.
    #[error("{0}")]
    Processing(ProcessError),

    /// The queue is closed or the job was dropped during shutdown.
    #[error("service is shutting down")]
    ShuttingDown,

    #[error("no result within {}s", .0.as_secs())]
    Timeout(Duration),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Closed => ApiError::ShuttingDown,
        }
    }
}

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::Failed(e) => ApiError::Processing(e),
            JobError::Abandoned => ApiError::ShuttingDown,
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ModelNotLoaded | ApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidBody { status, .. } => *status,
            ApiError::InvalidPriority(_) => StatusCode::BAD_REQUEST,
            ApiError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": self.to_string() }));
        (self.status(), body).into_response()
    }
}
