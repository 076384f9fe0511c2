//! JSON extractor that reports rejections through [`ApiError`].

use axum::extract::{FromRequest, Json as AxumJson, Request};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// [`axum::Json`] whose rejections answer with the service's
/// `{"detail": ...}` error body instead of plain text.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AxumJson(value) = <AxumJson<T> as FromRequest<S>>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
