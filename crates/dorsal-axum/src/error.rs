//! HTTP mapping of allocator errors.
//!
//! - `InvalidPartitionKey`: 400, the request itself is wrong.
//! - `ContentionExhausted`, `StorageUnavailable`: 503 with `Retry-After`, the
//!   registration can simply be retried.
//! - `SequenceExhausted`: 409, retrying will never help.
//!
//! Transient failures share one message; the cause is logged, not returned.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

pub const RETRY_MESSAGE: &str = "registration temporarily unavailable, please retry";

#[derive(Debug)]
pub struct ApiError(pub dorsal::Error);

impl From<dorsal::Error> for ApiError {
    fn from(err: dorsal::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = if self.0.is_retryable() {
            tracing::warn!(error = %self.0, "allocation failed");
            (StatusCode::SERVICE_UNAVAILABLE, RETRY_MESSAGE.to_owned())
        } else {
            let status = match &self.0 {
                dorsal::Error::SequenceExhausted { .. } => StatusCode::CONFLICT,
                dorsal::Error::InvalidPartitionKey { .. } => StatusCode::BAD_REQUEST,
                _ => {
                    tracing::error!(error = %self.0, "unexpected allocation failure");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, self.0.to_string())
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}
