//! Error responses for the HTTP endpoint.
//!
//! Failures are reported as `{"error": "<message>"}` with the default 200
//! status; clients check for the `error` field. Messages are fixed strings so
//! clients can tell transport failures and decode failures apart.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::upstream::FetchError;

pub const TRANSPORT_ERROR_MESSAGE: &str = "Error occurred while making the GET request.";
pub const DECODE_ERROR_MESSAGE: &str = "Error decoding JSON response.";

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", TRANSPORT_ERROR_MESSAGE)]
    Upstream(#[source] FetchError),

    #[error("{}", DECODE_ERROR_MESSAGE)]
    Decode(#[source] FetchError),
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        if err.is_decode() {
            ApiError::Decode(err)
        } else {
            ApiError::Upstream(err)
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self::new(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let cause = match &self {
            ApiError::Upstream(e) | ApiError::Decode(e) => e,
        };
        tracing::warn!(error = %cause, "Responding with error body");

        Json(ErrorResponse::from(&self)).into_response()
    }
}
