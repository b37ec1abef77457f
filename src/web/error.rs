//! Error responses for the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    InvalidQuery,
    InvalidPage,
    InvalidLimit,
    InvalidSort,
    InvalidFilter,
    InvalidTopic,
    SearchUnavailable,
    RenderFailed,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidQuery
            | ApiErrorCode::InvalidPage
            | ApiErrorCode::InvalidLimit
            | ApiErrorCode::InvalidSort
            | ApiErrorCode::InvalidFilter
            | ApiErrorCode::InvalidTopic => StatusCode::BAD_REQUEST,
            ApiErrorCode::SearchUnavailable => StatusCode::BAD_GATEWAY,
            ApiErrorCode::RenderFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Log an upstream failure in full and return a message safe for end users.
pub fn upstream_error(code: ApiErrorCode, context: &str, e: impl std::error::Error) -> ApiError {
    error!(error = %e, source = ?e.source(), "{context} failed");
    ApiError::new(code, format!("{context} failed"))
}
