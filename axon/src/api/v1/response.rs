//! # V1 API Response Envelope & Error Contract
//!
//! Every v1 endpoint returns an [`ApiResponse<T>`] envelope:
//!
//! ```json
//! {
//!   "data": { ... },                                          // present on success
//!   "error": { "code": "token_not_found", "message": "..." }  // present on error
//! }
//! ```
//!
//! Streaming chat is the only exception; it answers with server-sent events.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AxonError;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire (e.g. `"token_not_found"`).
/// Each variant maps to a fixed HTTP status code via [`ErrorCode::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing or malformed input: empty question, bad persona key, no files.
    /// HTTP 400.
    InvalidRequest,
    /// No durable record exists for the persona's token id. HTTP 404.
    TokenNotFound,
    /// HTTP 404.
    NotFound,
    /// An upstream provider asked us to back off. HTTP 429.
    RateLimited,
    /// The content gateway, embedding or chat provider failed. HTTP 502.
    UpstreamError,
    /// An upstream call exceeded its time budget. HTTP 504.
    Timeout,
    /// A required provider is not configured. HTTP 503.
    ServiceUnavailable,
    /// An unexpected server-side error occurred. Internal details are never
    /// leaked to the client. HTTP 500.
    InternalError,
}

impl ErrorCode {
    /// Returns the HTTP status code corresponding to this error code.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::TokenNotFound | Self::NotFound => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::TokenNotFound => write!(f, "token_not_found"),
            Self::NotFound => write!(f, "not_found"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::UpstreamError => write!(f, "upstream_error"),
            Self::Timeout => write!(f, "timeout"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

/// Structured error payload within the API envelope.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    /// Machine-readable error classification.
    pub code: ErrorCode,
    /// Human-readable description safe to display to end users.
    pub message: String,
}

/// Canonical v1 API response envelope.
///
/// On success, `data` is present and `error` is absent. On error, `error` is
/// present and `data` is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// HTTP status to use in the response. Not serialized on the wire.
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success response with data (HTTP 200).
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(_) => {
                let body = serde_json::json!({
                    "error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

fn rate_limit_message(retry_after: Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!("Rate limit exceeded, retry after {secs} seconds"),
        None => "Rate limit exceeded. Please try again later.".to_string(),
    }
}

impl<T: Serialize> From<AxonError> for ApiResponse<T> {
    /// Convert an [`AxonError`] into a v1 [`ApiResponse`].
    ///
    /// Upstream and internal failures get a generic message; the real error
    /// is logged via `tracing::error!`.
    fn from(err: AxonError) -> Self {
        match err {
            AxonError::Validation(ref msg) => {
                ApiResponse::error(ErrorCode::InvalidRequest, msg.clone())
            }

            AxonError::InvalidPersonaKey(_) => {
                ApiResponse::error(ErrorCode::InvalidRequest, err.to_string())
            }

            AxonError::Json(ref e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid JSON: {e}"))
            }

            AxonError::UrlParse(ref e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid URL: {e}"))
            }

            AxonError::TokenNotFound(ref token_id) => ApiResponse::error(
                ErrorCode::TokenNotFound,
                format!("Persona token {token_id} not found"),
            ),

            AxonError::NotFound(ref msg) => ApiResponse::error(ErrorCode::NotFound, msg.clone()),

            AxonError::ApiRateLimit { retry_after } | AxonError::LlmRateLimit { retry_after } => {
                tracing::warn!(error = %err, "Upstream rate limit");
                ApiResponse::error(ErrorCode::RateLimited, rate_limit_message(retry_after))
            }

            AxonError::Timeout(ref msg) => {
                tracing::error!(error = %msg, "Upstream timeout");
                ApiResponse::error(ErrorCode::Timeout, "An upstream service timed out")
            }

            AxonError::Gateway(ref msg) => {
                tracing::error!(error = %msg, "Content gateway failure");
                ApiResponse::error(
                    ErrorCode::UpstreamError,
                    "Failed to fetch persona data from content storage",
                )
            }

            ref upstream @ (AxonError::Embedding(_)
            | AxonError::Llm(_)
            | AxonError::Http(_)
            | AxonError::ApiAuth(_)) => {
                tracing::error!(error = %upstream, "Upstream provider failure");
                ApiResponse::error(ErrorCode::UpstreamError, "An upstream provider failed")
            }

            AxonError::LlmUnavailable(ref msg) => {
                ApiResponse::error(ErrorCode::ServiceUnavailable, msg.clone())
            }

            ref internal @ (AxonError::Config(_)
            | AxonError::Database(_)
            | AxonError::Processing(_)
            | AxonError::Io(_)
            | AxonError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to v1 response");
                ApiResponse::error(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}
