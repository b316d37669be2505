use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::entitlements::DispatchError;
use crate::webhooks::WebhookError;

/// The main error type for Grantway operations
#[derive(Debug, thiserror::Error)]
pub enum GrantwayError {
    /// Inbound webhook could not be authenticated or decoded.
    #[error(transparent)]
    Webhook(#[from] WebhookError),

    /// One or more entitlement callbacks failed during dispatch.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request timeout")]
    RequestTimeout,

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Standard error response body for non-2xx responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl GrantwayError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Webhook(e) if e.is_authentication() => StatusCode::FORBIDDEN,
            Self::Webhook(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Dispatch(_) | Self::Config(_) | Self::Internal(_) | Self::Anyhow(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
        }
    }

    /// Returns an error message safe for client responses.
    ///
    /// Client errors (4xx) expose the actual message since the caller needs
    /// to know what went wrong. Server errors (5xx) return a generic message
    /// to prevent information disclosure; full details are logged
    /// server-side.
    fn safe_message(&self) -> String {
        match self {
            Self::Webhook(_) | Self::BadRequest(_) | Self::RequestTimeout => self.to_string(),
            Self::Dispatch(_) => "Event dispatch failed".to_string(),
            Self::Config(_) | Self::Internal(_) | Self::Anyhow(_) => {
                "Internal server error".to_string()
            }
            Self::ServiceUnavailable(_) => "Service unavailable".to_string(),
        }
    }
}

impl IntoResponse for GrantwayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Full error message goes to the server logs, not the client
        tracing::error!(
            status = status.as_u16(),
            error = %self,
            "Request failed"
        );

        let body = Json(ErrorResponse {
            error: self.safe_message(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for Grantway operations
pub type Result<T> = std::result::Result<T, GrantwayError>;

// Common error type conversions

impl From<serde_json::Error> for GrantwayError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            GrantwayError::BadRequest(format!("JSON error: {}", err))
        } else {
            GrantwayError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}

impl From<reqwest::Error> for GrantwayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GrantwayError::RequestTimeout
        } else if err.is_connect() {
            GrantwayError::ServiceUnavailable(format!("Connection error: {}", err))
        } else {
            GrantwayError::Internal(format!("Request error: {}", err))
        }
    }
}
