//! Webhook-specific error types.
//!
//! Distinguishes authentication rejections (which the endpoint surfaces as
//! `403 {"received": false}` so the remote service knows the delivery was
//! refused) from payload errors (plain client errors for a single event).

use std::fmt;

/// Errors raised while authenticating and decoding an inbound webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// A required webhook header is absent, empty, or not valid UTF-8.
    MissingHeader { name: &'static str },
    /// No transmitted signature matches the one computed over the payload.
    SignatureInvalid,
    /// The timestamp header deviates from current time beyond the allowed
    /// skew (replay attack protection).
    TimestampOutOfTolerance { age_seconds: i64 },
    /// The verified body is not a well-formed event payload.
    MalformedPayload { message: String },
}

impl fmt::Display for WebhookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeader { name } => {
                write!(f, "Missing required webhook header '{}'", name)
            }
            Self::SignatureInvalid => {
                write!(f, "Invalid webhook signature")
            }
            Self::TimestampOutOfTolerance { age_seconds } => {
                write!(f, "Webhook timestamp out of tolerance ({} seconds old)", age_seconds)
            }
            Self::MalformedPayload { message } => {
                write!(f, "Malformed webhook payload: {}", message)
            }
        }
    }
}

impl std::error::Error for WebhookError {}

impl WebhookError {
    /// Whether this error means the request failed authentication.
    ///
    /// Authentication failures are surfaced to the remote service as a 403
    /// rejection; they must never reach the decoder or the callback layer.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::MissingHeader { .. }
                | Self::SignatureInvalid
                | Self::TimestampOutOfTolerance { .. }
        )
    }

    /// Check if this is a client error (4xx). All webhook errors are scoped
    /// to a single request.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        true
    }
}
