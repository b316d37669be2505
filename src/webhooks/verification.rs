//! Webhook signature verification.
//!
//! Implements the versioned HMAC-SHA256 scheme used by signed-webhook
//! providers: the signature is computed over `{id}.{timestamp}.{body}` and
//! transmitted base64-encoded in a `webhook-signature` header alongside
//! `webhook-id` and `webhook-timestamp`. Verification must precede decoding;
//! [`Event::decode`](crate::webhooks::Event::decode) only accepts the
//! [`VerifiedPayload`] token this module mints.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the unique message id.
pub const WEBHOOK_ID_HEADER: &str = "webhook-id";
/// Header carrying the unix-seconds send timestamp.
pub const WEBHOOK_TIMESTAMP_HEADER: &str = "webhook-timestamp";
/// Header carrying the space-separated list of versioned signatures.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "webhook-signature";

/// Conventional prefix on shared webhook secrets.
const SECRET_PREFIX: &str = "whsec_";
/// The only signature version this verifier produces or accepts.
const SIGNATURE_VERSION: &str = "v1";
/// Default allowed clock skew for the timestamp header.
const DEFAULT_TOLERANCE: Duration = Duration::from_secs(5 * 60);

/// The signed-webhook headers of an inbound request.
#[derive(Debug, Clone, Copy)]
pub struct WebhookHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

impl<'a> WebhookHeaders<'a> {
    /// Extract the three required webhook headers from a header map.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::MissingHeader`] when any header is absent,
    /// empty, or not valid UTF-8.
    pub fn from_header_map(headers: &'a HeaderMap) -> Result<Self, WebhookError> {
        let get = |name: &'static str| -> Result<&'a str, WebhookError> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .ok_or(WebhookError::MissingHeader { name })
        };

        Ok(Self {
            id: get(WEBHOOK_ID_HEADER)?,
            timestamp: get(WEBHOOK_TIMESTAMP_HEADER)?,
            signature: get(WEBHOOK_SIGNATURE_HEADER)?,
        })
    }
}

/// Proof that a raw body passed signature verification.
///
/// Only [`SignatureVerifier`] can construct this, which makes
/// "decode before verify" unrepresentable: the decoder takes a
/// `&VerifiedPayload`, not raw bytes.
#[derive(Debug, Clone, Copy)]
pub struct VerifiedPayload<'a> {
    body: &'a [u8],
}

impl<'a> VerifiedPayload<'a> {
    /// The verified raw body.
    #[must_use]
    pub fn body(&self) -> &'a [u8] {
        self.body
    }
}

/// Verifies (and signs) webhook payloads with a shared secret.
///
/// # Example
///
/// ```rust,ignore
/// use grantway::webhooks::{SignatureVerifier, WebhookHeaders};
///
/// let verifier = SignatureVerifier::new("whsec_your_secret_here");
///
/// let verified = verifier.verify(body, &WebhookHeaders::from_header_map(&headers)?)?;
/// let event = Event::decode(&verified)?;
/// ```
pub struct SignatureVerifier {
    key: Vec<u8>,
    tolerance: Duration,
}

impl SignatureVerifier {
    /// Create a verifier from the shared secret.
    ///
    /// The conventional `whsec_` prefix is stripped and the remainder
    /// base64-decoded to obtain the signing key; secrets that are not valid
    /// base64 are used as raw bytes.
    #[must_use]
    pub fn new(secret: impl Into<SecretString>) -> Self {
        let secret: SecretString = secret.into();
        Self {
            key: decode_secret(secret.expose_secret()),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Override the allowed timestamp skew (default 5 minutes).
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sign a payload, producing a `v1,{base64}` signature entry.
    ///
    /// Useful for tests and for emitting webhooks with the same scheme.
    #[must_use]
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> String {
        let mac = self.compute(id, &timestamp.to_string(), body);
        format!("{},{}", SIGNATURE_VERSION, BASE64.encode(mac))
    }

    /// Verify a payload against the supplied headers at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::SignatureInvalid`] when no transmitted `v1`
    /// signature matches, or [`WebhookError::TimestampOutOfTolerance`] when
    /// the timestamp header is outside the allowed skew.
    pub fn verify<'a>(
        &self,
        body: &'a [u8],
        headers: &WebhookHeaders<'_>,
    ) -> Result<VerifiedPayload<'a>, WebhookError> {
        self.verify_at(body, headers, SystemTime::now())
    }

    /// Verify a payload as of an explicit point in time.
    ///
    /// Pure function of its inputs; `verify` is this with `now` supplied.
    pub fn verify_at<'a>(
        &self,
        body: &'a [u8],
        headers: &WebhookHeaders<'_>,
        now: SystemTime,
    ) -> Result<VerifiedPayload<'a>, WebhookError> {
        // Replay guard first: a stale message is rejected before any MAC work
        let timestamp: i64 = headers
            .timestamp
            .parse()
            .map_err(|_| WebhookError::SignatureInvalid)?;

        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let age_seconds = now_secs - timestamp;
        if age_seconds.unsigned_abs() > self.tolerance.as_secs() {
            return Err(WebhookError::TimestampOutOfTolerance { age_seconds });
        }

        let expected = self.compute(headers.id, headers.timestamp, body);

        // The header may carry several space-separated versioned signatures
        // (e.g. during secret rotation); any matching v1 entry verifies.
        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, encoded)| BASE64.decode(encoded).ok())
            .any(|candidate| constant_time_compare(&expected, &candidate));

        if matched {
            Ok(VerifiedPayload { body })
        } else {
            tracing::debug!(
                target: "grantway::webhooks",
                webhook_id = headers.id,
                "Webhook signature verification failed"
            );
            Err(WebhookError::SignatureInvalid)
        }
    }

    /// Compute the HMAC-SHA256 over `{id}.{timestamp}.{body}`.
    fn compute(&self, id: &str, timestamp: &str, body: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Derive the signing key from the shared secret string.
fn decode_secret(secret: &str) -> Vec<u8> {
    let trimmed = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
    BASE64
        .decode(trimmed)
        .unwrap_or_else(|_| trimmed.as_bytes().to_vec())
}

/// Constant-time comparison to prevent timing attacks.
///
/// Uses the `subtle` crate which provides compiler-optimization-resistant
/// constant-time operations, preventing attackers from guessing valid
/// signatures byte-by-byte from response timing.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
