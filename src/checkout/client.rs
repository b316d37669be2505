//! Remote checkout API client.
//!
//! The outbound half of the integration: a single "create checkout session"
//! call against the billing service's REST API. The trait keeps endpoint
//! code testable; the live client carries the access token securely and
//! maps remote failures onto the crate error taxonomy.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{GrantwayError, Result};

/// Parameters for creating a checkout session.
///
/// Mirrors the remote API's wire format; everything is optional except that
/// callers must supply `product_id` or `product_price_id` (enforced at the
/// endpoint, not here; the remote API owns final validation).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateCheckoutRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_price_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_billing_address: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_discount_codes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A checkout session issued by the remote service.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Remote session id.
    pub id: String,
    /// Hosted checkout page to redirect the customer to.
    pub url: String,
}

/// Trait for the remote checkout operation.
#[async_trait]
pub trait CheckoutClient: Send + Sync {
    /// Create a checkout session.
    async fn create_checkout(&self, request: CreateCheckoutRequest) -> Result<CheckoutSession>;
}

#[async_trait]
impl<C: CheckoutClient> CheckoutClient for std::sync::Arc<C> {
    async fn create_checkout(&self, request: CreateCheckoutRequest) -> Result<CheckoutSession> {
        (**self).create_checkout(request).await
    }
}

/// Error returned by the remote checkout API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutApiError {
    /// HTTP status of the remote response, when one was received.
    pub status: Option<u16>,
    pub message: String,
}

impl fmt::Display for CheckoutApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checkout API error: {}", self.message)?;
        if let Some(status) = self.status {
            write!(f, " [HTTP {}]", status)?;
        }
        Ok(())
    }
}

impl std::error::Error for CheckoutApiError {}

impl From<CheckoutApiError> for GrantwayError {
    fn from(err: CheckoutApiError) -> Self {
        match err.status {
            Some(400..=499) => GrantwayError::BadRequest(err.to_string()),
            _ => GrantwayError::Internal(err.to_string()),
        }
    }
}

/// Configuration for the live checkout client.
#[derive(Debug, Clone)]
pub struct LiveCheckoutClientConfig {
    /// Base URL of the remote billing API (no trailing slash needed).
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl LiveCheckoutClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_seconds: 30,
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// Validate the remote access token before storing it.
fn validate_access_token(token: &str) -> std::result::Result<(), String> {
    const MIN_TOKEN_LENGTH: usize = 8;

    if token.is_empty() {
        return Err("access token cannot be empty".to_string());
    }
    if token.len() < MIN_TOKEN_LENGTH {
        return Err(format!(
            "access token too short (minimum {} characters)",
            MIN_TOKEN_LENGTH
        ));
    }
    Ok(())
}

/// Live checkout client for production use.
///
/// The access token is held in a [`SecretString`] and won't be exposed in
/// debug output; remote failures are mapped through [`CheckoutApiError`].
#[derive(Debug)]
pub struct LiveCheckoutClient {
    http: reqwest::Client,
    base_url: String,
    access_token: SecretString,
}

impl LiveCheckoutClient {
    /// Create a new live client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the access token is structurally
    /// invalid or the HTTP client cannot be constructed.
    pub fn new(
        access_token: impl Into<SecretString>,
        config: LiveCheckoutClientConfig,
    ) -> Result<Self> {
        let access_token: SecretString = access_token.into();
        validate_access_token(access_token.expose_secret()).map_err(GrantwayError::Config)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GrantwayError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }
}

#[async_trait]
impl CheckoutClient for LiveCheckoutClient {
    async fn create_checkout(&self, request: CreateCheckoutRequest) -> Result<CheckoutSession> {
        let url = format!("{}/v1/checkouts/", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                target: "grantway::checkout",
                status = status.as_u16(),
                body = %body,
                "Checkout API rejected request"
            );
            return Err(CheckoutApiError {
                status: Some(status.as_u16()),
                message: "create checkout session failed".to_string(),
            }
            .into());
        }

        let session: CheckoutSession = response.json().await?;
        Ok(session)
    }
}

/// Mock checkout client for testing.
#[cfg(any(test, feature = "test-client"))]
pub mod test {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Records requests and issues deterministic session URLs.
    #[derive(Default)]
    pub struct MockCheckoutClient {
        session_counter: AtomicU64,
        requests: Mutex<Vec<CreateCheckoutRequest>>,
        fail_with_status: Option<u16>,
    }

    impl MockCheckoutClient {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// A mock that fails every call with the given remote status.
        #[must_use]
        pub fn failing(status: u16) -> Self {
            Self {
                fail_with_status: Some(status),
                ..Self::default()
            }
        }

        /// The requests recorded so far, in call order.
        #[must_use]
        pub fn requests(&self) -> Vec<CreateCheckoutRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CheckoutClient for MockCheckoutClient {
        async fn create_checkout(&self, request: CreateCheckoutRequest) -> Result<CheckoutSession> {
            if let Some(status) = self.fail_with_status {
                return Err(CheckoutApiError {
                    status: Some(status),
                    message: "mock failure".to_string(),
                }
                .into());
            }

            self.requests.lock().unwrap().push(request);
            let id = format!(
                "co_test_{}",
                self.session_counter.fetch_add(1, Ordering::SeqCst)
            );
            Ok(CheckoutSession {
                url: format!("https://checkout.example.com/c/{}", id),
                id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_only_set_fields() {
        let request = CreateCheckoutRequest {
            product_id: Some("prod_1".to_string()),
            metadata: Some(serde_json::json!({"foo": "bar"})),
            ..Default::default()
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["product_id"], "prod_1");
        assert_eq!(json["metadata"]["foo"], "bar");
        assert!(json.get("customer_email").is_none());
        assert!(json.get("allow_discount_codes").is_none());
    }

    #[test]
    fn test_api_error_display() {
        let err = CheckoutApiError {
            status: Some(422),
            message: "create checkout session failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Checkout API error: create checkout session failed [HTTP 422]"
        );
    }

    #[test]
    fn test_api_error_maps_by_status() {
        let err: GrantwayError = CheckoutApiError {
            status: Some(422),
            message: "bad".to_string(),
        }
        .into();
        assert!(matches!(err, GrantwayError::BadRequest(_)));

        let err: GrantwayError = CheckoutApiError {
            status: Some(502),
            message: "bad".to_string(),
        }
        .into();
        assert!(matches!(err, GrantwayError::Internal(_)));
    }

    #[test]
    fn test_live_client_rejects_empty_token() {
        let result =
            LiveCheckoutClient::new("", LiveCheckoutClientConfig::new("https://api.example.com"));
        assert!(matches!(result.unwrap_err(), GrantwayError::Config(_)));
    }

    #[test]
    fn test_live_client_rejects_short_token() {
        let result = LiveCheckoutClient::new(
            "short",
            LiveCheckoutClientConfig::new("https://api.example.com"),
        );
        assert!(matches!(result.unwrap_err(), GrantwayError::Config(_)));
    }

    #[test]
    fn test_live_client_trims_base_url() {
        let client = LiveCheckoutClient::new(
            "token_long_enough",
            LiveCheckoutClientConfig::new("https://api.example.com/"),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let client = test::MockCheckoutClient::new();

        let session = client
            .create_checkout(CreateCheckoutRequest {
                product_id: Some("prod_1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(session.id.starts_with("co_test_"));
        assert!(session.url.contains("checkout.example.com"));

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].product_id.as_deref(), Some("prod_1"));
    }
}
