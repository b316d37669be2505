use std::time::Duration;

use secrecy::SecretString;

use crate::checkout::{LiveCheckoutClient, LiveCheckoutClientConfig};
use crate::error::{GrantwayError, Result};
use crate::webhooks::SignatureVerifier;

/// Default allowed clock skew for inbound webhook timestamps.
const DEFAULT_TIMESTAMP_TOLERANCE: Duration = Duration::from_secs(5 * 60);

/// Main configuration for a Grantway integration.
///
/// The only state the crate needs: a shared secret for verifying inbound
/// webhooks, and (when the checkout collaborator is used) an access token
/// and base URL for the remote billing API. Secrets are held in
/// [`SecretString`] and won't be exposed in debug output.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret for webhook signature verification.
    pub webhook_secret: SecretString,
    /// Access token for the remote billing API (checkout collaborator).
    pub access_token: Option<SecretString>,
    /// Base URL of the remote billing API.
    pub api_base_url: Option<String>,
    /// Allowed clock skew for the webhook timestamp header.
    pub timestamp_tolerance: Duration,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Build a configuration from `GRANTWAY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::builder().from_env().build()
    }

    /// A signature verifier using this configuration's secret and tolerance.
    #[must_use]
    pub fn verifier(&self) -> SignatureVerifier {
        SignatureVerifier::new(self.webhook_secret.clone())
            .with_tolerance(self.timestamp_tolerance)
    }

    /// A live checkout client using this configuration's token and base URL.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the access token or base URL is
    /// missing or invalid.
    pub fn checkout_client(&self) -> Result<LiveCheckoutClient> {
        let token = self.access_token.clone().ok_or_else(|| {
            GrantwayError::Config("access token is required for the checkout client".to_string())
        })?;
        let base_url = self.api_base_url.clone().ok_or_else(|| {
            GrantwayError::Config("API base URL is required for the checkout client".to_string())
        })?;

        LiveCheckoutClient::new(token, LiveCheckoutClientConfig::new(base_url))
    }
}

/// Builder for [`Config`] with environment variable support.
#[must_use = "builder does nothing until you call build()"]
#[derive(Default)]
pub struct ConfigBuilder {
    webhook_secret: Option<SecretString>,
    access_token: Option<SecretString>,
    api_base_url: Option<String>,
    timestamp_tolerance: Option<Duration>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<SecretString>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<SecretString>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn with_timestamp_tolerance(mut self, tolerance: Duration) -> Self {
        self.timestamp_tolerance = Some(tolerance);
        self
    }

    /// Layer in `GRANTWAY_*` environment variables.
    ///
    /// Recognized: `GRANTWAY_WEBHOOK_SECRET`, `GRANTWAY_ACCESS_TOKEN`,
    /// `GRANTWAY_API_BASE_URL`, `GRANTWAY_TIMESTAMP_TOLERANCE_SECS`.
    /// Explicitly set values take precedence over the environment.
    pub fn from_env(mut self) -> Self {
        if self.webhook_secret.is_none() {
            if let Ok(secret) = std::env::var("GRANTWAY_WEBHOOK_SECRET") {
                self.webhook_secret = Some(secret.into());
            }
        }
        if self.access_token.is_none() {
            if let Ok(token) = std::env::var("GRANTWAY_ACCESS_TOKEN") {
                self.access_token = Some(token.into());
            }
        }
        if self.api_base_url.is_none() {
            if let Ok(url) = std::env::var("GRANTWAY_API_BASE_URL") {
                self.api_base_url = Some(url);
            }
        }
        if self.timestamp_tolerance.is_none() {
            if let Some(secs) = std::env::var("GRANTWAY_TIMESTAMP_TOLERANCE_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
            {
                self.timestamp_tolerance = Some(Duration::from_secs(secs));
            }
        }
        self
    }

    /// # Errors
    ///
    /// Returns a configuration error when no webhook secret was provided.
    pub fn build(self) -> Result<Config> {
        let webhook_secret = self.webhook_secret.ok_or_else(|| {
            GrantwayError::Config(
                "webhook secret is required (set GRANTWAY_WEBHOOK_SECRET or call with_webhook_secret)"
                    .to_string(),
            )
        })?;

        Ok(Config {
            webhook_secret,
            access_token: self.access_token,
            api_base_url: self.api_base_url,
            timestamp_tolerance: self.timestamp_tolerance.unwrap_or(DEFAULT_TIMESTAMP_TOLERANCE),
        })
    }
}
