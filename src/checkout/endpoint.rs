//! Checkout redirect endpoint.
//!
//! A GET route that forwards its query parameters to the remote "create
//! checkout" API and answers with a `302` redirect to the issued checkout
//! URL. Query parameters arrive camelCase (the remote service's convention
//! for redirect links); JSON-valued parameters (`customerBillingAddress`,
//! `customerMetadata`, `metadata`) are decoded before forwarding.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::client::{CheckoutClient, CreateCheckoutRequest};

/// The literal token the remote service replaces with the real session id.
const CHECKOUT_ID_TOKEN: &str = "{CHECKOUT_ID}";

/// Configuration for the checkout redirect endpoint.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Where the remote service sends the customer after payment. A
    /// `successUrl` query parameter overrides this per request.
    pub success_url: Option<String>,
    /// Append a `checkoutId={CHECKOUT_ID}` parameter to the success URL so
    /// the landing page can look the session up.
    pub include_checkout_id: bool,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            success_url: None,
            include_checkout_id: true,
        }
    }
}

/// Builder for the checkout redirect route.
///
/// # Example
///
/// ```rust,ignore
/// use grantway::checkout::{CheckoutEndpoint, LiveCheckoutClient, LiveCheckoutClientConfig};
///
/// let client = LiveCheckoutClient::new(
///     config.access_token.clone(),
///     LiveCheckoutClientConfig::new("https://api.billing.example"),
/// )?;
///
/// let app = axum::Router::new().nest(
///     "/checkout",
///     CheckoutEndpoint::new(client)
///         .with_success_url("https://app.example.com/purchase/complete")
///         .into_router(),
/// );
/// ```
#[must_use = "an endpoint does nothing until turned into a router"]
pub struct CheckoutEndpoint<C> {
    client: C,
    config: CheckoutConfig,
}

impl<C: CheckoutClient + Send + Sync + 'static> CheckoutEndpoint<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            config: CheckoutConfig::default(),
        }
    }

    /// Set the default success URL.
    pub fn with_success_url(mut self, url: impl Into<String>) -> Self {
        self.config.success_url = Some(url.into());
        self
    }

    /// Enable or disable the `checkoutId` parameter on the success URL.
    pub fn include_checkout_id(mut self, include: bool) -> Self {
        self.config.include_checkout_id = include;
        self
    }

    /// Build a router serving the endpoint at `/`.
    pub fn into_router(self) -> Router {
        self.into_router_at("/")
    }

    /// Build a router serving the endpoint at `path`.
    pub fn into_router_at(self, path: &str) -> Router {
        Router::new()
            .route(path, get(handle_checkout::<C>))
            .with_state(Arc::new(self))
    }
}

/// Redirect-link query parameters, camelCase on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutQuery {
    pub product_id: Option<String>,
    pub product_price_id: Option<String>,
    pub success_url: Option<String>,
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    /// JSON-encoded object.
    pub customer_billing_address: Option<String>,
    pub customer_tax_id: Option<String>,
    pub customer_ip_address: Option<String>,
    /// JSON-encoded object.
    pub customer_metadata: Option<String>,
    /// Boolean string ("true"/"false").
    pub allow_discount_codes: Option<String>,
    pub discount_id: Option<String>,
    /// JSON-encoded object.
    pub metadata: Option<String>,
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": message.into()})),
    )
        .into_response()
}

/// Decode a JSON-encoded query parameter.
fn parse_json_param(
    name: &str,
    raw: Option<&String>,
) -> std::result::Result<Option<serde_json::Value>, Response> {
    match raw {
        None => Ok(None),
        Some(raw) => serde_json::from_str(raw).map(Some).map_err(|_| {
            bad_request(format!("Invalid JSON in {} query param", name))
        }),
    }
}

/// Append the checkout-id template token to a success URL.
fn with_checkout_id(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}checkoutId={}", url, separator, CHECKOUT_ID_TOKEN)
}

async fn handle_checkout<C: CheckoutClient + Send + Sync + 'static>(
    State(state): State<Arc<CheckoutEndpoint<C>>>,
    Query(query): Query<CheckoutQuery>,
) -> Response {
    if query.product_id.is_none() && query.product_price_id.is_none() {
        return bad_request("Missing productId or productPriceId in query params");
    }

    let success_url = match query
        .success_url
        .clone()
        .or_else(|| state.config.success_url.clone())
    {
        Some(url) => {
            if Url::parse(&url).is_err() {
                return bad_request("Invalid successUrl query param");
            }
            Some(if state.config.include_checkout_id {
                with_checkout_id(&url)
            } else {
                url
            })
        }
        None => None,
    };

    let customer_billing_address =
        match parse_json_param("customerBillingAddress", query.customer_billing_address.as_ref()) {
            Ok(v) => v,
            Err(response) => return response,
        };
    let customer_metadata =
        match parse_json_param("customerMetadata", query.customer_metadata.as_ref()) {
            Ok(v) => v,
            Err(response) => return response,
        };
    let metadata = match parse_json_param("metadata", query.metadata.as_ref()) {
        Ok(v) => v,
        Err(response) => return response,
    };

    let request = CreateCheckoutRequest {
        product_id: query.product_id,
        product_price_id: query.product_price_id,
        success_url,
        customer_id: query.customer_id,
        customer_email: query.customer_email,
        customer_name: query.customer_name,
        customer_billing_address,
        customer_tax_id: query.customer_tax_id,
        customer_ip_address: query.customer_ip_address,
        customer_metadata,
        allow_discount_codes: query.allow_discount_codes.as_deref().map(|v| v == "true"),
        discount_id: query.discount_id,
        metadata,
    };

    match state.client.create_checkout(request).await {
        Ok(session) => {
            tracing::debug!(
                target: "grantway::checkout",
                session_id = %session.id,
                "Redirecting to checkout"
            );
            (StatusCode::FOUND, [(header::LOCATION, session.url)]).into_response()
        }
        Err(e) => e.into_response(),
    }
}
