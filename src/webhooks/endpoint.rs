//! Axum endpoint adapter for inbound webhooks.
//!
//! Terminates the HTTP request: extracts headers and body, runs the
//! verifier and decoder, and fans the decoded event out to every registered
//! dispatcher. Authentication failures answer `403 {"received": false}` so
//! the remote service knows the delivery was refused; decode and dispatch
//! errors propagate through [`GrantwayError`]'s response mapping (400/500),
//! and a non-2xx response is the remote's cue to redeliver.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use futures::future;
use secrecy::SecretString;
use serde_json::json;

use super::event::Event;
use super::verification::{SignatureVerifier, WebhookHeaders};
use crate::entitlements::Dispatcher;
use crate::error::Result;

/// Builder for the inbound webhook route.
///
/// # Example
///
/// ```rust,ignore
/// use grantway::webhooks::WebhookEndpoint;
///
/// let app = axum::Router::new().nest(
///     "/webhooks",
///     WebhookEndpoint::new(config.webhook_secret.clone())
///         .register(figma_team.handler("figma-team"))
///         .into_router(),
/// );
/// ```
#[must_use = "an endpoint does nothing until turned into a router"]
pub struct WebhookEndpoint {
    verifier: SignatureVerifier,
    dispatchers: Vec<Dispatcher>,
}

impl WebhookEndpoint {
    /// Create an endpoint verifying deliveries with `webhook_secret`.
    pub fn new(webhook_secret: impl Into<SecretString>) -> Self {
        Self {
            verifier: SignatureVerifier::new(webhook_secret),
            dispatchers: Vec::new(),
        }
    }

    /// Override the verifier's timestamp tolerance.
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.verifier = self.verifier.with_tolerance(tolerance);
        self
    }

    /// Register a dispatcher. Every registered dispatcher sees every decoded
    /// event and filters by its own slug.
    pub fn register(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatchers.push(dispatcher);
        self
    }

    /// Build a router serving the endpoint at `/`.
    pub fn into_router(self) -> Router {
        self.into_router_at("/")
    }

    /// Build a router serving the endpoint at `path`.
    pub fn into_router_at(self, path: &str) -> Router {
        let state = Arc::new(WebhookState {
            verifier: self.verifier,
            dispatchers: self.dispatchers,
        });
        Router::new()
            .route(path, post(handle_webhook))
            .with_state(state)
    }
}

struct WebhookState {
    verifier: SignatureVerifier,
    dispatchers: Vec<Dispatcher>,
}

/// `403 {"received": false}`: the delivery was refused.
fn rejection() -> Response {
    (StatusCode::FORBIDDEN, Json(json!({"received": false}))).into_response()
}

async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let webhook_headers = match WebhookHeaders::from_header_map(&headers) {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(target: "grantway::webhooks", error = %e, "Rejected webhook delivery");
            return Ok(rejection());
        }
    };

    // Verification strictly precedes decoding; the decoder only accepts the
    // token minted here.
    let verified = match state.verifier.verify(&body, &webhook_headers) {
        Ok(v) => v,
        Err(e) if e.is_authentication() => {
            tracing::warn!(
                target: "grantway::webhooks",
                webhook_id = webhook_headers.id,
                error = %e,
                "Rejected webhook delivery"
            );
            return Ok(rejection());
        }
        Err(e) => return Err(e.into()),
    };

    let event = Event::decode(&verified)?;

    tracing::debug!(
        target: "grantway::webhooks",
        webhook_id = webhook_headers.id,
        event_type = event.event_type(),
        "Dispatching webhook event"
    );

    // Every dispatcher sees the event; all dispatches settle before any
    // failure is surfaced.
    let results = future::join_all(
        state
            .dispatchers
            .iter()
            .map(|dispatcher| dispatcher.dispatch(&event)),
    )
    .await;
    for result in results {
        result?;
    }

    Ok((StatusCode::OK, Json(json!({"received": true}))).into_response())
}
