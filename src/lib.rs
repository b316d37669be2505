//! Grantway - verified benefit-grant webhooks and entitlement dispatch
//!
//! Grantway connects a subscription platform's signed lifecycle webhooks to
//! your provisioning code: it authenticates inbound "benefit granted" /
//! "benefit revoked" events, decodes them into typed payloads, and fans
//! each event out to the grant/revoke callbacks registered for its benefit
//! slug.
//!
//! # Features
//!
//! - **Verification**: HMAC-SHA256 signature checking over the standard
//!   `webhook-id`/`webhook-timestamp`/`webhook-signature` headers, with
//!   constant-time comparison and a replay-guarding timestamp tolerance
//! - **Typed events**: closed event model with a forward-compatible
//!   fallback for unknown event kinds
//! - **Entitlement dispatch**: per-slug callback sets, frozen before
//!   serving, invoked concurrently with aggregate failure reporting
//! - **Axum bindings**: drop-in routers for the webhook endpoint and the
//!   checkout redirect endpoint
//! - **Testing**: Alba-style scenario helpers and a mock checkout client
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use grantway::{Config, EntitlementStrategy, WebhookEndpoint};
//!
//! #[tokio::main]
//! async fn main() -> grantway::Result<()> {
//!     grantway::init_tracing();
//!
//!     let config = Config::from_env()?;
//!
//!     // Register callbacks, then freeze. No registration is possible
//!     // after build(), so dispatch never races registration.
//!     let figma_team = EntitlementStrategy::new()
//!         .grant_fn(|ctx| async move {
//!             // figma.team.add_member(ctx.property("figmaTeamId"), &ctx.customer.email)
//!             Ok(())
//!         })
//!         .revoke_fn(|ctx| async move {
//!             // figma.team.remove_member(ctx.property("figmaTeamId"), &ctx.customer.email)
//!             Ok(())
//!         })
//!         .build();
//!
//!     let app = axum::Router::new().nest(
//!         "/webhooks",
//!         WebhookEndpoint::new(config.webhook_secret.clone())
//!             .register(figma_team.handler("figma-team"))
//!             .into_router(),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//!     Ok(())
//! }
//! ```

pub mod checkout;
mod config;
pub mod entitlements;
mod error;
pub mod testing;
pub mod webhooks;

// Re-exports for public API
pub use checkout::{CheckoutClient, CheckoutEndpoint, LiveCheckoutClient, LiveCheckoutClientConfig};
pub use config::{Config, ConfigBuilder};
pub use entitlements::{
    DispatchError, DispatchOutcome, Dispatcher, EntitlementContext, EntitlementDefinition,
    EntitlementHandler, EntitlementStrategy,
};
pub use error::{GrantwayError, Result};
pub use webhooks::{Customer, Event, SignatureVerifier, WebhookEndpoint, WebhookError};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main().
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "grantway=debug")
/// - `GRANTWAY_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("GRANTWAY_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
