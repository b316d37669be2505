//! Checkout session creation.
//!
//! External collaborator to the dispatch core: a redirect endpoint that
//! passes URL query parameters through to the remote billing service's
//! "create checkout" API and sends the customer to the hosted checkout
//! page.

pub mod client;
pub mod endpoint;

pub use client::{
    CheckoutApiError, CheckoutClient, CheckoutSession, CreateCheckoutRequest, LiveCheckoutClient,
    LiveCheckoutClientConfig,
};
pub use endpoint::{CheckoutConfig, CheckoutEndpoint, CheckoutQuery};

#[cfg(any(test, feature = "test-client"))]
pub use client::test::MockCheckoutClient;
