//! Inbound webhook handling.
//!
//! Signature verification, typed event decoding, and the axum endpoint
//! adapter for deliveries from the remote billing service. Verification
//! always precedes decoding: [`Event::decode`] only accepts the
//! [`VerifiedPayload`] token minted by [`SignatureVerifier`].

pub mod endpoint;
pub mod error;
pub mod event;
pub mod verification;

pub use endpoint::WebhookEndpoint;
pub use error::WebhookError;
pub use event::{Benefit, BenefitGrant, Customer, Event};
pub use verification::{
    SignatureVerifier, VerifiedPayload, WebhookHeaders, WEBHOOK_ID_HEADER,
    WEBHOOK_SIGNATURE_HEADER, WEBHOOK_TIMESTAMP_HEADER,
};
