//! Testing utilities for Grantway integrations.
//!
//! Alba-style endpoint testing without running a server. Pair with
//! [`MockCheckoutClient`](crate::checkout::MockCheckoutClient) (behind the
//! `test-client` feature) and
//! [`SignatureVerifier::sign`](crate::webhooks::SignatureVerifier::sign)
//! to exercise the full verify → decode → dispatch pipeline in tests.

mod scenario;

pub use scenario::{Scenario, ScenarioAssert, get, post};
