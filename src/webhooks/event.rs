//! Typed webhook events.
//!
//! Decodes a verified raw body into a closed set of event variants. Unknown
//! event types decode to [`Event::Unhandled`] so new kinds introduced by the
//! remote service never break existing deployments.

use std::collections::HashMap;

use serde::Deserialize;

use super::error::WebhookError;
use super::verification::VerifiedPayload;

/// The subscriber a benefit event concerns.
///
/// Owned by the remote billing service and passed through unmodified;
/// fields beyond the ones modelled here are preserved in `extra`.
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    /// Stable customer identifier.
    #[serde(default)]
    pub id: String,
    /// Customer email address.
    pub email: String,
    /// Display name, when the remote service has one.
    #[serde(default)]
    pub name: Option<String>,
    /// Any additional fields the remote service sent.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// The benefit a grant event refers to.
#[derive(Debug, Clone, Deserialize)]
pub struct Benefit {
    /// Stable string identifier used as the routing key.
    pub slug: String,
}

/// Payload of a benefit grant lifecycle event.
#[derive(Debug, Clone, Deserialize)]
pub struct BenefitGrant {
    pub benefit: Benefit,
    pub customer: Customer,
    /// Benefit-specific string properties (e.g. an external team id).
    ///
    /// The schema is declared by each entitlement definition; the decoder
    /// only guarantees a well-formed string-to-string mapping.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// A decoded webhook event.
///
/// Closed tagged variant over the `type` discriminator. Variants the crate
/// does not know decode to [`Event::Unhandled`] and are ignored by dispatch.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A customer's entitlement to a benefit began.
    #[serde(rename = "benefit_grant.created")]
    BenefitGrantCreated { data: BenefitGrant },
    /// A customer's entitlement to a benefit ended.
    #[serde(rename = "benefit_grant.revoked")]
    BenefitGrantRevoked { data: BenefitGrant },
    /// An event type this crate does not handle (forward compatibility).
    #[serde(other)]
    Unhandled,
}

impl Event {
    /// Decode a verified payload into a typed event.
    ///
    /// Requiring [`VerifiedPayload`] makes decoding an unverified body
    /// unrepresentable.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::MalformedPayload`] when required fields
    /// (event kind, benefit slug, customer) are absent or structurally
    /// invalid. Terminal for the single event, not for the process.
    pub fn decode(payload: &VerifiedPayload<'_>) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload.body()).map_err(|e| {
            tracing::warn!(
                target: "grantway::webhooks",
                error = %e,
                "Failed to decode webhook payload"
            );
            WebhookError::MalformedPayload {
                message: e.to_string(),
            }
        })
    }

    /// The benefit slug this event routes on, if it carries one.
    #[must_use]
    pub fn benefit_slug(&self) -> Option<&str> {
        self.grant().map(|g| g.benefit.slug.as_str())
    }

    /// The grant payload, for the variants that carry one.
    #[must_use]
    pub fn grant(&self) -> Option<&BenefitGrant> {
        match self {
            Self::BenefitGrantCreated { data } | Self::BenefitGrantRevoked { data } => Some(data),
            Self::Unhandled => None,
        }
    }

    /// The wire-level event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::BenefitGrantCreated { .. } => "benefit_grant.created",
            Self::BenefitGrantRevoked { .. } => "benefit_grant.revoked",
            Self::Unhandled => "unhandled",
        }
    }

    /// Whether this event is an unknown kind dispatch will ignore.
    #[must_use]
    pub fn is_unhandled(&self) -> bool {
        matches!(self, Self::Unhandled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test-only bypass of the verifier: mints a VerifiedPayload without a
    // signature check so the decoder can be tested in isolation.
    fn verified(body: &[u8]) -> VerifiedPayload<'_> {
        use crate::webhooks::verification::{SignatureVerifier, WebhookHeaders};
        use std::time::{SystemTime, UNIX_EPOCH};

        let verifier = SignatureVerifier::new("whsec_test");
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let signature = verifier.sign("msg_test", ts, body);
        let ts_string = ts.to_string();
        // leak: test helper only, keeps lifetimes simple
        let headers = WebhookHeaders {
            id: "msg_test",
            timestamp: Box::leak(ts_string.into_boxed_str()),
            signature: Box::leak(signature.into_boxed_str()),
        };
        verifier.verify(body, &headers).unwrap()
    }

    const CREATED: &[u8] = br#"{
        "type": "benefit_grant.created",
        "data": {
            "benefit": {"slug": "figma-team"},
            "customer": {"id": "cus_1", "email": "a@b.com"},
            "properties": {"figmaTeamId": "T1"}
        }
    }"#;

    #[test]
    fn test_decode_grant_created() {
        let event = Event::decode(&verified(CREATED)).unwrap();

        assert_eq!(event.event_type(), "benefit_grant.created");
        assert_eq!(event.benefit_slug(), Some("figma-team"));

        let grant = event.grant().unwrap();
        assert_eq!(grant.customer.id, "cus_1");
        assert_eq!(grant.customer.email, "a@b.com");
        assert_eq!(grant.properties["figmaTeamId"], "T1");
    }

    #[test]
    fn test_decode_grant_revoked() {
        let body = br#"{
            "type": "benefit_grant.revoked",
            "data": {
                "benefit": {"slug": "figma-team"},
                "customer": {"email": "a@b.com"},
                "properties": {"figmaTeamId": "T1"}
            }
        }"#;

        let event = Event::decode(&verified(body)).unwrap();
        assert!(matches!(event, Event::BenefitGrantRevoked { .. }));
        assert_eq!(event.benefit_slug(), Some("figma-team"));
    }

    #[test]
    fn test_decode_unknown_type_is_unhandled() {
        let body = br#"{"type": "subscription.updated", "data": {"anything": true}}"#;
        let event = Event::decode(&verified(body)).unwrap();

        assert!(event.is_unhandled());
        assert_eq!(event.benefit_slug(), None);
        assert!(event.grant().is_none());
    }

    #[test]
    fn test_decode_missing_type_fails() {
        let body = br#"{"data": {"benefit": {"slug": "x"}}}"#;
        let err = Event::decode(&verified(body)).unwrap_err();
        assert!(matches!(err, WebhookError::MalformedPayload { .. }));
    }

    #[test]
    fn test_decode_missing_slug_fails() {
        let body = br#"{
            "type": "benefit_grant.created",
            "data": {"benefit": {}, "customer": {"email": "a@b.com"}}
        }"#;
        assert!(matches!(
            Event::decode(&verified(body)).unwrap_err(),
            WebhookError::MalformedPayload { .. }
        ));
    }

    #[test]
    fn test_decode_missing_customer_fails() {
        let body = br#"{
            "type": "benefit_grant.created",
            "data": {"benefit": {"slug": "x"}, "properties": {}}
        }"#;
        assert!(matches!(
            Event::decode(&verified(body)).unwrap_err(),
            WebhookError::MalformedPayload { .. }
        ));
    }

    #[test]
    fn test_decode_non_string_property_fails() {
        let body = br#"{
            "type": "benefit_grant.created",
            "data": {
                "benefit": {"slug": "x"},
                "customer": {"email": "a@b.com"},
                "properties": {"count": 3}
            }
        }"#;
        assert!(matches!(
            Event::decode(&verified(body)).unwrap_err(),
            WebhookError::MalformedPayload { .. }
        ));
    }

    #[test]
    fn test_decode_missing_properties_defaults_empty() {
        let body = br#"{
            "type": "benefit_grant.created",
            "data": {"benefit": {"slug": "x"}, "customer": {"email": "a@b.com"}}
        }"#;
        let event = Event::decode(&verified(body)).unwrap();
        assert!(event.grant().unwrap().properties.is_empty());
    }

    #[test]
    fn test_decode_customer_passthrough_fields() {
        let body = br#"{
            "type": "benefit_grant.created",
            "data": {
                "benefit": {"slug": "x"},
                "customer": {
                    "id": "cus_1",
                    "email": "a@b.com",
                    "name": "Ada",
                    "billing_address": {"country": "SE"}
                }
            }
        }"#;
        let event = Event::decode(&verified(body)).unwrap();
        let customer = &event.grant().unwrap().customer;

        assert_eq!(customer.name.as_deref(), Some("Ada"));
        assert_eq!(customer.extra["billing_address"]["country"], "SE");
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            Event::decode(&verified(b"not json")).unwrap_err(),
            WebhookError::MalformedPayload { .. }
        ));
    }
}
