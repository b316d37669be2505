use std::collections::HashMap;

use crate::webhooks::{BenefitGrant, Customer, Event};

/// Everything a callback needs to act on one grant or revoke event.
///
/// Constructed per (event, definition) pair at dispatch time and shared by
/// reference with every callback of that dispatch. Not persisted.
#[derive(Debug, Clone)]
pub struct EntitlementContext {
    /// The subscriber the benefit concerns.
    pub customer: Customer,
    /// Benefit-specific string properties; each definition declares and
    /// narrows the shape it expects.
    pub properties: HashMap<String, String>,
    /// The full decoded event, for callbacks that need more than the
    /// extracted fields.
    pub event: Event,
}

impl EntitlementContext {
    pub(crate) fn for_event(grant: &BenefitGrant, event: &Event) -> Self {
        Self {
            customer: grant.customer.clone(),
            properties: grant.properties.clone(),
            event: event.clone(),
        }
    }

    /// Look up a property by key.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
