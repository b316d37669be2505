//! Per-slug event dispatch.
//!
//! A [`Dispatcher`] routes decoded events for one benefit slug to the
//! matching callback set. All callbacks of a dispatch run concurrently and
//! are joined before the dispatch returns; failures are collected into one
//! aggregate after every callback has settled.

use std::fmt;
use std::sync::Arc;

use futures::future;

use super::context::EntitlementContext;
use super::strategy::EntitlementHandler;
use crate::error::{GrantwayError, Result};
use crate::webhooks::Event;

/// Which callback set a dispatch ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitlementAction {
    Grant,
    Revoke,
}

impl EntitlementAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grant => "grant",
            Self::Revoke => "revoke",
        }
    }
}

/// Result of dispatching one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every applicable callback ran and succeeded.
    Delivered { invoked: usize },
    /// The event kind is not handled by this crate.
    Ignored,
    /// The event's benefit slug does not match this dispatcher's.
    Skipped,
}

/// A single failed callback within a dispatch.
#[derive(Debug)]
pub struct CallbackFailure {
    /// Registration-order index of the callback within its set.
    pub index: usize,
    pub error: GrantwayError,
}

/// Aggregate failure of one dispatch.
///
/// Produced only after every callback has settled, so it enumerates all
/// failures rather than the first. Partial success is visible: `attempted`
/// minus `failures.len()` callbacks completed normally. Whether to retry is
/// the protocol layer's call (the webhook endpoint surfaces this as a
/// non-2xx response so the remote service redelivers).
#[derive(Debug)]
pub struct DispatchError {
    pub slug: String,
    pub action: EntitlementAction,
    /// Total callbacks invoked for this dispatch.
    pub attempted: usize,
    pub failures: Vec<CallbackFailure>,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} {} callbacks for benefit '{}' failed",
            self.failures.len(),
            self.attempted,
            self.action.as_str(),
            self.slug
        )?;
        for failure in &self.failures {
            write!(f, "; [{}] {}", failure.index, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for DispatchError {}

/// Routes decoded events for one benefit slug to its callback sets.
///
/// Produced by [`EntitlementDefinition::handler`]; shares the definition's
/// frozen callback lists by reference.
///
/// [`EntitlementDefinition::handler`]: super::EntitlementDefinition::handler
#[derive(Clone)]
pub struct Dispatcher {
    slug: String,
    grant: Arc<[Arc<dyn EntitlementHandler>]>,
    revoke: Arc<[Arc<dyn EntitlementHandler>]>,
    callback_timeout: Option<std::time::Duration>,
}

impl Dispatcher {
    pub(crate) fn new(
        slug: String,
        grant: Arc<[Arc<dyn EntitlementHandler>]>,
        revoke: Arc<[Arc<dyn EntitlementHandler>]>,
        callback_timeout: Option<std::time::Duration>,
    ) -> Self {
        Self {
            slug,
            grant,
            revoke,
            callback_timeout,
        }
    }

    /// The benefit slug this dispatcher is bound to.
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Dispatch one decoded event.
    ///
    /// Events for other slugs are a no-op ([`DispatchOutcome::Skipped`];
    /// in a multi-definition setup every dispatcher sees every event and
    /// filters independently). Unknown event kinds are a no-op
    /// ([`DispatchOutcome::Ignored`]). Otherwise all callbacks of the
    /// matching set run concurrently; the call returns once every callback
    /// has settled.
    ///
    /// Redelivery of an identical event runs the callbacks again: there is
    /// no dedupe store, so callbacks must be idempotent by their authors.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] enumerating every failed callback. The
    /// error is produced at the join point only: a failing callback never
    /// prevents its siblings from running to completion.
    pub async fn dispatch(&self, event: &Event) -> Result<DispatchOutcome> {
        let (data, handlers, action) = match event {
            Event::BenefitGrantCreated { data } => (data, &self.grant, EntitlementAction::Grant),
            Event::BenefitGrantRevoked { data } => (data, &self.revoke, EntitlementAction::Revoke),
            Event::Unhandled => {
                tracing::debug!(
                    target: "grantway::entitlements",
                    slug = %self.slug,
                    "Ignoring unhandled event kind"
                );
                return Ok(DispatchOutcome::Ignored);
            }
        };

        // Exact string match; other slugs' dispatchers match independently
        if data.benefit.slug != self.slug {
            return Ok(DispatchOutcome::Skipped);
        }

        let context = EntitlementContext::for_event(data, event);
        let attempted = handlers.len();

        // Fan-out: callbacks are independent side-effecting actions with no
        // ordering guarantee among themselves. Fan-in: join_all waits for
        // every callback to settle even when some fail.
        let invocations = handlers.iter().map(|handler| {
            let context = &context;
            async move {
                match self.callback_timeout {
                    Some(limit) => match tokio::time::timeout(limit, handler.handle(context)).await
                    {
                        Ok(result) => result,
                        Err(_) => Err(GrantwayError::RequestTimeout),
                    },
                    None => handler.handle(context).await,
                }
            }
        });
        let results = future::join_all(invocations).await;

        let failures: Vec<CallbackFailure> = results
            .into_iter()
            .enumerate()
            .filter_map(|(index, result)| result.err().map(|error| CallbackFailure { index, error }))
            .collect();

        if failures.is_empty() {
            tracing::info!(
                target: "grantway::entitlements",
                slug = %self.slug,
                action = action.as_str(),
                invoked = attempted,
                "Entitlement callbacks delivered"
            );
            Ok(DispatchOutcome::Delivered { invoked: attempted })
        } else {
            let error = DispatchError {
                slug: self.slug.clone(),
                action,
                attempted,
                failures,
            };
            tracing::error!(
                target: "grantway::entitlements",
                slug = %self.slug,
                action = action.as_str(),
                error = %error,
                "Entitlement callbacks failed"
            );
            Err(error.into())
        }
    }
}
