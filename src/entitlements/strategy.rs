//! Entitlement registration.
//!
//! An [`EntitlementStrategy`] collects ordered grant and revoke callbacks
//! for one benefit type. Freezing it with [`EntitlementStrategy::build`]
//! yields an immutable [`EntitlementDefinition`] that can mint per-slug
//! dispatchers; there is no way to register a callback after the freeze, so
//! registration can never race a dispatch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::context::EntitlementContext;
use super::dispatcher::Dispatcher;
use crate::error::Result;

/// A grant or revoke callback.
///
/// The single capability the registry is polymorphic over: accept a context
/// and complete asynchronously, possibly failing. Callbacks must be
/// idempotent: the core provides no dedupe store, and redelivery of the
/// same event runs them again.
///
/// # Example
///
/// ```rust,ignore
/// use grantway::entitlements::{EntitlementContext, EntitlementHandler};
///
/// struct AddToFigmaTeam { figma: FigmaClient }
///
/// #[async_trait::async_trait]
/// impl EntitlementHandler for AddToFigmaTeam {
///     async fn handle(&self, context: &EntitlementContext) -> grantway::Result<()> {
///         let team = context.property("figmaTeamId").unwrap_or_default();
///         self.figma.add_member(team, &context.customer.email).await
///     }
/// }
/// ```
#[async_trait]
pub trait EntitlementHandler: Send + Sync {
    /// Apply this callback's side effect for the event in `context`.
    async fn handle(&self, context: &EntitlementContext) -> Result<()>;
}

/// Adapter implementing [`EntitlementHandler`] for async closures.
struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> EntitlementHandler for FnHandler<F>
where
    F: Fn(EntitlementContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn handle(&self, context: &EntitlementContext) -> Result<()> {
        (self.f)(context.clone()).await
    }
}

type HandlerList = Vec<Arc<dyn EntitlementHandler>>;

/// Builder for an entitlement's callback sets.
///
/// Registration is append-only and fluent; `build()` consumes the builder,
/// so all registration structurally precedes dispatcher construction.
///
/// # Example
///
/// ```rust,ignore
/// use grantway::entitlements::EntitlementStrategy;
///
/// let figma_team = EntitlementStrategy::new()
///     .grant_fn(|ctx| async move {
///         // figma.team.add_member(...)
///         Ok(())
///     })
///     .revoke_fn(|ctx| async move {
///         // figma.team.remove_member(...)
///         Ok(())
///     })
///     .build();
///
/// let dispatcher = figma_team.handler("figma-team");
/// ```
#[must_use = "a strategy does nothing until built into a definition"]
#[derive(Default)]
pub struct EntitlementStrategy {
    grant: HandlerList,
    revoke: HandlerList,
    callback_timeout: Option<Duration>,
}

impl EntitlementStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback to the grant set.
    pub fn grant(mut self, handler: impl EntitlementHandler + 'static) -> Self {
        self.grant.push(Arc::new(handler));
        self
    }

    /// Append an async closure to the grant set.
    pub fn grant_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(EntitlementContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.grant(FnHandler { f })
    }

    /// Append a callback to the revoke set.
    pub fn revoke(mut self, handler: impl EntitlementHandler + 'static) -> Self {
        self.revoke.push(Arc::new(handler));
        self
    }

    /// Append an async closure to the revoke set.
    pub fn revoke_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(EntitlementContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.revoke(FnHandler { f })
    }

    /// Bound every callback invocation with a timeout.
    ///
    /// A callback that never settles would otherwise hang the dispatch
    /// indefinitely; a timed-out callback is reported in the aggregate
    /// failure like any other callback error. No timeout by default.
    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = Some(timeout);
        self
    }

    /// Freeze the strategy into an immutable definition.
    pub fn build(self) -> EntitlementDefinition {
        EntitlementDefinition {
            grant: self.grant.into(),
            revoke: self.revoke.into(),
            callback_timeout: self.callback_timeout,
        }
    }
}

/// Frozen callback sets for one benefit type.
///
/// Process-wide and read-only: created during application setup, shared by
/// every dispatcher and request task behind `Arc`, never mutated. Cloning is
/// cheap (reference counts only).
#[derive(Clone)]
pub struct EntitlementDefinition {
    grant: Arc<[Arc<dyn EntitlementHandler>]>,
    revoke: Arc<[Arc<dyn EntitlementHandler>]>,
    callback_timeout: Option<Duration>,
}

impl EntitlementDefinition {
    /// Produce a dispatcher routing events for `slug` to this definition's
    /// callbacks.
    ///
    /// The dispatcher shares the callback lists by reference; building any
    /// number of dispatchers is cheap.
    pub fn handler(&self, slug: impl Into<String>) -> Dispatcher {
        Dispatcher::new(
            slug.into(),
            Arc::clone(&self.grant),
            Arc::clone(&self.revoke),
            self.callback_timeout,
        )
    }

    /// Number of registered grant callbacks.
    #[must_use]
    pub fn grant_count(&self) -> usize {
        self.grant.len()
    }

    /// Number of registered revoke callbacks.
    #[must_use]
    pub fn revoke_count(&self) -> usize {
        self.revoke.len()
    }
}
