//! Entitlement registration and dispatch.
//!
//! The core of the crate: register grant/revoke callbacks per benefit type,
//! freeze them into a definition, and dispatch verified webhook events to
//! the callback set matching the event's benefit slug.
//!
//! # Example
//!
//! ```rust,ignore
//! use grantway::entitlements::EntitlementStrategy;
//!
//! let figma_team = EntitlementStrategy::new()
//!     .grant_fn(|ctx| async move {
//!         // figma.team.add_member(ctx.property("figmaTeamId"), &ctx.customer.email)
//!         Ok(())
//!     })
//!     .revoke_fn(|ctx| async move {
//!         // figma.team.remove_member(ctx.property("figmaTeamId"), &ctx.customer.email)
//!         Ok(())
//!     })
//!     .build();
//!
//! let dispatcher = figma_team.handler("figma-team");
//! dispatcher.dispatch(&event).await?;
//! ```

pub mod context;
pub mod dispatcher;
pub mod strategy;

pub use context::EntitlementContext;
pub use dispatcher::{
    CallbackFailure, DispatchError, DispatchOutcome, Dispatcher, EntitlementAction,
};
pub use strategy::{EntitlementDefinition, EntitlementHandler, EntitlementStrategy};
