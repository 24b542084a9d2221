//! In-process stand-ins for the platform collaborators.
//!
//! - [`SimulatedProvider`] - a scriptable [`ProviderHandle`](crate::position::ProviderHandle),
//!   either driven by hand (`push_reading`, `push_error`, `close_stream`) or
//!   roaming along a [`Route`]
//! - [`SimulatedPermissionHost`] - a [`PermissionHost`](crate::position::PermissionHost)
//!   whose prompt answers immediately, after a delay, or when told to

mod permission;
mod provider;

pub use permission::{PromptBehavior, SimulatedPermissionHost};
pub use provider::{Route, SimulatedProvider, SIGNIFICANT_CHANGE_METERS};
