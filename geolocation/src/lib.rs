//! Geolocation - position-acquisition coordinator
//!
//! This library decides which of several asynchronous, imperfect position
//! readings to trust, arbitrates between a high-accuracy and a low-power
//! provider, multiplexes watch subscriptions onto shared provider streams
//! and enforces timeouts without leaking provider subscriptions.
//!
//! # High-Level API
//!
//! The [`position::Geolocation`] facade is the entry point:
//!
//! ```ignore
//! use geolocation::position::{Geolocation, Options};
//!
//! let (geolocation, events) = Geolocation::new(gps, network, permission_host);
//! geolocation.request_authorization().await?;
//! let fix = geolocation.get_current_position(Options::default()).await?;
//! ```
//!
//! Platform collaborators (providers and the permission prompt) are plugged
//! in through [`position::ProviderHandle`] and [`position::PermissionHost`].
//! The [`simulation`] module provides in-memory implementations of both.

pub mod config;
pub mod logging;
pub mod position;
pub mod simulation;
pub mod time;

/// Version of the geolocation library and CLI.
///
/// Synchronized across the workspace and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
