//! Position acquisition coordinator.
//!
//! Turns asynchronous, imperfect provider readings into two request modes:
//! a one-shot "best current position" query and continuous watches.
//!
//! # Architecture
//!
//! ```text
//!                   ┌───────────────────┐
//!   caller ────────►│ AuthorizationGate │ single-flight permission prompt
//!      │            └───────────────────┘
//!      │
//!      ├──► RequestCoordinator ──┐        ┌──────────────────┐
//!      │                         ├──────► │ ProviderSelector │ tier + one fallback hop
//!      └──► WatchRegistry ───────┘        └──────────────────┘
//!                   │
//!                   ▼
//!           Core (one mutex): stream leases, pending requests, watches
//!                   ▲
//!                   │ pump task per running stream
//!           ProviderHandle::start ──► ProviderEvent
//! ```
//!
//! One-shot requests run every reading through the [`arbiter`]; watches
//! forward every reading that passes their own filters.
//!
//! # Example
//!
//! ```ignore
//! use geolocation::position::{Geolocation, Options};
//!
//! let (geolocation, mut events) = Geolocation::new(gps, network, host);
//! geolocation.request_authorization().await?;
//!
//! let fix = geolocation
//!     .get_current_position(Options::default().with_high_accuracy(true))
//!     .await?;
//!
//! let id = geolocation.watch_position(Options::default())?;
//! while let Some(event) = events.recv().await {
//!     // WatchEvent::Reading / WatchEvent::Error
//! }
//! ```

pub mod arbiter;
mod authorization;
pub mod distance;
mod error;
mod hub;
mod logger;
mod options;
mod provider;
mod reading;
mod request;
mod selector;
mod service;
mod timer;
mod watch;

pub use arbiter::is_better;
pub use authorization::{
    AuthorizationGate, AuthorizationState, GateStats, PermissionHost, PermissionScope,
};
pub use error::{ErrorKind, GeolocationError};
pub use logger::{spawn_watch_logger, DEFAULT_LOG_INTERVAL};
pub use options::{
    Options, DEFAULT_DISTANCE_FILTER_METERS, DEFAULT_INTERVAL_MILLIS, DEFAULT_MAXIMUM_AGE_MILLIS,
    DEFAULT_MIN_UPDATE_INTERVAL_MILLIS, DEFAULT_TIMEOUT_MILLIS,
};
pub use provider::{ProviderEvent, ProviderHandle, ProviderKind, ProviderStream, SharedProvider};
pub use reading::Reading;
pub use request::RequestCoordinator;
pub use selector::ProviderSelector;
pub use service::Geolocation;
pub use timer::DeadlineTimer;
pub use watch::{WatchEvent, WatchId, WatchRegistry, WatchStatus, WatchSubscription};
