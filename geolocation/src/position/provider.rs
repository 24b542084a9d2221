//! Provider capability abstraction.
//!
//! The coordinator never talks to a concrete radio. It sees a
//! [`ProviderHandle`]: something that can be started with [`Options`] and
//! then pushes [`ProviderEvent`]s through a channel until stopped.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::authorization::PermissionScope;
use super::error::GeolocationError;
use super::options::Options;
use super::reading::Reading;

/// Accuracy tier of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    /// Satellite-based, precise but power hungry.
    HighAccuracy,
    /// Network-based, coarse but cheap.
    LowPower,
}

impl ProviderKind {
    /// The tier matching an accuracy preference.
    pub fn for_accuracy(high_accuracy: bool) -> Self {
        if high_accuracy {
            Self::HighAccuracy
        } else {
            Self::LowPower
        }
    }

    /// The other tier, used for the single fallback hop.
    pub fn fallback(self) -> Self {
        match self {
            Self::HighAccuracy => Self::LowPower,
            Self::LowPower => Self::HighAccuracy,
        }
    }

    /// Permission scope a caller must hold to use this tier.
    pub fn required_scope(self) -> PermissionScope {
        match self {
            Self::HighAccuracy => PermissionScope::Fine,
            Self::LowPower => PermissionScope::Coarse,
        }
    }

    /// Short provider identifier, also stamped into readings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighAccuracy => "gps",
            Self::LowPower => "network",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event pushed by a running provider.
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    Reading(Reading),
    Error(GeolocationError),
}

/// Receiving half of a started provider.
///
/// The provider closing its sender while leased is treated as a failure.
pub type ProviderStream = mpsc::UnboundedReceiver<ProviderEvent>;

/// A location provider capability.
///
/// Implementations are shared across threads and must not call back into
/// the coordinator from `start` or `stop`.
pub trait ProviderHandle: Send + Sync {
    /// Accuracy tier this provider serves.
    fn kind(&self) -> ProviderKind;

    /// Whether the provider is enabled and reachable right now.
    fn is_available(&self) -> bool;

    /// Most recent fix the provider knows about, if any.
    fn last_known_reading(&self) -> Option<Reading>;

    /// Begin producing events.
    fn start(&self, options: &Options) -> Result<ProviderStream, GeolocationError>;

    /// Stop producing events. Must not block.
    fn stop(&self);
}

/// Shared provider handle.
pub type SharedProvider = Arc<dyn ProviderHandle>;
