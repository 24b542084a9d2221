//! Provider selection with a single fallback hop.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::authorization::PermissionHost;
use super::error::GeolocationError;
use super::provider::{ProviderKind, SharedProvider};

/// Chooses between the high-accuracy and low-power providers.
///
/// A provider is usable when it reports itself available and the caller
/// holds the permission scope its tier requires. An available provider
/// without the scope is skipped silently so the caller can fall back.
pub struct ProviderSelector {
    high_accuracy: SharedProvider,
    low_power: SharedProvider,
    permissions: Arc<dyn PermissionHost>,
}

impl ProviderSelector {
    pub fn new(
        high_accuracy: SharedProvider,
        low_power: SharedProvider,
        permissions: Arc<dyn PermissionHost>,
    ) -> Self {
        Self {
            high_accuracy,
            low_power,
            permissions,
        }
    }

    /// Pick the provider for the requested tier, falling back once.
    pub fn select(&self, high_accuracy: bool) -> Result<SharedProvider, GeolocationError> {
        let preferred = ProviderKind::for_accuracy(high_accuracy);

        if self.is_usable(preferred) {
            return Ok(Arc::clone(self.provider(preferred)));
        }

        let fallback = preferred.fallback();
        if self.is_usable(fallback) {
            debug!(preferred = %preferred, fallback = %fallback, "Falling back to other provider");
            return Ok(Arc::clone(self.provider(fallback)));
        }

        Err(GeolocationError::PositionUnavailable(
            "no location provider is available".to_string(),
        ))
    }

    /// The provider serving a tier, regardless of usability.
    pub fn provider(&self, kind: ProviderKind) -> &SharedProvider {
        match kind {
            ProviderKind::HighAccuracy => &self.high_accuracy,
            ProviderKind::LowPower => &self.low_power,
        }
    }

    /// Whether a tier is available and permitted right now.
    pub fn is_usable(&self, kind: ProviderKind) -> bool {
        self.provider(kind).is_available() && self.permissions.has_scope(kind.required_scope())
    }
}

impl fmt::Debug for ProviderSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSelector")
            .field("high_accuracy_usable", &self.is_usable(ProviderKind::HighAccuracy))
            .field("low_power_usable", &self.is_usable(ProviderKind::LowPower))
            .finish()
    }
}
