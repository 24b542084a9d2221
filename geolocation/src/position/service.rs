//! High-level facade over the coordinator.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::authorization::{AuthorizationGate, AuthorizationState, PermissionHost};
use super::error::GeolocationError;
use super::hub::Core;
use super::options::Options;
use super::provider::{ProviderKind, SharedProvider};
use super::reading::Reading;
use super::request::RequestCoordinator;
use super::selector::ProviderSelector;
use super::watch::{WatchEvent, WatchId, WatchRegistry};
use crate::time::{Clock, SystemClock};

/// Cloneable handle bundling the authorization gate, one-shot coordinator
/// and watch registry over one shared core.
#[derive(Clone)]
pub struct Geolocation {
    gate: AuthorizationGate,
    requests: RequestCoordinator,
    watches: WatchRegistry,
    core: Arc<Core>,
}

impl Geolocation {
    /// Build a coordinator on the system clock.
    ///
    /// Returns the handle and the receiver of outbound watch events.
    pub fn new(
        high_accuracy: SharedProvider,
        low_power: SharedProvider,
        host: Arc<dyn PermissionHost>,
    ) -> (Self, mpsc::UnboundedReceiver<WatchEvent>) {
        Self::with_clock(high_accuracy, low_power, host, Arc::new(SystemClock))
    }

    /// Build a coordinator reading "now" from the given clock.
    pub fn with_clock(
        high_accuracy: SharedProvider,
        low_power: SharedProvider,
        host: Arc<dyn PermissionHost>,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<WatchEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let core = Arc::new(Core::new(clock, events_tx));
        let gate = AuthorizationGate::new(Arc::clone(&host));
        let selector = Arc::new(ProviderSelector::new(high_accuracy, low_power, host));

        let geolocation = Self {
            requests: RequestCoordinator::new(Arc::clone(&core), gate.clone(), Arc::clone(&selector)),
            watches: WatchRegistry::new(Arc::clone(&core), gate.clone(), selector),
            gate,
            core,
        };
        (geolocation, events_rx)
    }

    /// Resolve the authorization state, prompting once if undetermined.
    pub async fn request_authorization(&self) -> Result<AuthorizationState, GeolocationError> {
        self.gate.request_authorization().await
    }

    /// One-shot best current position.
    pub async fn get_current_position(&self, options: Options) -> Result<Reading, GeolocationError> {
        self.requests.get_current_position(options).await
    }

    /// Start a watch. Readings and errors arrive on the event receiver.
    pub fn watch_position(&self, options: Options) -> Result<WatchId, GeolocationError> {
        self.watches.subscribe(options)
    }

    /// Stop one watch.
    pub fn clear_watch(&self, id: WatchId) -> bool {
        self.watches.unsubscribe(id)
    }

    /// Stop every watch and the shared stream.
    pub fn stop_observing(&self) {
        self.watches.unsubscribe_all();
    }

    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    pub fn requests(&self) -> &RequestCoordinator {
        &self.requests
    }

    pub fn watches(&self) -> &WatchRegistry {
        &self.watches
    }

    /// Leases currently held on a provider's stream (0 when stopped).
    pub fn stream_leases(&self, kind: ProviderKind) -> usize {
        self.core.lock().streams.lease_count(kind)
    }
}

impl fmt::Debug for Geolocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Geolocation")
            .field("gate", &self.gate)
            .field("pending_requests", &self.requests.pending_count())
            .field("watches", &self.watches.status())
            .finish()
    }
}
