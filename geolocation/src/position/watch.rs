//! Continuous position subscriptions.
//!
//! Any number of watches share one provider stream. The first subscription
//! starts the stream; later ones join whatever tier is already driving it.
//! The stream only moves to another tier once no subscription wants the
//! driving one, and stops when the last subscription goes.
//!
//! Every reading from the driving stream is offered to every
//! subscription in id order. Each subscription applies its own distance and
//! minimum-interval filters against the last reading it delivered.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::authorization::AuthorizationGate;
use super::distance::distance_between;
use super::error::{ErrorKind, GeolocationError};
use super::hub::{Core, CoreState, StreamLease};
use super::options::Options;
use super::provider::ProviderKind;
use super::reading::Reading;
use super::selector::ProviderSelector;

/// Watch subscription identifier. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(u32);

impl WatchId {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event delivered to the host for a watch.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Reading {
        watch_id: WatchId,
        reading: Reading,
    },
    Error {
        watch_id: WatchId,
        kind: ErrorKind,
        message: String,
    },
}

impl WatchEvent {
    pub fn watch_id(&self) -> WatchId {
        match self {
            Self::Reading { watch_id, .. } | Self::Error { watch_id, .. } => *watch_id,
        }
    }
}

/// One standing subscription.
#[derive(Debug, Clone)]
pub struct WatchSubscription {
    id: WatchId,
    options: Options,
    tier: ProviderKind,
    active: bool,
    last_delivered: Option<Reading>,
}

impl WatchSubscription {
    fn new(id: WatchId, options: Options, tier: ProviderKind) -> Self {
        Self {
            id,
            options,
            tier,
            active: true,
            last_delivered: None,
        }
    }

    pub fn id(&self) -> WatchId {
        self.id
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Provider tier chosen for this subscription.
    pub fn tier(&self) -> ProviderKind {
        self.tier
    }

    /// False while no stream is serving the subscription.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn last_delivered(&self) -> Option<&Reading> {
        self.last_delivered.as_ref()
    }

    /// Apply the distance and interval filters.
    fn accepts(&self, reading: &Reading) -> bool {
        let Some(last) = &self.last_delivered else {
            return true;
        };

        let min_distance = self.options.distance_filter_meters;
        if min_distance > 0.0 && distance_between(last, reading) < min_distance {
            return false;
        }

        let min_interval = self.options.min_update_interval_millis;
        if min_interval >= 0
            && reading.timestamp_millis().saturating_sub(last.timestamp_millis()) < min_interval
        {
            return false;
        }

        true
    }
}

/// Subscription arena plus the registry's lease on the shared stream.
pub(crate) struct WatchTable {
    subscriptions: BTreeMap<WatchId, WatchSubscription>,
    lease: Option<StreamLease>,
    next_id: u32,
}

impl Default for WatchTable {
    fn default() -> Self {
        Self {
            subscriptions: BTreeMap::new(),
            lease: None,
            next_id: 1,
        }
    }
}

impl WatchTable {
    /// Next unused id, or `None` once the id space is spent.
    fn allocate_id(&mut self) -> Option<WatchId> {
        let id = self.next_id;
        self.next_id = id.checked_add(1)?;
        Some(WatchId(id))
    }

    fn driving_kind(&self) -> Option<ProviderKind> {
        self.lease.map(|lease| lease.kind())
    }

    /// Forget the lease on a stream that was torn down underneath us.
    ///
    /// Subscriptions stay registered but go dormant until a later
    /// subscribe restarts the stream.
    pub(crate) fn stream_lost(&mut self, kind: ProviderKind) {
        if self.driving_kind() == Some(kind) {
            self.lease = None;
            self.set_all_active(false);
        }
    }

    fn set_all_active(&mut self, active: bool) {
        for subscription in self.subscriptions.values_mut() {
            subscription.active = active;
        }
    }
}

impl Core {
    /// Fan a reading out to every subscription.
    ///
    /// Only the driving stream reaches subscribers, and subscriptions are
    /// active whenever a driving stream exists.
    pub(crate) fn fan_out_reading(&self, state: &mut CoreState, kind: ProviderKind, reading: &Reading) {
        if state.watches.driving_kind() != Some(kind) {
            return;
        }

        for subscription in state.watches.subscriptions.values_mut() {
            if !subscription.accepts(reading) {
                debug!(watch_id = %subscription.id, "Reading filtered for watch");
                continue;
            }

            subscription.last_delivered = Some(reading.clone());
            self.emit(WatchEvent::Reading {
                watch_id: subscription.id,
                reading: reading.clone(),
            });
        }
    }

    /// Broadcast a stream failure to every subscription.
    pub(crate) fn fan_out_error(&self, state: &mut CoreState, kind: ProviderKind, error: &GeolocationError) {
        if state.watches.driving_kind() != Some(kind) {
            return;
        }
        self.broadcast_error(state, error);
    }

    fn broadcast_error(&self, state: &CoreState, error: &GeolocationError) {
        for subscription in state.watches.subscriptions.values() {
            self.emit(WatchEvent::Error {
                watch_id: subscription.id,
                kind: error.kind(),
                message: error.message().to_string(),
            });
        }
    }
}

/// Snapshot of the registry for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchStatus {
    pub active_watches: usize,
    pub driving: Option<ProviderKind>,
}

/// Multiplexes watch subscriptions onto shared provider streams.
#[derive(Clone)]
pub struct WatchRegistry {
    core: Arc<Core>,
    gate: AuthorizationGate,
    selector: Arc<ProviderSelector>,
}

impl WatchRegistry {
    pub(crate) fn new(
        core: Arc<Core>,
        gate: AuthorizationGate,
        selector: Arc<ProviderSelector>,
    ) -> Self {
        Self {
            core,
            gate,
            selector,
        }
    }

    /// Register a watch. Never blocks.
    ///
    /// Fails with `PermissionDenied` without authorization and with
    /// `PositionUnavailable` when no provider can be started. Restarting
    /// the stream wakes any dormant subscriptions.
    pub fn subscribe(&self, options: Options) -> Result<WatchId, GeolocationError> {
        self.gate.ensure_granted()?;
        let provider = self.selector.select(options.high_accuracy)?;

        let mut guard = self.core.lock();
        let state = &mut *guard;

        let id = state.watches.allocate_id().ok_or_else(|| GeolocationError::Unknown {
            message: "watch ids exhausted".to_string(),
            source: None,
        })?;

        if state.watches.lease.is_none() {
            let lease = self.core.acquire(state, &provider, &options)?;
            state.watches.lease = Some(lease);
            state.watches.set_all_active(true);
        }

        let tier = provider.kind();
        info!(
            watch_id = %id,
            tier = %tier,
            driving = ?state.watches.driving_kind(),
            distance_filter_m = options.distance_filter_meters,
            "Watch subscribed"
        );
        state
            .watches
            .subscriptions
            .insert(id, WatchSubscription::new(id, options, tier));

        Ok(id)
    }

    /// Remove one watch. Returns false if the id is unknown.
    pub fn unsubscribe(&self, id: WatchId) -> bool {
        let mut guard = self.core.lock();
        let state = &mut *guard;

        if state.watches.subscriptions.remove(&id).is_none() {
            return false;
        }
        info!(watch_id = %id, remaining = state.watches.subscriptions.len(), "Watch cleared");

        self.rebalance(state);
        true
    }

    /// Remove every watch and stop the shared stream unconditionally.
    ///
    /// One-shot requests riding the same stream are left to their deadlines.
    pub fn unsubscribe_all(&self) {
        let mut guard = self.core.lock();
        let state = &mut *guard;

        let cleared = state.watches.subscriptions.len();
        state.watches.subscriptions.clear();

        if let Some(lease) = state.watches.lease.take() {
            state.streams.teardown(lease.kind());
        }
        info!(cleared, "All watches cleared");
    }

    /// Release or move the registry's stream after a subscription left.
    fn rebalance(&self, state: &mut CoreState) {
        let Some(lease) = state.watches.lease else {
            return;
        };

        if state.watches.subscriptions.is_empty() {
            state.watches.lease = None;
            state.streams.release(lease);
            return;
        }

        let driving = lease.kind();
        let subscriptions = &state.watches.subscriptions;
        if subscriptions.values().any(|subscription| subscription.tier == driving) {
            return;
        }
        let Some((tier, options)) = subscriptions
            .values()
            .next()
            .map(|subscription| (subscription.tier, subscription.options.clone()))
        else {
            return;
        };

        state.watches.lease = None;
        state.streams.release(lease);

        let switched = self
            .selector
            .select(tier == ProviderKind::HighAccuracy)
            .and_then(|provider| self.core.acquire(state, &provider, &options));
        match switched {
            Ok(lease) => {
                info!(from = %driving, to = %lease.kind(), "Watch stream switched tier");
                state.watches.lease = Some(lease);
            }
            Err(error) => {
                warn!(error = %error, "Could not restart watch stream");
                self.core.broadcast_error(state, &error);
                state.watches.set_all_active(false);
            }
        }
    }

    /// A copy of one subscription.
    pub fn subscription(&self, id: WatchId) -> Option<WatchSubscription> {
        self.core.lock().watches.subscriptions.get(&id).cloned()
    }

    pub fn active_count(&self) -> usize {
        self.core.lock().watches.subscriptions.len()
    }

    /// Tier currently driving the shared stream, if one is running.
    pub fn driving_kind(&self) -> Option<ProviderKind> {
        self.core.lock().watches.driving_kind()
    }

    pub fn status(&self) -> WatchStatus {
        let state = self.core.lock();
        WatchStatus {
            active_watches: state.watches.subscriptions.len(),
            driving: state.watches.driving_kind(),
        }
    }
}
