//! Shared coordinator state and provider stream plumbing.
//!
//! All mutable state (the stream lease table, pending one-shot requests and
//! watch subscriptions) sits behind one mutex in [`Core`]. Provider events
//! are pumped by one task per running stream and dispatched under that
//! mutex, so request resolution and stream teardown never race.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::error::GeolocationError;
use super::options::Options;
use super::provider::{ProviderEvent, ProviderKind, ProviderStream, SharedProvider};
use super::request::{PendingRequest, RequestId};
use super::watch::{WatchEvent, WatchTable};
use crate::time::Clock;

/// A claim on a running provider stream.
///
/// The generation distinguishes successive streams of the same kind, so a
/// lease outliving a forced teardown cannot release a newer stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StreamLease {
    kind: ProviderKind,
    generation: u64,
}

impl StreamLease {
    pub(crate) fn kind(&self) -> ProviderKind {
        self.kind
    }
}

struct ActiveStream {
    provider: SharedProvider,
    generation: u64,
    leases: usize,
    cancellation: CancellationToken,
}

impl ActiveStream {
    fn shutdown(self) {
        self.cancellation.cancel();
        self.provider.stop();
        info!(provider = %self.provider.kind(), "Provider stream stopped");
    }
}

/// Reference-counted provider streams, at most one per kind.
#[derive(Default)]
pub(crate) struct StreamTable {
    active: HashMap<ProviderKind, ActiveStream>,
    next_generation: u64,
}

impl StreamTable {
    pub(crate) fn lease_count(&self, kind: ProviderKind) -> usize {
        self.active.get(&kind).map_or(0, |stream| stream.leases)
    }

    fn join(&mut self, kind: ProviderKind) -> Option<StreamLease> {
        let stream = self.active.get_mut(&kind)?;
        stream.leases += 1;
        Some(StreamLease {
            kind,
            generation: stream.generation,
        })
    }

    fn insert(&mut self, provider: SharedProvider, cancellation: CancellationToken) -> StreamLease {
        let kind = provider.kind();
        let generation = self.next_generation;
        self.next_generation += 1;
        self.active.insert(
            kind,
            ActiveStream {
                provider,
                generation,
                leases: 1,
                cancellation,
            },
        );
        StreamLease { kind, generation }
    }

    /// Drop one lease, stopping the stream when it was the last.
    pub(crate) fn release(&mut self, lease: StreamLease) {
        let Some(stream) = self.active.get_mut(&lease.kind) else {
            return;
        };
        if stream.generation != lease.generation {
            return;
        }

        stream.leases = stream.leases.saturating_sub(1);
        debug!(provider = %lease.kind, leases = stream.leases, "Stream lease released");
        if stream.leases == 0 {
            if let Some(stream) = self.active.remove(&lease.kind) {
                stream.shutdown();
            }
        }
    }

    /// Stop a stream regardless of how many leases remain.
    pub(crate) fn teardown(&mut self, kind: ProviderKind) {
        if let Some(stream) = self.active.remove(&kind) {
            debug!(provider = %kind, leases = stream.leases, "Forcing stream teardown");
            stream.shutdown();
        }
    }
}

/// Everything guarded by the coordinator mutex.
#[derive(Default)]
pub(crate) struct CoreState {
    pub(crate) streams: StreamTable,
    pub(crate) pending: HashMap<RequestId, PendingRequest>,
    pub(crate) watches: WatchTable,
    pub(crate) next_request_id: RequestId,
}

/// Coordinator core shared by the request coordinator and watch registry.
pub(crate) struct Core {
    state: Mutex<CoreState>,
    clock: Arc<dyn Clock>,
    events: mpsc::UnboundedSender<WatchEvent>,
}

impl Core {
    pub(crate) fn new(clock: Arc<dyn Clock>, events: mpsc::UnboundedSender<WatchEvent>) -> Self {
        Self {
            state: Mutex::new(CoreState::default()),
            clock,
            events,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock()
    }

    pub(crate) fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Take a lease on the provider's stream, starting it if not running.
    pub(crate) fn acquire(
        self: &Arc<Self>,
        state: &mut CoreState,
        provider: &SharedProvider,
        options: &Options,
    ) -> Result<StreamLease, GeolocationError> {
        let kind = provider.kind();
        if let Some(lease) = state.streams.join(kind) {
            debug!(provider = %kind, leases = state.streams.lease_count(kind), "Joined running stream");
            return Ok(lease);
        }

        let stream = provider.start(options)?;
        let cancellation = CancellationToken::new();
        let lease = state.streams.insert(Arc::clone(provider), cancellation.clone());
        info!(
            provider = %kind,
            interval_ms = options.interval_millis,
            significant_only = options.use_significant_changes_only,
            "Provider stream started"
        );
        spawn_pump(Arc::downgrade(self), kind, stream, cancellation);

        Ok(lease)
    }

    /// Send an outbound watch event. A dropped receiver is not an error.
    pub(crate) fn emit(&self, event: WatchEvent) {
        if self.events.send(event).is_err() {
            trace!("Watch event receiver dropped");
        }
    }

    fn dispatch(
        &self,
        kind: ProviderKind,
        cancellation: &CancellationToken,
        event: ProviderEvent,
        closed: bool,
    ) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if cancellation.is_cancelled() {
            trace!(provider = %kind, "Discarding event from stopped stream");
            return;
        }

        match event {
            ProviderEvent::Reading(reading) => {
                trace!(provider = %kind, %reading, "Provider reading");
                self.offer_to_pending(state, kind, &reading);
                self.fan_out_reading(state, kind, &reading);
            }
            ProviderEvent::Error(error) => {
                warn!(provider = %kind, error = %error, "Provider failure");
                self.fail_pending(state, kind, &error);
                self.fan_out_error(state, kind, &error);
            }
        }

        if closed {
            state.streams.teardown(kind);
            state.watches.stream_lost(kind);
        }
    }
}

/// Forward provider events to the core until cancelled or closed.
fn spawn_pump(
    core: Weak<Core>,
    kind: ProviderKind,
    mut stream: ProviderStream,
    cancellation: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancellation.cancelled() => break,
                event = stream.recv() => event,
            };

            let Some(core) = core.upgrade() else {
                break;
            };

            match event {
                Some(event) => core.dispatch(kind, &cancellation, event, false),
                None => {
                    let error = GeolocationError::PositionUnavailable(format!(
                        "{} provider stream closed",
                        kind
                    ));
                    core.dispatch(kind, &cancellation, ProviderEvent::Error(error), true);
                    break;
                }
            }
        }
        debug!(provider = %kind, "Provider pump stopped");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Reading;
    use crate::simulation::SimulatedProvider;
    use crate::time::ManualClock;
    use std::time::Duration;

    fn core() -> (Arc<Core>, mpsc::UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Core::new(Arc::new(ManualClock::new(0)), tx)), rx)
    }

    #[tokio::test]
    async fn test_second_acquire_joins_running_stream() {
        let (core, _rx) = core();
        let gps = Arc::new(SimulatedProvider::new(ProviderKind::HighAccuracy));
        let provider: SharedProvider = gps.clone();

        let mut state = core.lock();
        let first = core.acquire(&mut state, &provider, &Options::default()).unwrap();
        let second = core.acquire(&mut state, &provider, &Options::default()).unwrap();

        assert_eq!(first, second);
        assert_eq!(state.streams.lease_count(ProviderKind::HighAccuracy), 2);
        assert_eq!(gps.start_count(), 1);

        state.streams.release(first);
        assert_eq!(gps.stop_count(), 0);
        state.streams.release(second);
        assert_eq!(gps.stop_count(), 1);
        assert_eq!(state.streams.lease_count(ProviderKind::HighAccuracy), 0);
    }

    #[tokio::test]
    async fn test_stale_lease_does_not_release_new_stream() {
        let (core, _rx) = core();
        let gps = Arc::new(SimulatedProvider::new(ProviderKind::HighAccuracy));
        let provider: SharedProvider = gps.clone();

        let mut state = core.lock();
        let old = core.acquire(&mut state, &provider, &Options::default()).unwrap();
        state.streams.teardown(ProviderKind::HighAccuracy);

        let fresh = core.acquire(&mut state, &provider, &Options::default()).unwrap();
        state.streams.release(old);

        assert_eq!(state.streams.lease_count(ProviderKind::HighAccuracy), 1);
        assert_eq!(gps.start_count(), 2);
        state.streams.release(fresh);
        assert_eq!(gps.stop_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_start_leaves_no_stream() {
        let (core, _rx) = core();
        let gps = Arc::new(SimulatedProvider::new(ProviderKind::HighAccuracy));
        gps.set_available(false);
        let provider: SharedProvider = gps.clone();

        let mut state = core.lock();
        let result = core.acquire(&mut state, &provider, &Options::default());

        assert!(result.is_err());
        assert_eq!(state.streams.lease_count(ProviderKind::HighAccuracy), 0);
    }

    #[tokio::test]
    async fn test_events_after_teardown_are_discarded() {
        let (core, mut rx) = core();
        let gps = Arc::new(SimulatedProvider::new(ProviderKind::HighAccuracy));
        let provider: SharedProvider = gps.clone();

        let lease = {
            let mut state = core.lock();
            core.acquire(&mut state, &provider, &Options::default()).unwrap()
        };
        core.lock().streams.release(lease);

        assert!(!gps.push_reading(Reading::new(1.0, 2.0, 5.0, "gps", 0)));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(rx.try_recv().is_err());
    }
}
