//! One-shot position acquisition.
//!
//! `get_current_position` runs: permission check, provider selection,
//! cache check, then a pending request raced against a deadline timer.
//! Whatever settles the request first (a better reading, the deadline or a
//! provider failure) removes it from the pending map under the core mutex,
//! so the others find nothing to do.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info};

use super::arbiter::is_better;
use super::authorization::AuthorizationGate;
use super::error::{ErrorKind, GeolocationError};
use super::hub::{Core, CoreState, StreamLease};
use super::options::Options;
use super::provider::{ProviderKind, SharedProvider};
use super::reading::Reading;
use super::selector::ProviderSelector;
use super::timer::DeadlineTimer;

pub(crate) type RequestId = u64;

type Outcome = Result<Reading, GeolocationError>;

/// An in-flight one-shot query.
pub(crate) struct PendingRequest {
    options: Options,
    best_candidate: Option<Reading>,
    deadline_millis: i64,
    resolved: bool,
    lease: StreamLease,
    timer: DeadlineTimer,
    reply: Option<oneshot::Sender<Outcome>>,
}

impl PendingRequest {
    fn kind(&self) -> ProviderKind {
        self.lease.kind()
    }

    /// Deliver the outcome. Returns false if already resolved.
    fn resolve(&mut self, outcome: Outcome) -> bool {
        if self.resolved {
            return false;
        }
        self.resolved = true;
        self.timer.cancel();
        if let Some(reply) = self.reply.take() {
            // The caller may have stopped waiting
            let _ = reply.send(outcome);
        }
        true
    }
}

/// Remove a request and settle it, releasing its stream lease.
fn settle(state: &mut CoreState, id: RequestId, outcome: Option<Outcome>) -> bool {
    let Some(mut request) = state.pending.remove(&id) else {
        return false;
    };

    match outcome {
        Some(outcome) => {
            request.resolve(outcome);
        }
        None => request.timer.cancel(),
    }
    state.streams.release(request.lease);
    true
}

impl Core {
    fn register_request(
        self: &Arc<Self>,
        provider: &SharedProvider,
        options: Options,
        seed: Option<Reading>,
    ) -> Result<(RequestId, oneshot::Receiver<Outcome>), GeolocationError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let lease = self.acquire(state, provider, &options)?;
        let id = state.next_request_id;
        state.next_request_id += 1;

        let core = Arc::downgrade(self);
        let timer = DeadlineTimer::schedule(options.timeout(), move || {
            if let Some(core) = core.upgrade() {
                core.expire_request(id);
            }
        });

        let (reply, rx) = oneshot::channel();
        let deadline_millis = self.now_millis().saturating_add(options.timeout_millis);
        debug!(
            request_id = id,
            provider = %lease.kind(),
            deadline_millis,
            seeded = seed.is_some(),
            "Pending request registered"
        );

        state.pending.insert(
            id,
            PendingRequest {
                options,
                best_candidate: seed,
                deadline_millis,
                resolved: false,
                lease,
                timer,
                reply: Some(reply),
            },
        );

        Ok((id, rx))
    }

    /// Offer a reading to every pending request on this stream.
    pub(crate) fn offer_to_pending(&self, state: &mut CoreState, kind: ProviderKind, reading: &Reading) {
        let winners: Vec<RequestId> = state
            .pending
            .iter()
            .filter(|(_, request)| request.kind() == kind)
            .filter(|(_, request)| is_better(reading, request.best_candidate.as_ref()))
            .map(|(id, _)| *id)
            .collect();

        for id in winners {
            if let Some(request) = state.pending.get_mut(&id) {
                request.best_candidate = Some(reading.clone());
            }
            debug!(request_id = id, %reading, "Request resolved with provider reading");
            settle(state, id, Some(Ok(reading.clone())));
        }
    }

    /// Fail every pending request on this stream.
    pub(crate) fn fail_pending(&self, state: &mut CoreState, kind: ProviderKind, error: &GeolocationError) {
        let failed: Vec<RequestId> = state
            .pending
            .iter()
            .filter(|(_, request)| request.kind() == kind)
            .map(|(id, _)| *id)
            .collect();

        let error = match error.kind() {
            ErrorKind::Unknown => error.clone(),
            _ => GeolocationError::PositionUnavailable(error.message().to_string()),
        };

        for id in failed {
            debug!(request_id = id, error = %error, "Request failed by provider");
            settle(state, id, Some(Err(error.clone())));
        }
    }

    fn expire_request(&self, id: RequestId) {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(request) = state.pending.get_mut(&id) else {
            return;
        };
        let deadline_millis = request.deadline_millis;

        let outcome = match request.best_candidate.take() {
            Some(candidate) => {
                info!(request_id = id, deadline_millis, %candidate, "Deadline reached, using cached candidate");
                Ok(candidate)
            }
            None => {
                info!(request_id = id, deadline_millis, "Deadline reached without a position");
                Err(GeolocationError::Timeout(format!(
                    "no position within {} ms",
                    request.options.timeout_millis
                )))
            }
        };

        settle(state, id, Some(outcome));
    }

    fn abandon_request(&self, id: RequestId) {
        let mut guard = self.lock();
        if settle(&mut guard, id, None) {
            debug!(request_id = id, "Request abandoned by caller");
        }
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}

/// Releases a pending request if the caller stops waiting for it.
struct AbandonOnDrop {
    core: Arc<Core>,
    id: RequestId,
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.core.abandon_request(self.id);
    }
}

/// Drives one-shot "best current position" queries.
#[derive(Clone)]
pub struct RequestCoordinator {
    core: Arc<Core>,
    gate: AuthorizationGate,
    selector: Arc<ProviderSelector>,
}

impl RequestCoordinator {
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

    /// Acquire the best current position.
    ///
    /// Resolves immediately from the provider's last known reading when it
    /// is younger than `maximum_age_millis`. Otherwise waits for the first
    /// reading the arbiter prefers over the last known one. At the deadline
    /// the last known reading is returned if there was one, else `Timeout`.
    ///
    /// Dropping the returned future releases the request and its stream.
    pub async fn get_current_position(&self, options: Options) -> Result<Reading, GeolocationError> {
        self.gate.ensure_granted()?;
        let provider = self.selector.select(options.high_accuracy)?;

        let last_known = provider.last_known_reading();
        if let Some(reading) = &last_known {
            let age_millis = reading.age_millis(self.core.now_millis());
            if options.accepts_cached_age(age_millis) {
                debug!(provider = %provider.kind(), age_millis, "Serving cached reading");
                return Ok(reading.clone());
            }
        }

        let (id, rx) = self.core.register_request(&provider, options, last_known)?;
        let _guard = AbandonOnDrop {
            core: Arc::clone(&self.core),
            id,
        };

        rx.await.unwrap_or_else(|_| {
            Err(GeolocationError::Unknown {
                message: "request dropped before resolution".to_string(),
                source: None,
            })
        })
    }

    /// Number of one-shot requests currently waiting.
    pub fn pending_count(&self) -> usize {
        self.core.pending_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::watch::WatchEvent;
    use crate::simulation::{SimulatedPermissionHost, SimulatedProvider};
    use crate::time::{Clock, ManualClock};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Fixture {
        clock: Arc<ManualClock>,
        gps: Arc<SimulatedProvider>,
        network: Arc<SimulatedProvider>,
        core: Arc<Core>,
        coordinator: RequestCoordinator,
        _events: mpsc::UnboundedReceiver<WatchEvent>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let gps = Arc::new(SimulatedProvider::new(ProviderKind::HighAccuracy));
        let network = Arc::new(SimulatedProvider::new(ProviderKind::LowPower));
        let host = Arc::new(SimulatedPermissionHost::granted());
        let (tx, rx) = mpsc::unbounded_channel();
        let core = Arc::new(Core::new(clock.clone(), tx));
        let gate = AuthorizationGate::new(host.clone());
        let selector = Arc::new(ProviderSelector::new(gps.clone(), network.clone(), host));
        let coordinator = RequestCoordinator::new(core.clone(), gate, selector);
        Fixture {
            clock,
            gps,
            network,
            core,
            coordinator,
            _events: rx,
        }
    }

    async fn wait_for_stream(provider: &SimulatedProvider) {
        while !provider.is_streaming() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_with_first_reading() {
        let f = fixture();
        let options = Options::default().with_high_accuracy(true);

        let task = tokio::spawn({
            let coordinator = f.coordinator.clone();
            async move { coordinator.get_current_position(options).await }
        });
        wait_for_stream(&f.gps).await;

        let fix = Reading::new(43.6, 1.4, 8.0, "gps", f.clock.now_millis());
        f.gps.push_reading(fix.clone());

        assert_eq!(task.await.unwrap().unwrap(), fix);
        assert_eq!(f.gps.stop_count(), 1);
        assert_eq!(f.coordinator.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worse_reading_does_not_resolve() {
        let f = fixture();
        let now = f.clock.now_millis();
        // Stale enough to miss the cache, fresh enough to stay in the arbiter window
        f.gps
            .set_last_known(Some(Reading::new(43.6, 1.4, 5.0, "gps", now - 60_000)));
        let options = Options::default()
            .with_high_accuracy(true)
            .with_maximum_age_millis(1_000.0)
            .with_timeout_millis(5_000);

        let task = tokio::spawn({
            let coordinator = f.coordinator.clone();
            async move { coordinator.get_current_position(options).await }
        });
        wait_for_stream(&f.gps).await;

        // Older and less accurate than the seed: rejected by the arbiter
        f.gps
            .push_reading(Reading::new(43.7, 1.5, 900.0, "network", now - 70_000));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(f.coordinator.pending_count(), 1);

        let better = Reading::new(43.6, 1.4, 3.0, "gps", now);
        f.gps.push_reading(better.clone());
        assert_eq!(task.await.unwrap().unwrap(), better);
    }

    #[tokio::test]
    async fn test_permission_denied_without_grant() {
        let f = fixture();
        let host = Arc::new(SimulatedPermissionHost::new(
            crate::position::AuthorizationState::Denied,
        ));
        let selector = Arc::new(ProviderSelector::new(
            f.gps.clone(),
            f.network.clone(),
            host.clone(),
        ));
        let coordinator =
            RequestCoordinator::new(f.core.clone(), AuthorizationGate::new(host), selector);

        let err = coordinator
            .get_current_position(Options::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GeolocationError::PermissionDenied(_)));
        assert_eq!(f.network.start_count(), 0);
    }

    #[tokio::test]
    async fn test_no_provider_is_position_unavailable() {
        let f = fixture();
        f.gps.set_available(false);
        f.network.set_available(false);

        let err = f
            .coordinator
            .get_current_position(Options::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GeolocationError::PositionUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_error_fails_request_and_stops_stream() {
        let f = fixture();

        let task = tokio::spawn({
            let coordinator = f.coordinator.clone();
            async move { coordinator.get_current_position(Options::default()).await }
        });
        wait_for_stream(&f.network).await;

        f.network.push_error(GeolocationError::PositionUnavailable(
            "Provider network is out of service.".to_string(),
        ));

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PositionUnavailable);
        assert_eq!(f.network.stop_count(), 1);
        assert_eq!(f.core.lock().streams.lease_count(ProviderKind::LowPower), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_stream_fails_request() {
        let f = fixture();

        let task = tokio::spawn({
            let coordinator = f.coordinator.clone();
            async move { coordinator.get_current_position(Options::default()).await }
        });
        wait_for_stream(&f.network).await;
        f.network.close_stream();

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PositionUnavailable);
        assert_eq!(f.coordinator.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_provider_error_keeps_cause() {
        let f = fixture();

        let task = tokio::spawn({
            let coordinator = f.coordinator.clone();
            async move { coordinator.get_current_position(Options::default()).await }
        });
        wait_for_stream(&f.network).await;

        let cause = std::io::Error::new(std::io::ErrorKind::Other, "modem reset");
        f.network
            .push_error(GeolocationError::unknown("provider crashed", cause));

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_caller_releases_request() {
        let f = fixture();

        let task = tokio::spawn({
            let coordinator = f.coordinator.clone();
            async move { coordinator.get_current_position(Options::default()).await }
        });
        wait_for_stream(&f.network).await;
        assert_eq!(f.coordinator.pending_count(), 1);

        task.abort();
        let _ = task.await;

        assert_eq!(f.coordinator.pending_count(), 0);
        assert_eq!(f.network.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_share_one_stream() {
        let f = fixture();

        let first = tokio::spawn({
            let coordinator = f.coordinator.clone();
            async move { coordinator.get_current_position(Options::default()).await }
        });
        let second = tokio::spawn({
            let coordinator = f.coordinator.clone();
            async move { coordinator.get_current_position(Options::default()).await }
        });
        while f.coordinator.pending_count() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(f.network.start_count(), 1);
        assert_eq!(f.core.lock().streams.lease_count(ProviderKind::LowPower), 2);

        let fix = Reading::new(43.6, 1.4, 40.0, "network", f.clock.now_millis());
        f.network.push_reading(fix.clone());

        assert_eq!(first.await.unwrap().unwrap(), fix);
        assert_eq!(second.await.unwrap().unwrap(), fix);
        assert_eq!(f.network.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_after_settle_is_noop() {
        let f = fixture();

        let task = tokio::spawn({
            let coordinator = f.coordinator.clone();
            async move { coordinator.get_current_position(Options::default()).await }
        });
        wait_for_stream(&f.network).await;

        let fix = Reading::new(43.6, 1.4, 40.0, "network", f.clock.now_millis());
        let id = {
            let mut guard = f.core.lock();
            let state = &mut *guard;
            let id = *state.pending.keys().next().unwrap();
            f.core.offer_to_pending(state, ProviderKind::LowPower, &fix);
            id
        };

        // Deadline callback firing late for an already settled request
        f.core.expire_request(id);
        f.core.expire_request(id);

        assert_eq!(task.await.unwrap().unwrap(), fix);
        assert_eq!(f.network.start_count(), 1);
        assert_eq!(f.network.stop_count(), 1);
        assert_eq!(f.core.lock().streams.lease_count(ProviderKind::LowPower), 0);
        assert_eq!(f.coordinator.pending_count(), 0);
    }
}
