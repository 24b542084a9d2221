//! Integration tests for the position-acquisition coordinator.
//!
//! These drive the public `Geolocation` facade end to end against the
//! simulated providers and permission host, with tokio's paused clock for
//! anything deadline related.

use std::sync::Arc;
use std::time::Duration;

use geolocation::position::distance::project;
use geolocation::position::{
    AuthorizationState, ErrorKind, Geolocation, GeolocationError, Options, ProviderKind, Reading,
    WatchEvent,
};
use geolocation::simulation::{PromptBehavior, SimulatedPermissionHost, SimulatedProvider};
use geolocation::time::{Clock, ManualClock};
use tokio::sync::mpsc;
use tokio::time::Instant;

// ============================================================================
// Helpers
// ============================================================================

const NOW: i64 = 1_700_000_000_000;

struct Harness {
    geolocation: Geolocation,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    gps: Arc<SimulatedProvider>,
    network: Arc<SimulatedProvider>,
    host: Arc<SimulatedPermissionHost>,
    clock: Arc<ManualClock>,
}

fn harness_with_host(host: SimulatedPermissionHost) -> Harness {
    let gps = Arc::new(SimulatedProvider::new(ProviderKind::HighAccuracy));
    let network = Arc::new(SimulatedProvider::new(ProviderKind::LowPower));
    let host = Arc::new(host);
    let clock = Arc::new(ManualClock::new(NOW));

    let (geolocation, events) =
        Geolocation::with_clock(gps.clone(), network.clone(), host.clone(), clock.clone());

    Harness {
        geolocation,
        events,
        gps,
        network,
        host,
        clock,
    }
}

fn harness() -> Harness {
    harness_with_host(SimulatedPermissionHost::granted())
}

fn spawn_request(
    geolocation: &Geolocation,
    options: Options,
) -> tokio::task::JoinHandle<Result<Reading, GeolocationError>> {
    let geolocation = geolocation.clone();
    tokio::spawn(async move { geolocation.get_current_position(options).await })
}

async fn wait_until_streaming(provider: &SimulatedProvider) {
    while !provider.is_streaming() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<WatchEvent>) -> WatchEvent {
    tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("timed out waiting for watch event")
        .expect("event channel closed")
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_authorization_prompts_once() {
    let h = harness_with_host(SimulatedPermissionHost::not_determined(
        PromptBehavior::AnswerAfter(AuthorizationState::Granted, Duration::from_millis(500)),
    ));

    let (first, second) = tokio::join!(
        h.geolocation.request_authorization(),
        h.geolocation.request_authorization()
    );

    assert_eq!(first.unwrap(), AuthorizationState::Granted);
    assert_eq!(second.unwrap(), AuthorizationState::Granted);
    assert_eq!(h.host.prompt_count(), 1);

    // Terminal now: answered from cache without another prompt
    let third = h.geolocation.request_authorization().await.unwrap();
    assert_eq!(third, AuthorizationState::Granted);
    assert_eq!(h.host.prompt_count(), 1);
}

#[tokio::test]
async fn test_request_before_authorization_is_denied() {
    let h = harness_with_host(SimulatedPermissionHost::not_determined(PromptBehavior::Defer));

    let err = h
        .geolocation
        .get_current_position(Options::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(h.network.start_count(), 0);
}

#[tokio::test]
async fn test_prompt_without_context_fails() {
    let h = harness_with_host(
        SimulatedPermissionHost::not_determined(PromptBehavior::Defer).with_context_available(false),
    );

    let err = h.geolocation.request_authorization().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::HostContextUnavailable);
    assert_eq!(err.kind().code(), 4);
}

// ============================================================================
// One-shot requests
// ============================================================================

#[tokio::test]
async fn test_cache_hit_just_inside_maximum_age() {
    let h = harness();
    let cached = Reading::new(43.6, 1.4, 15.0, "gps", NOW - 59_999).with_altitude(140.0);
    h.gps.set_last_known(Some(cached.clone()));

    let reading = h
        .geolocation
        .get_current_position(
            Options::default()
                .with_high_accuracy(true)
                .with_maximum_age_millis(60_000.0),
        )
        .await
        .unwrap();

    assert_eq!(reading, cached);
    assert_eq!(h.gps.start_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cache_miss_at_maximum_age_starts_stream() {
    let h = harness();
    h.gps
        .set_last_known(Some(Reading::new(43.6, 1.4, 15.0, "gps", NOW - 60_000)));

    let task = spawn_request(
        &h.geolocation,
        Options::default()
            .with_high_accuracy(true)
            .with_maximum_age_millis(60_000.0),
    );
    wait_until_streaming(&h.gps).await;

    let fresh = Reading::new(43.6001, 1.4001, 6.0, "gps", h.clock.now_millis());
    h.gps.push_reading(fresh.clone());

    assert_eq!(task.await.unwrap().unwrap(), fresh);
    assert!(!h.gps.is_streaming());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_resolves_with_stale_candidate() {
    let h = harness();
    let stale = Reading::new(43.6, 1.4, 30.0, "network", NOW - 10 * 60_000);
    h.network.set_last_known(Some(stale.clone()));

    let started = Instant::now();
    let reading = h
        .geolocation
        .get_current_position(
            Options::default()
                .with_maximum_age_millis(1_000.0)
                .with_timeout_millis(5_000),
        )
        .await
        .unwrap();

    assert_eq!(reading, stale);
    assert!(started.elapsed() >= Duration::from_millis(5_000));
    assert_eq!(h.network.stop_count(), 1);
    assert_eq!(h.geolocation.stream_leases(ProviderKind::LowPower), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_without_candidate_fails_at_deadline() {
    let h = harness();

    let started = Instant::now();
    let err = h
        .geolocation
        .get_current_position(Options::default().with_timeout_millis(5_000))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(elapsed >= Duration::from_millis(5_000));
    assert!(elapsed < Duration::from_millis(5_050), "took {:?}", elapsed);
    assert_eq!(h.network.stop_count(), 1);
    assert_eq!(h.geolocation.requests().pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reading_and_timeout_in_same_instant_resolve_once() {
    let h = harness();

    let task = spawn_request(&h.geolocation, Options::default().with_timeout_millis(1_000));
    wait_until_streaming(&h.network).await;

    // Queue a resolving reading, then jump straight onto the deadline
    let fix = Reading::new(43.6, 1.4, 50.0, "network", NOW);
    h.network.push_reading(fix.clone());
    tokio::time::advance(Duration::from_millis(1_000)).await;

    match task.await.unwrap() {
        Ok(reading) => assert_eq!(reading, fix),
        Err(err) => assert_eq!(err.kind(), ErrorKind::Timeout),
    }
    assert_eq!(h.geolocation.requests().pending_count(), 0);
    assert_eq!(h.network.stop_count(), 1);
    assert_eq!(h.geolocation.stream_leases(ProviderKind::LowPower), 0);
}

#[tokio::test(start_paused = true)]
async fn test_high_accuracy_falls_back_to_network() {
    let h = harness();
    h.gps.set_available(false);

    let task = spawn_request(&h.geolocation, Options::default().with_high_accuracy(true));
    wait_until_streaming(&h.network).await;

    let fix = Reading::new(43.6, 1.4, 90.0, "network", NOW);
    h.network.push_reading(fix.clone());

    assert_eq!(task.await.unwrap().unwrap(), fix);
    assert_eq!(h.gps.start_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_provider_disabled_mid_request() {
    let h = harness();

    let task = spawn_request(&h.geolocation, Options::default().with_high_accuracy(true));
    wait_until_streaming(&h.gps).await;
    h.gps.set_available(false);

    let err = task.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PositionUnavailable);
    assert_eq!(err.message(), "Provider gps is out of service.");
    assert!(!h.gps.is_streaming());
}

// ============================================================================
// Watches
// ============================================================================

#[tokio::test]
async fn test_same_tier_watches_share_one_stream() {
    let h = harness();
    let options = Options::default();

    let a = h.geolocation.watch_position(options.clone()).unwrap();
    let b = h.geolocation.watch_position(options).unwrap();

    assert_eq!(h.network.start_count(), 1);
    assert_eq!(h.geolocation.stream_leases(ProviderKind::LowPower), 1);

    assert!(h.geolocation.clear_watch(a));
    assert!(h.network.is_streaming());

    assert!(h.geolocation.clear_watch(b));
    assert!(!h.network.is_streaming());
    assert_eq!(h.geolocation.stream_leases(ProviderKind::LowPower), 0);
}

#[tokio::test]
async fn test_distance_filter_fifty_meters() {
    let mut h = harness();
    let id = h
        .geolocation
        .watch_position(Options::default().with_distance_filter_meters(50.0))
        .unwrap();

    let origin = (43.6, 1.4);
    let first = Reading::new(origin.0, origin.1, 10.0, "network", NOW);
    let (lat, lon) = project(origin, 45.0, 10.0);
    let ten_meters = Reading::new(lat, lon, 10.0, "network", NOW + 1_000);
    let (lat, lon) = project(origin, 45.0, 60.0);
    let sixty_meters = Reading::new(lat, lon, 10.0, "network", NOW + 2_000);

    h.network.push_reading(first.clone());
    h.network.push_reading(ten_meters);
    h.network.push_reading(sixty_meters.clone());

    assert_eq!(
        next_event(&mut h.events).await,
        WatchEvent::Reading {
            watch_id: id,
            reading: first
        }
    );
    assert_eq!(
        next_event(&mut h.events).await,
        WatchEvent::Reading {
            watch_id: id,
            reading: sixty_meters
        }
    );
}

#[tokio::test]
async fn test_watch_errors_are_events_not_failures() {
    let mut h = harness();
    let id = h.geolocation.watch_position(Options::default()).unwrap();

    h.network.set_available(false);

    match next_event(&mut h.events).await {
        WatchEvent::Error {
            watch_id,
            kind,
            message,
        } => {
            assert_eq!(watch_id, id);
            assert_eq!(kind, ErrorKind::PositionUnavailable);
            assert_eq!(message, "Provider network is out of service.");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_one_shot_and_watch_share_stream() {
    let mut h = harness();
    let id = h
        .geolocation
        .watch_position(Options::default().with_distance_filter_meters(0.0))
        .unwrap();

    let task = spawn_request(&h.geolocation, Options::default());
    while h.geolocation.requests().pending_count() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(h.network.start_count(), 1);
    assert_eq!(h.geolocation.stream_leases(ProviderKind::LowPower), 2);

    let fix = Reading::new(43.6, 1.4, 25.0, "network", NOW);
    h.network.push_reading(fix.clone());

    assert_eq!(task.await.unwrap().unwrap(), fix);
    assert_eq!(next_event(&mut h.events).await.watch_id(), id);

    // The watch still holds the stream
    assert!(h.network.is_streaming());
    assert_eq!(h.geolocation.stream_leases(ProviderKind::LowPower), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_observing_leaves_one_shot_to_its_deadline() {
    let h = harness();
    let stale = Reading::new(43.6, 1.4, 30.0, "network", NOW - 10 * 60_000);
    h.network.set_last_known(Some(stale.clone()));
    h.geolocation.watch_position(Options::default()).unwrap();

    let task = spawn_request(
        &h.geolocation,
        Options::default()
            .with_maximum_age_millis(0.0)
            .with_timeout_millis(2_000),
    );
    while h.geolocation.requests().pending_count() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    h.geolocation.stop_observing();
    assert!(!h.network.is_streaming());
    assert_eq!(h.geolocation.watches().active_count(), 0);

    assert_eq!(task.await.unwrap().unwrap(), stale);
    assert_eq!(h.geolocation.stream_leases(ProviderKind::LowPower), 0);
    assert_eq!(h.network.stop_count(), 1);
}
