//! Scriptable location provider.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::position::distance::{distance_m, project};
use crate::position::{
    GeolocationError, Options, ProviderEvent, ProviderHandle, ProviderKind, ProviderStream,
    Reading,
};
use crate::time::Clock;

/// Minimum movement reported in significant-changes mode.
pub const SIGNIFICANT_CHANGE_METERS: f64 = 500.0;

/// Straight-line course followed by a roaming provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Start position as (latitude, longitude).
    pub origin: (f64, f64),
    /// Course in degrees true.
    pub heading_deg: f64,
    /// Ground speed in meters per second.
    pub speed_mps: f64,
    /// Horizontal accuracy stamped on every reading.
    pub accuracy_m: f64,
}

struct RouteDriver {
    route: Route,
    clock: Arc<dyn Clock>,
}

#[derive(Default)]
struct ProviderState {
    available: bool,
    last_known: Option<Reading>,
    sender: Option<mpsc::UnboundedSender<ProviderEvent>>,
    starts: usize,
    stops: usize,
    last_options: Option<Options>,
    route_cancel: Option<CancellationToken>,
}

/// A provider whose readings come from the test or a simulated route.
pub struct SimulatedProvider {
    kind: ProviderKind,
    state: Arc<Mutex<ProviderState>>,
    driver: Option<RouteDriver>,
}

impl SimulatedProvider {
    /// An available provider with no last known reading.
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(ProviderState {
                available: true,
                ..Default::default()
            })),
            driver: None,
        }
    }

    /// Emit readings along `route` every `interval_millis` while started.
    pub fn with_route(mut self, route: Route, clock: Arc<dyn Clock>) -> Self {
        self.driver = Some(RouteDriver { route, clock });
        self
    }

    /// Enable or disable the provider.
    ///
    /// Disabling a running provider reports it out of service on the stream.
    pub fn set_available(&self, available: bool) {
        let mut state = self.state.lock();
        state.available = available;
        if !available {
            if let Some(sender) = &state.sender {
                let _ = sender.send(ProviderEvent::Error(out_of_service(self.kind)));
            }
        }
    }

    pub fn set_last_known(&self, reading: Option<Reading>) {
        self.state.lock().last_known = reading;
    }

    /// Emit a reading. Returns false when the provider is not streaming.
    pub fn push_reading(&self, reading: Reading) -> bool {
        let mut state = self.state.lock();
        state.last_known = Some(reading.clone());
        match &state.sender {
            Some(sender) => sender.send(ProviderEvent::Reading(reading)).is_ok(),
            None => false,
        }
    }

    /// Emit a failure. Returns false when the provider is not streaming.
    pub fn push_error(&self, error: GeolocationError) -> bool {
        match &self.state.lock().sender {
            Some(sender) => sender.send(ProviderEvent::Error(error)).is_ok(),
            None => false,
        }
    }

    /// Drop the stream sender as if the platform went away.
    pub fn close_stream(&self) {
        let mut state = self.state.lock();
        state.sender = None;
        if let Some(cancel) = state.route_cancel.take() {
            cancel.cancel();
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state.lock().sender.is_some()
    }

    pub fn start_count(&self) -> usize {
        self.state.lock().starts
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().stops
    }

    /// Options passed to the most recent `start`.
    pub fn last_options(&self) -> Option<Options> {
        self.state.lock().last_options.clone()
    }
}

impl ProviderHandle for SimulatedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.state.lock().available
    }

    fn last_known_reading(&self) -> Option<Reading> {
        self.state.lock().last_known.clone()
    }

    fn start(&self, options: &Options) -> Result<ProviderStream, GeolocationError> {
        let mut state = self.state.lock();
        if !state.available {
            return Err(out_of_service(self.kind));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.sender = Some(tx);
        state.starts += 1;
        state.last_options = Some(options.clone());

        if let Some(previous) = state.route_cancel.take() {
            previous.cancel();
        }

        if let Some(driver) = &self.driver {
            let cancellation = CancellationToken::new();
            state.route_cancel = Some(cancellation.clone());
            let origin = state
                .last_known
                .as_ref()
                .map_or(driver.route.origin, Reading::position);
            spawn_route(
                Arc::clone(&self.state),
                self.kind,
                Route {
                    origin,
                    ..driver.route.clone()
                },
                Arc::clone(&driver.clock),
                options,
                cancellation,
            );
        }

        debug!(provider = %self.kind, "Simulated provider started");
        Ok(rx)
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        state.sender = None;
        state.stops += 1;
        if let Some(cancel) = state.route_cancel.take() {
            cancel.cancel();
        }
        debug!(provider = %self.kind, "Simulated provider stopped");
    }
}

fn out_of_service(kind: ProviderKind) -> GeolocationError {
    GeolocationError::PositionUnavailable(format!("Provider {} is out of service.", kind))
}

fn spawn_route(
    state: Arc<Mutex<ProviderState>>,
    kind: ProviderKind,
    route: Route,
    clock: Arc<dyn Clock>,
    options: &Options,
    cancellation: CancellationToken,
) {
    let interval = options.interval();
    let significant_only = options.use_significant_changes_only;
    let step_m = route.speed_mps * interval.as_secs_f64();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut position = route.origin;
        let mut last_emitted: Option<(f64, f64)> = None;

        loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let reading = Reading::new(
                position.0,
                position.1,
                route.accuracy_m,
                kind.as_str(),
                clock.now_millis(),
            )
            .with_heading(route.heading_deg)
            .with_speed(route.speed_mps);
            position = project(position, route.heading_deg, step_m);

            if significant_only {
                if let Some(previous) = last_emitted {
                    if distance_m(previous, reading.position()) < SIGNIFICANT_CHANGE_METERS {
                        continue;
                    }
                }
            }
            last_emitted = Some(reading.position());

            // stop() cancels under this lock, so a cancelled route never
            // reaches the sender of a later stream
            let mut guard = state.lock();
            if cancellation.is_cancelled() {
                break;
            }
            guard.last_known = Some(reading.clone());
            let delivered = guard
                .sender
                .as_ref()
                .is_some_and(|sender| sender.send(ProviderEvent::Reading(reading)).is_ok());
            if !delivered {
                break;
            }
        }
    });
}
