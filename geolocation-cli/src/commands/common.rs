//! Simulated platform shared across CLI commands.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use geolocation::config::{GrantMode, SimulationSettings};
use geolocation::position::{AuthorizationState, Geolocation, ProviderKind, WatchEvent};
use geolocation::simulation::{PromptBehavior, Route, SimulatedPermissionHost, SimulatedProvider};
use geolocation::time::SystemClock;

use crate::error::CliError;

/// A coordinator wired to simulated providers and a simulated user.
pub struct SimulatedEnvironment {
    pub geolocation: Geolocation,
    pub events: mpsc::UnboundedReceiver<WatchEvent>,
}

impl SimulatedEnvironment {
    /// Build from the `[simulation]` section.
    pub fn new(settings: &SimulationSettings) -> Self {
        let clock = Arc::new(SystemClock);
        let route = |accuracy_m| Route {
            origin: (settings.latitude, settings.longitude),
            heading_deg: settings.heading_deg,
            speed_mps: settings.speed_mps,
            accuracy_m,
        };

        let gps = SimulatedProvider::new(ProviderKind::HighAccuracy)
            .with_route(route(settings.high_accuracy_m), clock.clone());
        let network = SimulatedProvider::new(ProviderKind::LowPower)
            .with_route(route(settings.low_power_m), clock.clone());

        let (geolocation, events) = Geolocation::with_clock(
            Arc::new(gps),
            Arc::new(network),
            Arc::new(permission_host(settings)),
            clock,
        );

        Self {
            geolocation,
            events,
        }
    }

    /// Resolve the permission, prompting the simulated user if needed.
    pub async fn authorize(&self) -> Result<AuthorizationState, CliError> {
        let state = self.geolocation.gate().current_state();
        if state == AuthorizationState::NotDetermined {
            println!("Requesting location permission...");
        }

        let state = self.geolocation.request_authorization().await?;
        info!(state = %state, "Authorization resolved");
        Ok(state)
    }
}

/// Simulated user answering with the configured grant after the prompt delay.
fn permission_host(settings: &SimulationSettings) -> SimulatedPermissionHost {
    let delay = Duration::from_millis(settings.prompt_delay_ms);
    let (answer, fine, coarse) = match settings.grant {
        GrantMode::Fine => (AuthorizationState::Granted, true, true),
        GrantMode::Coarse => (AuthorizationState::Granted, false, true),
        GrantMode::Deny => (AuthorizationState::Denied, false, false),
        GrantMode::Restrict => (AuthorizationState::Restricted, false, false),
    };

    SimulatedPermissionHost::not_determined(PromptBehavior::AnswerAfter(answer, delay))
        .with_scopes(fine, coarse)
}
