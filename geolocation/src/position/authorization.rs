//! Authorization gate.
//!
//! Wraps the host permission system in a single-flight state machine:
//!
//! ```text
//! NotDetermined ──prompt──► Granted | Denied | Restricted
//! ```
//!
//! Once a terminal state is observed it is returned immediately without
//! prompting again. While a prompt is outstanding, later callers attach to
//! the same result instead of opening a second prompt.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use super::error::GeolocationError;

/// Process-wide location authorization state as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationState {
    #[default]
    NotDetermined,
    Granted,
    Denied,
    Restricted,
}

impl AuthorizationState {
    /// True for every state a prompt can resolve to.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::NotDetermined)
    }
}

impl fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDetermined => write!(f, "notDetermined"),
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Restricted => write!(f, "restricted"),
        }
    }
}

/// Location permission scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionScope {
    /// Precise location, required by the high-accuracy provider.
    Fine,
    /// Approximate location, required by the low-power provider.
    Coarse,
}

/// The host permission system.
pub trait PermissionHost: Send + Sync {
    /// Current authorization state.
    fn authorization_state(&self) -> AuthorizationState;

    /// Whether the given scope is currently held.
    fn has_scope(&self, scope: PermissionScope) -> bool;

    /// Show the permission prompt.
    ///
    /// The receiver resolves with the user's answer. Returns
    /// `HostContextUnavailable` when no prompt can be shown. Dropping the
    /// sender without answering is treated the same way.
    fn present_prompt(&self) -> Result<oneshot::Receiver<AuthorizationState>, GeolocationError>;
}

type PromptResult = Result<AuthorizationState, GeolocationError>;

/// Prompt statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    /// Prompts actually presented to the host.
    pub prompts_presented: u64,
    /// Callers that attached to an outstanding prompt.
    pub callers_coalesced: u64,
}

#[derive(Default)]
struct GateState {
    cached: Option<AuthorizationState>,
    in_flight: Option<broadcast::Sender<PromptResult>>,
    stats: GateStats,
}

/// Single-flight wrapper around a [`PermissionHost`].
#[derive(Clone)]
pub struct AuthorizationGate {
    host: Arc<dyn PermissionHost>,
    state: Arc<Mutex<GateState>>,
}

impl AuthorizationGate {
    pub fn new(host: Arc<dyn PermissionHost>) -> Self {
        Self {
            host,
            state: Arc::new(Mutex::new(GateState::default())),
        }
    }

    /// Resolve the authorization state, prompting the user if undetermined.
    pub async fn request_authorization(&self) -> PromptResult {
        let mut result_rx = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let observed = self.host.authorization_state();
            state.cached = Some(observed);

            if observed.is_terminal() {
                debug!(state = %observed, "Authorization already determined");
                return Ok(observed);
            }

            match &state.in_flight {
                Some(tx) => {
                    let rx = tx.subscribe();
                    state.stats.callers_coalesced += 1;
                    debug!("Attached to outstanding permission prompt");
                    rx
                }
                None => {
                    let prompt = self.host.present_prompt()?;
                    let (tx, rx) = broadcast::channel(1);
                    state.in_flight = Some(tx);
                    state.stats.prompts_presented += 1;
                    info!("Presenting location permission prompt");
                    self.spawn_completion(prompt);
                    rx
                }
            }
        };

        result_rx.recv().await.unwrap_or_else(|_| {
            Err(GeolocationError::HostContextUnavailable(
                "permission prompt was abandoned".to_string(),
            ))
        })
    }

    /// Waits for the host's answer, caches it and wakes every attached caller.
    fn spawn_completion(&self, prompt: oneshot::Receiver<AuthorizationState>) {
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let result = match prompt.await {
                Ok(answer) => {
                    info!(state = %answer, "Permission prompt answered");
                    Ok(answer)
                }
                Err(_) => {
                    warn!("Permission prompt dismissed without an answer");
                    Err(GeolocationError::HostContextUnavailable(
                        "permission prompt closed without an answer".to_string(),
                    ))
                }
            };

            let mut guard = state.lock();
            if let Ok(answer) = &result {
                guard.cached = Some(*answer);
            }
            if let Some(tx) = guard.in_flight.take() {
                // No receivers left means every caller gave up
                let _ = tx.send(result);
            }
        });
    }

    /// Fail with `PermissionDenied` unless location access is granted.
    ///
    /// Requires a `Granted` state and at least one scope. Which tier the
    /// scopes allow is the provider selector's concern.
    pub fn ensure_granted(&self) -> Result<(), GeolocationError> {
        let observed = self.current_state();
        if observed != AuthorizationState::Granted {
            return Err(GeolocationError::PermissionDenied(format!(
                "location authorization is {}",
                observed
            )));
        }

        let has_any_scope = self.host.has_scope(PermissionScope::Fine)
            || self.host.has_scope(PermissionScope::Coarse);
        if !has_any_scope {
            return Err(GeolocationError::PermissionDenied(
                "no location permission scope is held".to_string(),
            ));
        }

        Ok(())
    }

    /// Observe the host state now and cache it.
    pub fn current_state(&self) -> AuthorizationState {
        let observed = self.host.authorization_state();
        self.state.lock().cached = Some(observed);
        observed
    }

    /// Last state observed by the gate, if any.
    pub fn cached_state(&self) -> Option<AuthorizationState> {
        self.state.lock().cached
    }

    /// Whether a prompt is currently outstanding.
    pub fn is_prompting(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    pub fn stats(&self) -> GateStats {
        self.state.lock().stats
    }
}

impl fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationGate")
            .field("cached", &self.cached_state())
            .field("stats", &self.stats())
            .finish()
    }
}
