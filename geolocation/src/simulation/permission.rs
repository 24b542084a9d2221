//! Scriptable permission host.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::position::{AuthorizationState, GeolocationError, PermissionHost, PermissionScope};

/// How the simulated user answers a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptBehavior {
    /// Answer as soon as the prompt is shown.
    Answer(AuthorizationState),
    /// Answer after a delay.
    AnswerAfter(AuthorizationState, Duration),
    /// Leave the prompt open until [`SimulatedPermissionHost::answer`].
    Defer,
}

struct HostState {
    state: AuthorizationState,
    fine: bool,
    coarse: bool,
    context_available: bool,
    behavior: PromptBehavior,
    prompts: usize,
    deferred: Vec<oneshot::Sender<AuthorizationState>>,
}

impl HostState {
    fn resolve(&mut self, answer: AuthorizationState, reply: oneshot::Sender<AuthorizationState>) {
        self.state = answer;
        // The gate may have been dropped meanwhile
        let _ = reply.send(answer);
    }
}

/// A permission host backed by in-memory state.
///
/// Scopes are only reported as held while the state is `Granted`.
pub struct SimulatedPermissionHost {
    inner: Arc<Mutex<HostState>>,
}

impl SimulatedPermissionHost {
    /// A host in `state` with both scopes available once granted.
    pub fn new(state: AuthorizationState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HostState {
                state,
                fine: true,
                coarse: true,
                context_available: true,
                behavior: PromptBehavior::Defer,
                prompts: 0,
                deferred: Vec::new(),
            })),
        }
    }

    /// Already granted, fine and coarse.
    pub fn granted() -> Self {
        Self::new(AuthorizationState::Granted)
    }

    /// Undetermined, answering prompts as `behavior` says.
    pub fn not_determined(behavior: PromptBehavior) -> Self {
        Self::new(AuthorizationState::NotDetermined).with_behavior(behavior)
    }

    pub fn with_behavior(self, behavior: PromptBehavior) -> Self {
        self.inner.lock().behavior = behavior;
        self
    }

    /// Scopes held while granted.
    pub fn with_scopes(self, fine: bool, coarse: bool) -> Self {
        {
            let mut inner = self.inner.lock();
            inner.fine = fine;
            inner.coarse = coarse;
        }
        self
    }

    /// Whether a foreground context exists to show a prompt.
    pub fn with_context_available(self, available: bool) -> Self {
        self.inner.lock().context_available = available;
        self
    }

    /// Change the state behind the gate's back, as a settings change would.
    pub fn set_state(&self, state: AuthorizationState) {
        self.inner.lock().state = state;
    }

    /// Answer every deferred prompt.
    pub fn answer(&self, answer: AuthorizationState) {
        let mut inner = self.inner.lock();
        inner.state = answer;
        for reply in std::mem::take(&mut inner.deferred) {
            inner.resolve(answer, reply);
        }
    }

    /// Close every deferred prompt without an answer.
    pub fn dismiss_prompts(&self) {
        self.inner.lock().deferred.clear();
    }

    /// Number of prompts shown so far.
    pub fn prompt_count(&self) -> usize {
        self.inner.lock().prompts
    }
}

impl PermissionHost for SimulatedPermissionHost {
    fn authorization_state(&self) -> AuthorizationState {
        self.inner.lock().state
    }

    fn has_scope(&self, scope: PermissionScope) -> bool {
        let inner = self.inner.lock();
        if inner.state != AuthorizationState::Granted {
            return false;
        }
        match scope {
            PermissionScope::Fine => inner.fine,
            PermissionScope::Coarse => inner.coarse,
        }
    }

    fn present_prompt(&self) -> Result<oneshot::Receiver<AuthorizationState>, GeolocationError> {
        let mut inner = self.inner.lock();
        if !inner.context_available {
            return Err(GeolocationError::HostContextUnavailable(
                "no foreground context to present the permission prompt".to_string(),
            ));
        }

        inner.prompts += 1;
        let (reply, rx) = oneshot::channel();
        let behavior = inner.behavior;
        match behavior {
            PromptBehavior::Answer(answer) => inner.resolve(answer, reply),
            PromptBehavior::AnswerAfter(answer, delay) => {
                let host = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    host.lock().resolve(answer, reply);
                });
            }
            PromptBehavior::Defer => inner.deferred.push(reply),
        }

        Ok(rx)
    }
}
