//! Cancellable deadline timer.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// A deferred callback that fires once after a delay unless cancelled.
///
/// Cancelling is idempotent: cancelling twice, or after the callback has
/// already fired, does nothing. Dropping the timer cancels it.
#[derive(Debug)]
pub struct DeadlineTimer {
    cancellation: CancellationToken,
}

impl DeadlineTimer {
    /// Schedule `on_fire` to run after `delay` on the current tokio runtime.
    pub fn schedule<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let cancellation = CancellationToken::new();
        let token = cancellation.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if !token.is_cancelled() {
                        on_fire();
                    }
                }
            }
        });

        Self { cancellation }
    }

    /// Cancel the timer.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}
