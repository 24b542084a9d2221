//! Periodic watch registry logging.
//!
//! Emits a DEBUG line with the number of active watches and the tier
//! driving the shared stream, until cancelled.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::watch::WatchRegistry;

/// Default logging interval (30 seconds).
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Spawns a background task that periodically logs the registry status.
///
/// Callers should check `tracing::enabled!(tracing::Level::DEBUG)` first;
/// the task is pointless when DEBUG is filtered out.
pub fn spawn_watch_logger(
    registry: WatchRegistry,
    cancellation: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => log_status(&registry),
                _ = cancellation.cancelled() => {
                    tracing::debug!("Watch logger stopped");
                    break;
                }
            }
        }
    })
}

fn log_status(registry: &WatchRegistry) {
    let status = registry.status();
    match status.driving {
        Some(kind) => tracing::debug!(
            watches = status.active_watches,
            provider = %kind,
            "Watch registry status"
        ),
        None => tracing::debug!(watches = status.active_watches, "Watch registry idle"),
    }
}
