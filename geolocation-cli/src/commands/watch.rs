//! Watch command - follow position updates until enough readings arrive.

use geolocation::position::{spawn_watch_logger, WatchEvent, DEFAULT_LOG_INTERVAL};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

use super::common::SimulatedEnvironment;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the watch command.
pub struct WatchArgs {
    pub count: usize,
    pub distance_filter: Option<f64>,
    pub high_accuracy: bool,
}

/// Run the watch command.
pub fn run(args: WatchArgs, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug)?;
    runner.log_startup("watch");
    let config = runner.config();

    let mut options = config.watch_options();
    if args.high_accuracy {
        options = options.with_high_accuracy(true);
    }
    if let Some(distance) = args.distance_filter {
        options = options.with_distance_filter_meters(distance);
    }

    runner.block_on(async {
        let mut env = SimulatedEnvironment::new(&config.simulation);
        env.authorize().await?;

        let id = env.geolocation.watch_position(options.clone())?;
        let shutdown = CancellationToken::new();
        let logger = tracing::enabled!(Level::DEBUG).then(|| {
            spawn_watch_logger(
                env.geolocation.watches().clone(),
                shutdown.clone(),
                DEFAULT_LOG_INTERVAL,
            )
        });

        println!(
            "Watch {} started ({} tier, every {} ms, filter {} m). Ctrl-C to stop.",
            id,
            options.tier(),
            options.interval_millis,
            options.distance_filter_meters
        );

        let mut received = 0;
        while received < args.count {
            let event = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
                event = env.events.recv() => event,
            };

            match event {
                Some(WatchEvent::Reading { reading, .. }) => {
                    received += 1;
                    println!("[{}/{}] {}", received, args.count, reading);
                }
                Some(WatchEvent::Error { kind, message, .. }) => {
                    warn!(%kind, %message, "Watch error");
                    eprintln!("  ! {}: {}", kind, message);
                }
                None => break,
            }
        }

        env.geolocation.stop_observing();
        shutdown.cancel();
        if let Some(logger) = logger {
            let _ = logger.await;
        }

        println!("Received {} reading(s)", received);
        Ok::<(), CliError>(())
    })
}
