//! Current command - acquire one position fix.

use std::time::Instant;

use tracing::info;

use super::common::SimulatedEnvironment;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the current command.
pub struct CurrentArgs {
    pub high_accuracy: bool,
    pub timeout_ms: Option<i64>,
    pub maximum_age_ms: Option<f64>,
}

/// Run the current command.
pub fn run(args: CurrentArgs, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug)?;
    runner.log_startup("current");
    let config = runner.config();

    // CLI takes precedence, then config
    let mut options = config.request_options();
    if args.high_accuracy {
        options = options.with_high_accuracy(true);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        options = options.with_timeout_millis(timeout_ms);
    }
    if let Some(maximum_age_ms) = args.maximum_age_ms {
        options = options.with_maximum_age_millis(maximum_age_ms);
    }

    runner.block_on(async {
        let env = SimulatedEnvironment::new(&config.simulation);
        env.authorize().await?;

        println!(
            "Acquiring position ({} tier, timeout {} ms)...",
            options.tier(),
            options.timeout_millis
        );
        let start = Instant::now();
        let reading = env.geolocation.get_current_position(options).await?;
        let elapsed = start.elapsed();

        info!(%reading, elapsed_ms = elapsed.as_millis() as u64, "Position acquired");
        println!("✓ {}", reading);
        if let Some(speed) = reading.speed() {
            println!("  Speed: {:.1} m/s", speed);
        }
        if let Some(heading) = reading.heading() {
            println!("  Heading: {:.0}°", heading);
        }
        println!("  Acquired in {:.2}s", elapsed.as_secs_f64());
        Ok::<(), CliError>(())
    })
}
