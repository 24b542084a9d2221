//! Authorize command - resolve the location permission.

use super::common::SimulatedEnvironment;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the authorize command.
pub fn run(debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug)?;
    runner.log_startup("authorize");
    let settings = &runner.config().simulation;

    runner.block_on(async {
        let env = SimulatedEnvironment::new(settings);
        let state = env.authorize().await?;
        let stats = env.geolocation.gate().stats();

        println!("Authorization: {}", state);
        println!("  Prompts shown: {}", stats.prompts_presented);
        println!("  Simulated grant: {}", settings.grant);
        Ok::<(), CliError>(())
    })
}
