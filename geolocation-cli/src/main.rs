//! Geolocation CLI - Command-line interface
//!
//! Drives the position-acquisition coordinator against simulated providers
//! configured in `~/.geolocation/config.ini`.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::current::CurrentArgs;
use commands::watch::WatchArgs;

#[derive(Parser)]
#[command(name = "geolocation")]
#[command(version = geolocation::VERSION)]
#[command(about = "Acquire positions from simulated location providers", long_about = None)]
struct Cli {
    /// Enable debug-level logging (also echoed to stdout)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request location permission, prompting if undetermined
    Authorize,

    /// Acquire one position fix
    Current {
        /// Prefer the high-accuracy provider
        #[arg(long)]
        high_accuracy: bool,

        /// Deadline in milliseconds (overrides [request] timeout_ms)
        #[arg(long)]
        timeout_ms: Option<i64>,

        /// Accept a cached reading younger than this many milliseconds
        #[arg(long)]
        maximum_age_ms: Option<f64>,
    },

    /// Follow position updates
    Watch {
        /// Stop after this many readings
        #[arg(long, default_value = "5")]
        count: usize,

        /// Minimum movement in meters between readings
        #[arg(long)]
        distance_filter: Option<f64>,

        /// Prefer the high-accuracy provider
        #[arg(long)]
        high_accuracy: bool,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Authorize => commands::authorize::run(cli.debug),
        Commands::Current {
            high_accuracy,
            timeout_ms,
            maximum_age_ms,
        } => commands::current::run(
            CurrentArgs {
                high_accuracy,
                timeout_ms,
                maximum_age_ms,
            },
            cli.debug,
        ),
        Commands::Watch {
            count,
            distance_filter,
            high_accuracy,
        } => commands::watch::run(
            WatchArgs {
                count,
                distance_filter,
                high_accuracy,
            },
            cli.debug,
        ),
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
