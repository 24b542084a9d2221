//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use geolocation::config::ConfigFileError;
use geolocation::position::{ErrorKind, GeolocationError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// The coordinator reported a failure
    Position(GeolocationError),
}

impl CliError {
    /// Exit code for this error: 10 plus the position error code, else 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Position(e) => 10 + i32::from(e.kind().code()),
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Position(e) = self {
            match e.kind() {
                ErrorKind::PermissionDenied => {
                    eprintln!();
                    eprintln!("Location permission is not granted. Try:");
                    eprintln!("  1. geolocation authorize");
                    eprintln!("  2. Set grant = fine in the [simulation] section of config.ini");
                }
                ErrorKind::Timeout => {
                    eprintln!();
                    eprintln!(
                        "No position arrived in time. Raise --timeout-ms or [request] timeout_ms."
                    );
                }
                _ => {}
            }
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Position(e) => write!(f, "{} ({})", e, e.kind()),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Runtime(e) => Some(e),
            CliError::Position(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<GeolocationError> for CliError {
    fn from(e: GeolocationError) -> Self {
        CliError::Position(e)
    }
}
