//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::position::Options;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// One-shot request defaults
    pub request: RequestSettings,
    /// Watch subscription defaults
    pub watch: WatchSettings,
    /// Simulated environment used by the CLI
    pub simulation: SimulationSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// `[request]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSettings {
    pub timeout_ms: i64,
    /// `inf` means any cached reading is acceptable.
    pub maximum_age_ms: f64,
    pub high_accuracy: bool,
}

/// `[watch]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSettings {
    pub distance_filter_m: f64,
    /// -1 disables the interval filter.
    pub min_update_interval_ms: i64,
    pub interval_ms: i64,
    pub significant_changes_only: bool,
}

/// `[simulation]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub latitude: f64,
    pub longitude: f64,
    pub heading_deg: f64,
    pub speed_mps: f64,
    /// Accuracy of the simulated GPS.
    pub high_accuracy_m: f64,
    /// Accuracy of the simulated network provider.
    pub low_power_m: f64,
    /// Delay before the simulated user answers the permission prompt.
    pub prompt_delay_ms: u64,
    pub grant: GrantMode,
}

/// How the simulated user answers the permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantMode {
    /// Grant precise location.
    Fine,
    /// Grant approximate location only.
    Coarse,
    Deny,
    Restrict,
}

impl FromStr for GrantMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fine" => Ok(Self::Fine),
            "coarse" => Ok(Self::Coarse),
            "deny" => Ok(Self::Deny),
            "restrict" => Ok(Self::Restrict),
            other => Err(format!("unknown grant mode '{}'", other)),
        }
    }
}

impl fmt::Display for GrantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fine => write!(f, "fine"),
            Self::Coarse => write!(f, "coarse"),
            Self::Deny => write!(f, "deny"),
            Self::Restrict => write!(f, "restrict"),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub file: PathBuf,
}

impl ConfigFile {
    /// Options for a one-shot request, seeded from `[request]`.
    pub fn request_options(&self) -> Options {
        Options::default()
            .with_high_accuracy(self.request.high_accuracy)
            .with_timeout_millis(self.request.timeout_ms)
            .with_maximum_age_millis(self.request.maximum_age_ms)
    }

    /// Options for a watch, seeded from `[request]` and `[watch]`.
    pub fn watch_options(&self) -> Options {
        self.request_options()
            .with_distance_filter_meters(self.watch.distance_filter_m)
            .with_min_update_interval_millis(self.watch.min_update_interval_ms)
            .with_interval_millis(self.watch.interval_ms)
            .with_significant_changes_only(self.watch.significant_changes_only)
    }
}
