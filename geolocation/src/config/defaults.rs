//! Default values for all configuration settings.

use crate::position::{
    DEFAULT_DISTANCE_FILTER_METERS, DEFAULT_INTERVAL_MILLIS, DEFAULT_MAXIMUM_AGE_MILLIS,
    DEFAULT_MIN_UPDATE_INTERVAL_MILLIS, DEFAULT_TIMEOUT_MILLIS,
};

use super::file::config_directory;
use super::settings::*;

// =============================================================================
// Simulation
// =============================================================================

/// Default simulated start position (Toulouse-Blagnac).
pub const DEFAULT_SIM_LATITUDE: f64 = 43.6293;
pub const DEFAULT_SIM_LONGITUDE: f64 = 1.3638;

/// Default simulated course, degrees true.
pub const DEFAULT_SIM_HEADING_DEG: f64 = 90.0;

/// Default simulated ground speed (cycling pace).
pub const DEFAULT_SIM_SPEED_MPS: f64 = 5.0;

/// Default accuracy of the simulated GPS.
pub const DEFAULT_SIM_HIGH_ACCURACY_M: f64 = 8.0;

/// Default accuracy of the simulated network provider.
pub const DEFAULT_SIM_LOW_POWER_M: f64 = 120.0;

/// Default delay before the simulated user answers the prompt.
pub const DEFAULT_SIM_PROMPT_DELAY_MS: u64 = 500;

/// Default log file name inside the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "geolocation.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            request: RequestSettings {
                timeout_ms: DEFAULT_TIMEOUT_MILLIS,
                maximum_age_ms: DEFAULT_MAXIMUM_AGE_MILLIS,
                high_accuracy: false,
            },
            watch: WatchSettings {
                distance_filter_m: DEFAULT_DISTANCE_FILTER_METERS,
                min_update_interval_ms: DEFAULT_MIN_UPDATE_INTERVAL_MILLIS,
                interval_ms: DEFAULT_INTERVAL_MILLIS,
                significant_changes_only: false,
            },
            simulation: SimulationSettings {
                latitude: DEFAULT_SIM_LATITUDE,
                longitude: DEFAULT_SIM_LONGITUDE,
                heading_deg: DEFAULT_SIM_HEADING_DEG,
                speed_mps: DEFAULT_SIM_SPEED_MPS,
                high_accuracy_m: DEFAULT_SIM_HIGH_ACCURACY_M,
                low_power_m: DEFAULT_SIM_LOW_POWER_M,
                prompt_delay_ms: DEFAULT_SIM_PROMPT_DELAY_MS,
                grant: GrantMode::Fine,
            },
            logging: LoggingSettings {
                file: config_directory().join(DEFAULT_LOG_FILE_NAME),
            },
        }
    }
}
