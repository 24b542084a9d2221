//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let request = &config.request;
    let watch = &config.watch;
    let sim = &config.simulation;

    format!(
        r#"[request]
; Deadline for a one-shot position request (milliseconds)
timeout_ms = {}
; Maximum age of a cached position that is returned without querying a provider.
; Use 'inf' to accept any cached position, 0 to always query.
maximum_age_ms = {}
; Prefer the satellite provider over the network provider
high_accuracy = {}

[watch]
; Minimum movement between two delivered positions (meters, 0 to disable)
distance_filter_m = {}
; Minimum time between two delivered positions (milliseconds, -1 to disable)
min_update_interval_ms = {}
; Desired provider update period (milliseconds)
interval_ms = {}
; Only report significant position changes (saves power)
significant_changes_only = {}

[simulation]
; Simulated environment used by the CLI commands
latitude = {}
longitude = {}
; Course in degrees true and ground speed in meters per second
heading_deg = {}
speed_mps = {}
; Accuracy reported by the simulated satellite and network providers (meters)
high_accuracy_m = {}
low_power_m = {}
; How long the simulated user takes to answer the permission prompt (milliseconds)
prompt_delay_ms = {}
; Simulated answer to the permission prompt:
;   fine     - precise location granted
;   coarse   - approximate location only
;   deny     - permission denied
;   restrict - location restricted by policy
grant = {}

[logging]
; Log file location (cleared at the start of each session)
file = {}
"#,
        request.timeout_ms,
        request.maximum_age_ms,
        request.high_accuracy,
        watch.distance_filter_m,
        watch.min_update_interval_ms,
        watch.interval_ms,
        watch.significant_changes_only,
        sim.latitude,
        sim.longitude,
        sim.heading_deg,
        sim.speed_mps,
        sim.high_accuracy_m,
        sim.low_power_m,
        sim.prompt_delay_ms,
        sim.grant,
        config.logging.file.display(),
    )
}
