//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [request] section
    if let Some(section) = ini.section(Some("request")) {
        if let Some(v) = parse_value(section, "request", "timeout_ms", "must be an integer (milliseconds)")? {
            config.request.timeout_ms = v;
        }
        if let Some(v) = section.get("maximum_age_ms") {
            config.request.maximum_age_ms = parse_maximum_age(v)?;
        }
        if let Some(v) = section.get("high_accuracy") {
            config.request.high_accuracy = parse_bool(v);
        }
    }

    // [watch] section
    if let Some(section) = ini.section(Some("watch")) {
        if let Some(v) = parse_value(section, "watch", "distance_filter_m", "must be a number (meters)")? {
            config.watch.distance_filter_m = v;
        }
        if let Some(v) = parse_value(
            section,
            "watch",
            "min_update_interval_ms",
            "must be an integer (milliseconds, -1 to disable)",
        )? {
            config.watch.min_update_interval_ms = v;
        }
        if let Some(v) = parse_value(section, "watch", "interval_ms", "must be an integer (milliseconds)")? {
            config.watch.interval_ms = v;
        }
        if let Some(v) = section.get("significant_changes_only") {
            config.watch.significant_changes_only = parse_bool(v);
        }
    }

    // [simulation] section
    if let Some(section) = ini.section(Some("simulation")) {
        let sim = &mut config.simulation;
        if let Some(v) = parse_value(section, "simulation", "latitude", "must be a number (degrees)")? {
            sim.latitude = check_range("latitude", v, -90.0, 90.0)?;
        }
        if let Some(v) = parse_value(section, "simulation", "longitude", "must be a number (degrees)")? {
            sim.longitude = check_range("longitude", v, -180.0, 180.0)?;
        }
        if let Some(v) = parse_value(section, "simulation", "heading_deg", "must be a number (degrees)")? {
            sim.heading_deg = v;
        }
        if let Some(v) = parse_value(section, "simulation", "speed_mps", "must be a number (m/s)")? {
            sim.speed_mps = v;
        }
        if let Some(v) = parse_value(section, "simulation", "high_accuracy_m", "must be a number (meters)")? {
            sim.high_accuracy_m = v;
        }
        if let Some(v) = parse_value(section, "simulation", "low_power_m", "must be a number (meters)")? {
            sim.low_power_m = v;
        }
        if let Some(v) = parse_value(
            section,
            "simulation",
            "prompt_delay_ms",
            "must be a positive integer (milliseconds)",
        )? {
            sim.prompt_delay_ms = v;
        }
        if let Some(v) = parse_value(
            section,
            "simulation",
            "grant",
            "must be one of: fine, coarse, deny, restrict",
        )? {
            sim.grant = v;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Parse `key` from `section` if present.
fn parse_value<T: FromStr>(
    properties: &Properties,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<Option<T>, ConfigFileError> {
    let Some(v) = properties.get(key) else {
        return Ok(None);
    };

    v.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: v.to_string(),
            reason: reason.to_string(),
        })
}

fn parse_maximum_age(value: &str) -> Result<f64, ConfigFileError> {
    let invalid = || ConfigFileError::InvalidValue {
        section: "request".to_string(),
        key: "maximum_age_ms".to_string(),
        value: value.to_string(),
        reason: "must be a non-negative number (milliseconds) or 'inf'".to_string(),
    };

    let parsed: f64 = value.trim().parse().map_err(|_| invalid())?;
    if parsed.is_nan() || parsed < 0.0 {
        return Err(invalid());
    }
    Ok(parsed)
}

fn check_range(key: &str, value: f64, min: f64, max: f64) -> Result<f64, ConfigFileError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigFileError::InvalidValue {
            section: "simulation".to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: format!("must be between {} and {}", min, max),
        })
    }
}

/// Parse a boolean value from config.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
