//! Position sample types.
//!
//! A [`Reading`] is one instantaneous fix reported by a provider. It is
//! immutable once built: the optional fields are filled in with the
//! `with_*` builders at construction time and only read afterwards.

use std::fmt;

/// One position sample from a provider.
///
/// Accuracies are radii in meters, lower is better. Timestamps are
/// milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    latitude: f64,
    longitude: f64,
    altitude: Option<f64>,
    horizontal_accuracy: f64,
    vertical_accuracy: Option<f64>,
    heading: Option<f64>,
    speed: Option<f64>,
    provider_id: String,
    timestamp_millis: i64,
    is_mocked: bool,
}

impl Reading {
    /// Create a reading with the mandatory fields.
    pub fn new(
        latitude: f64,
        longitude: f64,
        horizontal_accuracy: f64,
        provider_id: impl Into<String>,
        timestamp_millis: i64,
    ) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            horizontal_accuracy,
            vertical_accuracy: None,
            heading: None,
            speed: None,
            provider_id: provider_id.into(),
            timestamp_millis,
            is_mocked: false,
        }
    }

    /// Altitude above the reference ellipsoid in meters.
    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_vertical_accuracy(mut self, vertical_accuracy: f64) -> Self {
        self.vertical_accuracy = Some(vertical_accuracy);
        self
    }

    /// Course over ground in degrees true (0-360).
    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    /// Ground speed in meters per second.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Mark the reading as produced by a mock location source.
    pub fn with_mocked(mut self, is_mocked: bool) -> Self {
        self.is_mocked = is_mocked;
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    pub fn horizontal_accuracy(&self) -> f64 {
        self.horizontal_accuracy
    }

    pub fn vertical_accuracy(&self) -> Option<f64> {
        self.vertical_accuracy
    }

    pub fn heading(&self) -> Option<f64> {
        self.heading
    }

    pub fn speed(&self) -> Option<f64> {
        self.speed
    }

    /// Identifier of the provider that produced this reading (e.g. "gps").
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    pub fn is_mocked(&self) -> bool {
        self.is_mocked
    }

    /// Position as a (latitude, longitude) tuple.
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Age of the reading relative to `now_millis`.
    ///
    /// Negative when the reading is timestamped in the future.
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.timestamp_millis)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6}, {:.6} ±{:.0}m via {} @ {}",
            self.latitude,
            self.longitude,
            self.horizontal_accuracy,
            self.provider_id,
            self.timestamp_millis
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_leaves_optional_fields_absent() {
        let reading = Reading::new(43.6, 1.4, 12.0, "gps", 1_000);

        assert_eq!(reading.position(), (43.6, 1.4));
        assert_eq!(reading.horizontal_accuracy(), 12.0);
        assert_eq!(reading.provider_id(), "gps");
        assert_eq!(reading.timestamp_millis(), 1_000);
        assert!(reading.altitude().is_none());
        assert!(reading.vertical_accuracy().is_none());
        assert!(reading.heading().is_none());
        assert!(reading.speed().is_none());
        assert!(!reading.is_mocked());
    }

    #[test]
    fn test_builders_fill_optional_fields() {
        let reading = Reading::new(43.6, 1.4, 12.0, "gps", 1_000)
            .with_altitude(150.0)
            .with_vertical_accuracy(8.0)
            .with_heading(270.0)
            .with_speed(3.5)
            .with_mocked(true);

        assert_eq!(reading.altitude(), Some(150.0));
        assert_eq!(reading.vertical_accuracy(), Some(8.0));
        assert_eq!(reading.heading(), Some(270.0));
        assert_eq!(reading.speed(), Some(3.5));
        assert!(reading.is_mocked());
    }

    #[test]
    fn test_age_millis() {
        let reading = Reading::new(0.0, 0.0, 5.0, "network", 10_000);
        assert_eq!(reading.age_millis(70_000), 60_000);
        assert_eq!(reading.age_millis(5_000), -5_000);
    }

    #[test]
    fn test_display() {
        let reading = Reading::new(43.6, 1.4, 12.0, "gps", 1_000);
        assert_eq!(reading.to_string(), "43.600000, 1.400000 ±12m via gps @ 1000");
    }
}
