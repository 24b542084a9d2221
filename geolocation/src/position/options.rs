//! Per-request acquisition options.

use std::time::Duration;

use super::provider::ProviderKind;

/// Default request timeout (10 minutes).
pub const DEFAULT_TIMEOUT_MILLIS: i64 = 600_000;

/// Default cached-reading age bound (any age is acceptable).
pub const DEFAULT_MAXIMUM_AGE_MILLIS: f64 = f64::INFINITY;

/// Default watch distance filter in meters.
pub const DEFAULT_DISTANCE_FILTER_METERS: f64 = 100.0;

/// Default minimum interval between watch deliveries (-1 = unconstrained).
pub const DEFAULT_MIN_UPDATE_INTERVAL_MILLIS: i64 = -1;

/// Default desired provider update period.
pub const DEFAULT_INTERVAL_MILLIS: i64 = 10_000;

/// Options for a one-shot query or a watch subscription.
///
/// Built once per request from [`Options::default`] and the `with_*`
/// builders, then passed by value and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Prefer the high-accuracy provider.
    pub high_accuracy: bool,
    /// Deadline for a one-shot query.
    pub timeout_millis: i64,
    /// Maximum age of a cached reading that counts as a cache hit.
    pub maximum_age_millis: f64,
    /// Watch only: suppress readings closer than this to the last delivered one.
    pub distance_filter_meters: f64,
    /// Watch only: suppress readings sooner than this after the last delivered one.
    pub min_update_interval_millis: i64,
    /// Desired provider update period, forwarded to the provider.
    pub interval_millis: i64,
    /// Ask the provider to report only significant position changes.
    pub use_significant_changes_only: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            high_accuracy: false,
            timeout_millis: DEFAULT_TIMEOUT_MILLIS,
            maximum_age_millis: DEFAULT_MAXIMUM_AGE_MILLIS,
            distance_filter_meters: DEFAULT_DISTANCE_FILTER_METERS,
            min_update_interval_millis: DEFAULT_MIN_UPDATE_INTERVAL_MILLIS,
            interval_millis: DEFAULT_INTERVAL_MILLIS,
            use_significant_changes_only: false,
        }
    }
}

impl Options {
    pub fn with_high_accuracy(mut self, high_accuracy: bool) -> Self {
        self.high_accuracy = high_accuracy;
        self
    }

    pub fn with_timeout_millis(mut self, timeout_millis: i64) -> Self {
        self.timeout_millis = timeout_millis;
        self
    }

    pub fn with_maximum_age_millis(mut self, maximum_age_millis: f64) -> Self {
        self.maximum_age_millis = maximum_age_millis;
        self
    }

    pub fn with_distance_filter_meters(mut self, distance_filter_meters: f64) -> Self {
        self.distance_filter_meters = distance_filter_meters;
        self
    }

    pub fn with_min_update_interval_millis(mut self, min_update_interval_millis: i64) -> Self {
        self.min_update_interval_millis = min_update_interval_millis;
        self
    }

    pub fn with_interval_millis(mut self, interval_millis: i64) -> Self {
        self.interval_millis = interval_millis;
        self
    }

    pub fn with_significant_changes_only(mut self, significant_only: bool) -> Self {
        self.use_significant_changes_only = significant_only;
        self
    }

    /// Provider tier these options ask for.
    pub fn tier(&self) -> ProviderKind {
        ProviderKind::for_accuracy(self.high_accuracy)
    }

    /// Request timeout as a `Duration`. Negative values mean "expire immediately".
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis.max(0) as u64)
    }

    /// Provider update period as a `Duration`, never shorter than 1 ms.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis.max(1) as u64)
    }

    /// True when a reading of the given age is fresh enough to be served from cache.
    pub fn accepts_cached_age(&self, age_millis: i64) -> bool {
        (age_millis as f64) < self.maximum_age_millis
    }
}
