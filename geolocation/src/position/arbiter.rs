//! Reading quality arbitration.
//!
//! Decides whether a freshly received reading should replace the best
//! candidate held so far. The rule weighs staleness against accuracy:
//!
//! 1. Anything beats nothing.
//! 2. A reading more than two minutes newer always wins, one more than two
//!    minutes older always loses.
//! 3. Inside that window a strictly more accurate reading wins.
//! 4. A newer reading wins if it is not less accurate, or if it is at most
//!    200 accuracy units worse and comes from the same provider.

use super::reading::Reading;

/// Time delta beyond which a reading is "significantly" newer or older.
pub const SIGNIFICANT_AGE_MILLIS: i64 = 120_000;

/// Accuracy degradation tolerated for a newer reading from the same provider.
pub const SIGNIFICANT_ACCURACY_DELTA: f64 = 200.0;

/// Returns true if `candidate` should supersede `current`.
pub fn is_better(candidate: &Reading, current: Option<&Reading>) -> bool {
    let Some(current) = current else {
        return true;
    };

    let dt = candidate
        .timestamp_millis()
        .saturating_sub(current.timestamp_millis());
    if dt > SIGNIFICANT_AGE_MILLIS {
        return true;
    }
    if dt < -SIGNIFICANT_AGE_MILLIS {
        return false;
    }

    let da = candidate.horizontal_accuracy() - current.horizontal_accuracy();
    if da < 0.0 {
        return true;
    }

    let is_newer = dt > 0;
    if is_newer && da <= 0.0 {
        return true;
    }
    if is_newer
        && da <= SIGNIFICANT_ACCURACY_DELTA
        && candidate.provider_id() == current.provider_id()
    {
        return true;
    }

    false
}
