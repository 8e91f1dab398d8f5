use chrono::{DateTime, Utc};

use crate::config::MatchTolerances;
use crate::consts::FULL_EXPOSURE_EQUALITY_PCT;
use crate::frame::FrameMetadata;
use crate::time::seconds_between;

/// What calibration frames are matched against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchTarget {
    pub timestamp: DateTime<Utc>,
    /// Seconds. Zero means exposure is ignored (bias matching).
    pub exposure: f64,
}

impl MatchTarget {
    pub fn new(timestamp: DateTime<Utc>, exposure: f64) -> Self {
        Self {
            timestamp,
            exposure,
        }
    }

    /// Bias frames carry no meaningful exposure, so only time is matched.
    pub fn bias(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, 0.0)
    }

    pub fn is_bias(&self) -> bool {
        self.exposure <= 0.0
    }
}

/// How close a calibration candidate is to its target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchScore {
    pub time_diff_secs: i64,
    pub exposure_ratio_pct: f64,
}

impl MatchScore {
    pub fn compute(candidate: &FrameMetadata, target: &MatchTarget) -> Self {
        Self {
            time_diff_secs: seconds_between(candidate.timestamp, target.timestamp),
            exposure_ratio_pct: exposure_ratio(candidate.exposure, target.exposure),
        }
    }

    /// Both bounds are inclusive.
    pub fn qualifies(&self, tolerances: &MatchTolerances) -> bool {
        self.time_diff_secs <= tolerances.max_time_diff_secs
            && self.exposure_ratio_pct >= tolerances.min_exposure_equality_pct
    }
}

/// min/max of the two exposures as a percentage; 100 when the target has no exposure.
pub fn exposure_ratio(candidate: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return FULL_EXPOSURE_EQUALITY_PCT;
    }
    let (lo, hi) = if candidate < target {
        (candidate, target)
    } else {
        (target, candidate)
    };
    lo / hi * 100.0
}
