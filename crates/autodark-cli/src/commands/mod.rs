pub mod calibrate;
pub mod config;
pub mod info;
pub mod match_frames;

use autodark_core::config::MatchTolerances;
use clap::Args;

/// Matching tolerances shared by `calibrate` and `match`. Unset flags keep the base value.
#[derive(Args, Debug, Default)]
pub struct ToleranceArgs {
    /// Maximum time difference in seconds between a calibration frame and its target
    #[arg(long)]
    pub max_time_diff: Option<i64>,

    /// Minimum exposure equality in percent (100 = identical)
    #[arg(long)]
    pub min_exposure_equality: Option<f64>,

    /// Minimum number of dark frames required
    #[arg(long)]
    pub min_calfiles: Option<usize>,

    /// Maximum number of calibration frames per master
    #[arg(long)]
    pub max_calfiles: Option<usize>,
}

impl ToleranceArgs {
    pub fn apply(&self, base: &mut MatchTolerances) {
        if let Some(v) = self.max_time_diff {
            base.max_time_diff_secs = v;
        }
        if let Some(v) = self.min_exposure_equality {
            base.min_exposure_equality_pct = v;
        }
        if let Some(v) = self.min_calfiles {
            base.min_calfiles = v;
        }
        if let Some(v) = self.max_calfiles {
            base.max_calfiles = v;
        }
    }
}
