use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_JOBS_PER_CORE, DEFAULT_MAX_CALFILES, DEFAULT_MAX_TIME_DIFF_SECS,
    DEFAULT_MIN_CALFILES, DEFAULT_MIN_EXPOSURE_EQUALITY_PCT,
};
use crate::error::{AutodarkError, Result};

/// Windows a calibration frame must fall into to be used for a target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchTolerances {
    /// Largest allowed |candidate time - target time|, inclusive.
    pub max_time_diff_secs: i64,
    /// Smallest allowed exposure equality in percent, inclusive.
    pub min_exposure_equality_pct: f64,
    /// Dark masters built from fewer frames are rejected.
    pub min_calfiles: usize,
    /// Scanning stops once this many frames qualified.
    pub max_calfiles: usize,
}

impl Default for MatchTolerances {
    fn default() -> Self {
        Self {
            max_time_diff_secs: DEFAULT_MAX_TIME_DIFF_SECS,
            min_exposure_equality_pct: DEFAULT_MIN_EXPOSURE_EQUALITY_PCT,
            min_calfiles: DEFAULT_MIN_CALFILES,
            max_calfiles: DEFAULT_MAX_CALFILES,
        }
    }
}

impl MatchTolerances {
    pub fn validate(&self) -> Result<()> {
        if self.max_time_diff_secs < 0 {
            return Err(AutodarkError::Config(format!(
                "max time difference must not be negative, got {}",
                self.max_time_diff_secs
            )));
        }
        if !(0.0..=100.0).contains(&self.min_exposure_equality_pct) {
            return Err(AutodarkError::Config(format!(
                "exposure equality must be within 0..=100 percent, got {}",
                self.min_exposure_equality_pct
            )));
        }
        if self.max_calfiles == 0 {
            return Err(AutodarkError::Config(
                "max calibration file count must be at least 1".into(),
            ));
        }
        if self.min_calfiles > self.max_calfiles {
            return Err(AutodarkError::Config(format!(
                "min calibration file count ({}) exceeds max ({})",
                self.min_calfiles, self.max_calfiles
            )));
        }
        Ok(())
    }
}

/// Everything needed to calibrate one directory of science frames.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub dark: Option<PathBuf>,
    #[serde(default)]
    pub bias: Option<PathBuf>,
    /// Accepted for compatibility; flat-field correction is not performed.
    #[serde(default)]
    pub flat: Option<PathBuf>,
    #[serde(default = "default_jobs_per_core")]
    pub jobs_per_core: usize,
    #[serde(default)]
    pub tolerances: MatchTolerances,
}

fn default_jobs_per_core() -> usize {
    DEFAULT_JOBS_PER_CORE
}

impl BatchConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            dark: None,
            bias: None,
            flat: None,
            jobs_per_core: DEFAULT_JOBS_PER_CORE,
            tolerances: MatchTolerances::default(),
        }
    }

    /// Startup checks. Any failure here is fatal and nothing gets dispatched.
    pub fn validate(&self) -> Result<()> {
        require_dir("input", &self.input)?;
        require_dir("output", &self.output)?;

        if self.dark.is_none() && self.bias.is_none() && self.flat.is_none() {
            return Err(AutodarkError::Config(
                "at least one of the dark, bias or flat directories must be set".into(),
            ));
        }
        for (label, dir) in [("dark", &self.dark), ("bias", &self.bias), ("flat", &self.flat)] {
            if let Some(dir) = dir {
                require_dir(label, dir)?;
            }
        }

        if self.jobs_per_core == 0 {
            return Err(AutodarkError::Config(
                "jobs per core must be at least 1".into(),
            ));
        }
        self.tolerances.validate()
    }
}

fn require_dir(label: &str, path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(AutodarkError::Config(format!(
            "{} path {} doesn't exist",
            label,
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(AutodarkError::Config(format!(
            "{} path {} is not a directory",
            label,
            path.display()
        )));
    }
    Ok(())
}
