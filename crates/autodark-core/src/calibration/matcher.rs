use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::MatchTolerances;
use crate::error::{AutodarkError, Result};
use crate::frame::ImageHandle;
use crate::io::fs_utils::list_image_files;
use crate::io::service::ImageFileService;

use super::master::{fold_frame, MasterFrame};
use super::score::{MatchScore, MatchTarget};

/// Unaveraged master plus how many frames went into it.
#[derive(Debug)]
pub struct MasterMatch {
    pub master: Option<MasterFrame>,
    pub count: usize,
}

/// One calibration file as seen by a dry-run scan.
#[derive(Debug)]
pub struct CandidateReport {
    pub path: PathBuf,
    pub result: Result<MatchScore>,
    pub qualifies: bool,
}

/// Finds calibration frames close enough to a target and sums them.
pub struct CalibrationMatcher<'a> {
    service: &'a dyn ImageFileService,
    tolerances: &'a MatchTolerances,
}

impl<'a> CalibrationMatcher<'a> {
    pub fn new(service: &'a dyn ImageFileService, tolerances: &'a MatchTolerances) -> Self {
        Self {
            service,
            tolerances,
        }
    }

    /// Scan `dir` and accumulate every qualifying frame into one master.
    ///
    /// Stops once `max_calfiles` frames qualified. Files that fail to open
    /// or decode are logged and skipped. For exposure-matched targets a
    /// master built from fewer than `min_calfiles` frames is discarded and
    /// `InsufficientCalibration` returned; bias targets return whatever was
    /// found. At most one candidate's pixels are held next to the sum.
    pub fn build_master(
        &self,
        dir: &Path,
        target: &MatchTarget,
        science: &Path,
    ) -> Result<MasterMatch> {
        let mut master: Option<MasterFrame> = None;
        let mut count = 0usize;

        for path in list_image_files(dir)? {
            if count >= self.tolerances.max_calfiles {
                debug!(dir = %dir.display(), count, "Calibration set is full");
                break;
            }

            let mut candidate = match ImageHandle::open(self.service, &path) {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Unable to open calibration file");
                    continue;
                }
            };

            let score = MatchScore::compute(&candidate.metadata(), target);
            if !score.qualifies(self.tolerances) {
                debug!(
                    file = %path.display(),
                    time_diff = score.time_diff_secs,
                    exposure_pct = score.exposure_ratio_pct,
                    "Calibration frame out of tolerance"
                );
                continue;
            }

            info!(
                file = %path.display(),
                science = %science.display(),
                time_diff = score.time_diff_secs,
                exposure_pct = format_args!("{:.2}", score.exposure_ratio_pct),
                "Found corresponding calibration"
            );

            match fold_candidate(&mut master, &mut candidate) {
                Ok(()) => count += 1,
                Err(e @ AutodarkError::AllocationFailed { .. }) => return Err(e),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping calibration frame");
                }
            }
            candidate.release_pixels();
            candidate.close();
        }

        if !target.is_bias() && count < self.tolerances.min_calfiles {
            warn!(
                science = %science.display(),
                found = count,
                required = self.tolerances.min_calfiles,
                "Too few calibration files, skipping calibration"
            );
            return Err(AutodarkError::InsufficientCalibration {
                found: count,
                required: self.tolerances.min_calfiles,
            });
        }

        Ok(MasterMatch { master, count })
    }

    /// Score every candidate in `dir` without loading pixels.
    pub fn scan(&self, dir: &Path, target: &MatchTarget) -> Result<Vec<CandidateReport>> {
        let reports = list_image_files(dir)?
            .into_iter()
            .map(|path| {
                let result = ImageHandle::open(self.service, &path)
                    .map(|h| MatchScore::compute(&h.metadata(), target));
                let qualifies = matches!(&result, Ok(s) if s.qualifies(self.tolerances));
                CandidateReport {
                    path,
                    result,
                    qualifies,
                }
            })
            .collect();
        Ok(reports)
    }
}

fn fold_candidate(master: &mut Option<MasterFrame>, candidate: &mut ImageHandle) -> Result<()> {
    candidate.load_pixels()?;
    let pixels = candidate.pixels().ok_or(AutodarkError::MissingPixels)?;
    fold_frame(master, pixels)
}
