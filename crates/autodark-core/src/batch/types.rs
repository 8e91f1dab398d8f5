use std::path::PathBuf;

use crate::calibration::CalibrationOutcome;

/// Outcome of one science file, sent by the worker that processed it.
#[derive(Debug)]
pub struct FileReport {
    pub worker: usize,
    pub path: PathBuf,
    pub outcome: CalibrationOutcome,
}

/// Totals for a finished or stopped batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub written: usize,
    pub skipped: usize,
    pub uncalibrated: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: &CalibrationOutcome) {
        match outcome {
            CalibrationOutcome::Written { .. } => self.written += 1,
            CalibrationOutcome::Skipped { .. } => self.skipped += 1,
            CalibrationOutcome::Uncalibrated(_) => self.uncalibrated += 1,
            CalibrationOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Files that reached any outcome.
    pub fn completed(&self) -> usize {
        self.written + self.skipped + self.uncalibrated + self.failed
    }

    /// Files never processed because the batch was stopped.
    pub fn unprocessed(&self) -> usize {
        self.total.saturating_sub(self.completed())
    }
}
