use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{BatchConfig, MatchTolerances};
use crate::consts::{COPIED_HEADER_KEYS, SOFTWARE_NAME};
use crate::error::{AutodarkError, Result};
use crate::frame::ImageHandle;
use crate::io::fs_utils::{exists, output_path_for};
use crate::io::service::ImageFileService;
use crate::matrix::{subtract_assign, PixelMatrix};

use super::master::MasterFrame;
use super::matcher::CalibrationMatcher;
use super::score::MatchTarget;

/// Why a science frame was left without output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UncalibratedReason {
    /// Fewer matching dark frames than required.
    InsufficientDarks { found: usize, required: usize },
    /// No dark directory is configured. Bias frames alone are never applied.
    NoDarkDirectory,
}

impl fmt::Display for UncalibratedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientDarks { found, required } => {
                write!(f, "too few darks ({found} of {required})")
            }
            Self::NoDarkDirectory => write!(f, "no dark directory configured"),
        }
    }
}

/// Result of calibrating one science frame. Every variant counts as completed.
#[derive(Debug)]
pub enum CalibrationOutcome {
    Written {
        output: PathBuf,
        darks: usize,
        biases: usize,
    },
    /// Output already existed.
    Skipped { output: PathBuf },
    Uncalibrated(UncalibratedReason),
    Failed(AutodarkError),
}

impl CalibrationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Written { .. } => "written",
            Self::Skipped { .. } => "skipped",
            Self::Uncalibrated(_) => "uncalibrated",
            Self::Failed(_) => "failed",
        }
    }
}

/// Calibrates single science frames against dark and bias directories.
pub struct Calibrator {
    service: Arc<dyn ImageFileService>,
    output_dir: PathBuf,
    dark_dir: Option<PathBuf>,
    bias_dir: Option<PathBuf>,
    tolerances: MatchTolerances,
}

impl Calibrator {
    pub fn new(service: Arc<dyn ImageFileService>, config: &BatchConfig) -> Self {
        Self {
            service,
            output_dir: config.output.clone(),
            dark_dir: config.dark.clone(),
            bias_dir: config.bias.clone(),
            tolerances: config.tolerances.clone(),
        }
    }

    /// Calibrate one file. Errors never escape; they become `Failed`.
    pub fn calibrate(&self, science: &Path) -> CalibrationOutcome {
        info!(file = %science.display(), "Working");
        match self.try_calibrate(science) {
            Ok(outcome) => outcome,
            Err(AutodarkError::InsufficientCalibration { found, required }) => {
                CalibrationOutcome::Uncalibrated(UncalibratedReason::InsufficientDarks {
                    found,
                    required,
                })
            }
            Err(e) => {
                warn!(file = %science.display(), error = %e, "Unable to process");
                CalibrationOutcome::Failed(e)
            }
        }
    }

    fn try_calibrate(&self, science: &Path) -> Result<CalibrationOutcome> {
        let output = output_path_for(science, &self.output_dir).ok_or_else(|| {
            AutodarkError::Config(format!("{} has no file name", science.display()))
        })?;

        if exists(&output) {
            info!(output = %output.display(), "Output already exists, skipping calibration");
            return Ok(CalibrationOutcome::Skipped { output });
        }

        let mut image = ImageHandle::open(self.service.as_ref(), science)?;
        let meta = image.metadata();
        debug!(
            file = %science.display(),
            time = %meta.timestamp,
            exposure = meta.exposure,
            object = meta.object.as_deref().unwrap_or(""),
            "Science frame metadata"
        );

        let Some(dark_dir) = &self.dark_dir else {
            info!(file = %science.display(), "No dark directory, leaving frame uncalibrated");
            return Ok(CalibrationOutcome::Uncalibrated(UncalibratedReason::NoDarkDirectory));
        };

        image.load_pixels()?;
        let matcher = CalibrationMatcher::new(self.service.as_ref(), &self.tolerances);

        let target = MatchTarget::new(meta.timestamp, meta.exposure);
        let Some(dark) = matcher.build_master(dark_dir, &target, science)?.master else {
            return Ok(CalibrationOutcome::Uncalibrated(
                UncalibratedReason::InsufficientDarks {
                    found: 0,
                    required: self.tolerances.min_calfiles.max(1),
                },
            ));
        };

        let bias = match &self.bias_dir {
            Some(dir) => {
                let found = matcher.build_master(dir, &MatchTarget::bias(meta.timestamp), science)?;
                if found.count > 0 && found.count < self.tolerances.min_calfiles {
                    warn!(
                        file = %science.display(),
                        found = found.count,
                        required = self.tolerances.min_calfiles,
                        "Few bias frames, using them anyway"
                    );
                }
                found.master
            }
            None => None,
        };

        let darks = dark.count();
        let biases = bias.as_ref().map_or(0, MasterFrame::count);

        let pixels = image.pixels_mut().ok_or(AutodarkError::MissingPixels)?;
        subtract_masters(pixels, Some(dark), bias)?;

        self.persist(&image, &output, darks, biases)?;

        image.release_pixels();
        image.close();

        info!(
            file = %science.display(),
            output = %output.display(),
            darks,
            biases,
            "Calibrated"
        );
        Ok(CalibrationOutcome::Written {
            output,
            darks,
            biases,
        })
    }

    fn persist(&self, image: &ImageHandle, output: &Path, darks: usize, biases: usize) -> Result<()> {
        let pixels = image.pixels().ok_or(AutodarkError::MissingPixels)?;
        let mut sink = self.service.create(output)?;

        sink.write_pixels(pixels)?;
        sink.write_comment(&format!("Calibrated using {darks} darks"))?;
        if biases > 0 {
            sink.write_comment(&format!("Calibrated using {biases} biases"))?;
        }
        for key in COPIED_HEADER_KEYS {
            if let Some(value) = image.header_string(key) {
                sink.write_header_string(key, &value, None)?;
            }
        }
        sink.write_comment(&format!("Calibrated by {SOFTWARE_NAME}"))?;
        if let Some(name) = image.path().and_then(Path::file_name) {
            sink.write_history(&format!("Source frame {}", name.to_string_lossy()))?;
        }
        sink.write_timestamp()?;
        sink.finish()
    }
}

/// Remove averaged calibration masters from a science matrix.
///
/// The dark master is averaged; when a bias master is present it is averaged
/// and subtracted from both the dark average and the science frame. Finally
/// the (bias-corrected) dark average is subtracted from the science frame.
/// Net effect with both masters: `S - B/nb - (D/nd - B/nb)`.
pub fn subtract_masters(
    science: &mut PixelMatrix,
    dark: Option<MasterFrame>,
    bias: Option<MasterFrame>,
) -> Result<()> {
    let mut dark = dark.map(MasterFrame::into_average).transpose()?;

    if let Some(bias) = bias {
        let bias = bias.into_average()?;
        if let Some(dark) = dark.as_mut() {
            subtract_assign(dark, &bias)?;
        }
        subtract_assign(science, &bias)?;
    }

    if let Some(dark) = dark {
        subtract_assign(science, &dark)?;
    }
    Ok(())
}
