use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::consts::{KEY_DATE_OBS, KEY_EXPOSURE, KEY_EXPTIME, KEY_OBJECT, KEY_TIME_OBS};
use crate::error::{AutodarkError, Result};
use crate::io::service::{ImageFileService, ImageSource};
use crate::matrix::{try_zeros, PixelMatrix};
use crate::time::parse_observation_time;

/// Header-derived facts about an exposure used for matching.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameMetadata {
    /// Observation start on a UTC calendar. Unix epoch when the header has none.
    pub timestamp: DateTime<Utc>,
    /// Exposure duration in seconds, never negative.
    pub exposure: f64,
    pub object: Option<String>,
}

/// One exposure: an optional open file plus an optional loaded pixel matrix.
///
/// The header stays queryable while pixels are not loaded, and pixels can be
/// released while the header stays open. Both `release_pixels` and `close`
/// are idempotent.
pub struct ImageHandle {
    path: Option<PathBuf>,
    source: Option<Box<dyn ImageSource>>,
    width: usize,
    height: usize,
    pixels: Option<PixelMatrix>,
}

impl ImageHandle {
    /// Open an existing image read-only. Pixels are not loaded.
    pub fn open(service: &dyn ImageFileService, path: &Path) -> Result<Self> {
        let source = service.open(path)?;
        let (width, height) = source.dimensions()?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            source: Some(source),
            width,
            height,
            pixels: None,
        })
    }

    /// Zero-filled frame not backed by any file.
    pub fn in_memory(width: usize, height: usize) -> Result<Self> {
        Ok(Self::from_pixels(try_zeros(height, width)?))
    }

    /// Wrap an existing matrix. Dimensions are taken from it.
    pub fn from_pixels(pixels: PixelMatrix) -> Self {
        let (height, width) = pixels.dim();
        Self {
            path: None,
            source: None,
            width,
            height,
            pixels: Some(pixels),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    pub fn header_string(&self, key: &str) -> Option<String> {
        self.source.as_ref()?.header_string(key)
    }

    pub fn header_float(&self, key: &str) -> Option<f64> {
        self.source.as_ref()?.header_float(key)
    }

    /// DATE-OBS, combined with TIME-OBS when the date has no time part.
    pub fn observation_time(&self) -> DateTime<Utc> {
        let parsed = self.header_string(KEY_DATE_OBS).and_then(|date| {
            let time = self.header_string(KEY_TIME_OBS);
            parse_observation_time(&date, time.as_deref())
        });
        parsed.unwrap_or_else(|| {
            debug!(file = ?self.path, "No usable DATE-OBS, using epoch");
            DateTime::UNIX_EPOCH
        })
    }

    /// EXPTIME (or EXPOSURE) in seconds, 0 when absent.
    pub fn exposure(&self) -> f64 {
        self.header_float(KEY_EXPTIME)
            .or_else(|| self.header_float(KEY_EXPOSURE))
            .filter(|e| e.is_finite())
            .unwrap_or(0.0)
            .max(0.0)
    }

    pub fn object_name(&self) -> Option<String> {
        self.header_string(KEY_OBJECT).filter(|s| !s.is_empty())
    }

    pub fn metadata(&self) -> FrameMetadata {
        FrameMetadata {
            timestamp: self.observation_time(),
            exposure: self.exposure(),
            object: self.object_name(),
        }
    }

    /// Decode pixels from the open file. No-op if they are already loaded.
    pub fn load_pixels(&mut self) -> Result<()> {
        if self.pixels.is_some() {
            return Ok(());
        }
        let source = self.source.as_ref().ok_or(AutodarkError::MissingPixels)?;
        let pixels = source.read_pixels()?;
        if pixels.dim() != (self.height, self.width) {
            return Err(AutodarkError::DimensionMismatch {
                expected: (self.height, self.width),
                found: pixels.dim(),
            });
        }
        self.pixels = Some(pixels);
        Ok(())
    }

    pub fn pixels(&self) -> Option<&PixelMatrix> {
        self.pixels.as_ref()
    }

    pub fn pixels_mut(&mut self) -> Option<&mut PixelMatrix> {
        self.pixels.as_mut()
    }

    /// Move the pixel matrix out of the handle.
    pub fn take_pixels(&mut self) -> Option<PixelMatrix> {
        self.pixels.take()
    }

    /// Free the pixel matrix, keeping the header open.
    pub fn release_pixels(&mut self) {
        self.pixels = None;
    }

    /// Release the underlying file, keeping any loaded pixels.
    pub fn close(&mut self) {
        self.source = None;
    }
}

impl std::fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHandle")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("open", &self.is_open())
            .field("pixels_loaded", &self.pixels.is_some())
            .finish()
    }
}
