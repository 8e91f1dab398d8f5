use std::ffi::CString;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fitsio::errors::check_status;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{AutodarkError, Result};

use super::service::ImageSink;

/// Calibrated values are saturated into 32-bit integers (BITPIX = 32).
const OUTPUT_TYPE: ImageType = ImageType::Long;

enum HeaderRecord {
    Keyword {
        key: String,
        value: String,
        comment: Option<String>,
    },
    Comment(String),
    History(String),
}

/// Writes a single-HDU FITS file through cfitsio.
///
/// Records and pixels are collected in memory and emitted by `finish`, so the
/// caller may write them in any order. The path is reserved exclusively on
/// `create`; if the writer is dropped before `finish` completes the file is
/// removed.
pub struct FitsWriter {
    path: PathBuf,
    records: Vec<HeaderRecord>,
    data: Vec<i32>,
    dimensions: Option<(usize, usize)>,
    finished: bool,
}

impl FitsWriter {
    /// Create a new FITS file. Fails if the path already exists.
    pub fn create(path: &Path) -> Result<Self> {
        OpenOptions::new().write(true).create_new(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            records: Vec::new(),
            data: Vec::new(),
            dimensions: None,
            finished: false,
        })
    }

    fn write_all(&self) -> Result<()> {
        let (width, height) = self.dimensions.ok_or(AutodarkError::MissingPixels)?;
        let description = ImageDescription {
            data_type: OUTPUT_TYPE,
            dimensions: &[height, width],
        };
        // Replaces the empty placeholder reserved by `create`.
        let mut file = FitsFile::create(&self.path)
            .with_custom_primary(&description)
            .overwrite()
            .open()?;
        let hdu = file.primary_hdu()?;
        hdu.write_image(&mut file, self.data.as_slice())?;

        for record in &self.records {
            match record {
                HeaderRecord::Keyword {
                    key,
                    value,
                    comment: Some(comment),
                } => hdu.write_key(&mut file, key, (value.as_str(), comment.as_str()))?,
                HeaderRecord::Keyword { key, value, .. } => {
                    hdu.write_key(&mut file, key, value.as_str())?
                }
                HeaderRecord::Comment(text) => commentary(&mut file, Commentary::Comment, text)?,
                HeaderRecord::History(text) => commentary(&mut file, Commentary::History, text)?,
            }
        }
        Ok(())
    }
}

impl ImageSink for FitsWriter {
    fn write_header_string(&mut self, key: &str, value: &str, comment: Option<&str>) -> Result<()> {
        self.records.push(HeaderRecord::Keyword {
            key: check_key(key)?,
            value: printable(value),
            comment: comment.map(printable),
        });
        Ok(())
    }

    fn write_comment(&mut self, text: &str) -> Result<()> {
        self.records.push(HeaderRecord::Comment(printable(text)));
        Ok(())
    }

    fn write_history(&mut self, text: &str) -> Result<()> {
        self.records.push(HeaderRecord::History(printable(text)));
        Ok(())
    }

    fn write_timestamp(&mut self) -> Result<()> {
        let now = Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        self.write_header_string(
            "DATE",
            &now,
            Some("file creation date (YYYY-MM-DDThh:mm:ss UTC)"),
        )
    }

    fn write_pixels(&mut self, pixels: &Array2<i64>) -> Result<()> {
        let (height, width) = pixels.dim();
        if width == 0 || height == 0 {
            return Err(AutodarkError::InvalidDimensions { width, height });
        }

        let saturate = |v: &i64| (*v).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        let contiguous = pixels.as_standard_layout();
        self.data = match contiguous.as_slice() {
            Some(slice) if slice.len() >= PARALLEL_PIXEL_THRESHOLD => {
                slice.par_iter().map(saturate).collect()
            }
            _ => contiguous.iter().map(saturate).collect(),
        };
        self.dimensions = Some((width, height));
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.write_all()?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for FitsWriter {
    fn drop(&mut self) {
        if !self.finished {
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[derive(Clone, Copy)]
enum Commentary {
    Comment,
    History,
}

/// COMMENT/HISTORY records have no fitsio wrapper; cfitsio wraps long text
/// over as many cards as needed.
fn commentary(file: &mut FitsFile, kind: Commentary, text: &str) -> Result<()> {
    let text = CString::new(text).map_err(|e| AutodarkError::InvalidFits(e.to_string()))?;
    let mut status = 0;
    unsafe {
        let raw = file.as_raw();
        match kind {
            Commentary::Comment => fitsio::sys::ffpcom(raw, text.as_ptr(), &mut status),
            Commentary::History => fitsio::sys::ffphis(raw, text.as_ptr(), &mut status),
        };
    }
    check_status(status)?;
    Ok(())
}

fn check_key(key: &str) -> Result<String> {
    let key = key.to_ascii_uppercase();
    if key.is_empty() || key.len() > 8 || !key.is_ascii() {
        return Err(AutodarkError::InvalidFits(format!(
            "invalid header keyword '{key}'"
        )));
    }
    Ok(key)
}

/// Header text is restricted to printable ASCII.
fn printable(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}
