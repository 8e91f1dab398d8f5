use std::path::Path;

use ndarray::Array2;

use crate::error::Result;

use super::fits::FitsReader;
use super::fits_writer::FitsWriter;

/// Read side of an opened image file.
///
/// Dropping the value releases the underlying file. Sources stay on the
/// thread that opened them.
pub trait ImageSource {
    /// String header value, `None` when the key is absent.
    fn header_string(&self, key: &str) -> Option<String>;

    /// Numeric header value, `None` when the key is absent or not numeric.
    fn header_float(&self, key: &str) -> Option<f64>;

    /// Image size as (width, height).
    fn dimensions(&self) -> Result<(usize, usize)>;

    /// Decode the full pixel matrix, shape = (height, width).
    fn read_pixels(&self) -> Result<Array2<i64>>;
}

/// Write side of a newly created image file.
pub trait ImageSink {
    fn write_header_string(&mut self, key: &str, value: &str, comment: Option<&str>) -> Result<()>;

    fn write_comment(&mut self, text: &str) -> Result<()>;

    fn write_history(&mut self, text: &str) -> Result<()>;

    /// Record the current UTC time as the file creation date.
    fn write_timestamp(&mut self) -> Result<()>;

    fn write_pixels(&mut self, pixels: &Array2<i64>) -> Result<()>;

    /// Flush everything to disk and close the file.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Opens and creates image files. Shared by every worker thread.
pub trait ImageFileService: Send + Sync {
    fn name(&self) -> &str;

    /// Open an existing file read-only.
    fn open(&self, path: &Path) -> Result<Box<dyn ImageSource>>;

    /// Create a new file. Fails if `path` already exists.
    fn create(&self, path: &Path) -> Result<Box<dyn ImageSink>>;
}

/// FITS primary-HDU codec backed by cfitsio.
pub struct FitsService;

impl ImageFileService for FitsService {
    fn name(&self) -> &str {
        "FITS"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ImageSource>> {
        Ok(Box::new(FitsReader::open(path)?))
    }

    fn create(&self, path: &Path) -> Result<Box<dyn ImageSink>> {
        Ok(Box::new(FitsWriter::create(path)?))
    }
}
