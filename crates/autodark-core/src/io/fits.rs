use std::cell::RefCell;
use std::path::Path;

use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::headers::ReadsKey;
use fitsio::FitsFile;
use ndarray::Array2;

use crate::error::{AutodarkError, Result};
use crate::matrix::try_pixel_buffer;

use super::service::ImageSource;

/// Rows decoded per cfitsio call.
const ROWS_PER_READ: usize = 64;

/// Geometry of the primary image, validated on open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageLayout {
    pub bitpix: i64,
    pub width: usize,
    pub height: usize,
}

impl ImageLayout {
    pub fn bytes_per_pixel(&self) -> usize {
        (self.bitpix.unsigned_abs() / 8) as usize
    }

    /// Pixel count, `None` when it does not fit in memory addressing.
    pub fn pixel_count(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }

    /// Size of the data unit in bytes, `None` on overflow.
    pub fn data_byte_size(&self) -> Option<usize> {
        self.pixel_count()?.checked_mul(self.bytes_per_pixel())
    }
}

/// Primary HDU of a FITS file opened through cfitsio.
///
/// cfitsio applies BSCALE/BZERO while reading, so unsigned 16-bit frames
/// come back in their physical 0..=65535 range.
pub struct FitsReader {
    file: RefCell<FitsFile>,
    hdu: FitsHdu,
    pub layout: ImageLayout,
}

impl FitsReader {
    /// Open a FITS file and validate its primary image header.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = FitsFile::open(path)?;
        let hdu = file.primary_hdu()?;
        if !matches!(hdu.info, HduInfo::ImageInfo { .. }) {
            return Err(AutodarkError::InvalidFits(
                "primary HDU is not an image".into(),
            ));
        }
        let layout = read_layout(&mut file, &hdu)?;

        Ok(Self {
            file: RefCell::new(file),
            hdu,
            layout,
        })
    }

    fn read_key<T: ReadsKey>(&self, key: &str) -> Option<T> {
        let mut file = self.file.borrow_mut();
        self.hdu.read_key(&mut file, key).ok()
    }
}

impl ImageSource for FitsReader {
    fn header_string(&self, key: &str) -> Option<String> {
        self.read_key::<String>(key)
            .or_else(|| self.read_key::<i64>(key).map(|v| v.to_string()))
            .or_else(|| self.read_key::<f64>(key).map(|v| v.to_string()))
    }

    fn header_float(&self, key: &str) -> Option<f64> {
        self.read_key::<f64>(key)
            .or_else(|| self.read_key::<String>(key)?.trim().parse().ok())
    }

    fn dimensions(&self) -> Result<(usize, usize)> {
        Ok((self.layout.width, self.layout.height))
    }

    fn read_pixels(&self) -> Result<Array2<i64>> {
        let ImageLayout { width, height, .. } = self.layout;
        let len = self
            .layout
            .pixel_count()
            .ok_or(AutodarkError::InvalidDimensions { width, height })?;
        let mut pixels = try_pixel_buffer(len)?;

        let mut file = self.file.borrow_mut();
        let mut row = 0;
        while row < height {
            let rows = ROWS_PER_READ.min(height - row);
            let band: Vec<i64> = self.hdu.read_rows(&mut file, row, rows)?;
            if band.len() != rows * width {
                return Err(AutodarkError::InvalidFits(format!(
                    "short read at row {row}: got {} pixels, expected {}",
                    band.len(),
                    rows * width
                )));
            }
            pixels.extend_from_slice(&band);
            row += rows;
        }

        Array2::from_shape_vec((height, width), pixels)
            .map_err(|e| AutodarkError::InvalidFits(e.to_string()))
    }
}

fn read_layout(file: &mut FitsFile, hdu: &FitsHdu) -> Result<ImageLayout> {
    let require = |file: &mut FitsFile, key: &str| -> Result<i64> {
        hdu.read_key::<i64>(file, key)
            .map_err(|_| AutodarkError::InvalidFits(format!("missing or invalid {key}")))
    };

    let bitpix = require(file, "BITPIX")?;
    if !matches!(bitpix, 8 | 16 | 32 | 64 | -32 | -64) {
        return Err(AutodarkError::UnsupportedBitpix(bitpix));
    }

    let naxis = require(file, "NAXIS")?;
    let mut extra_axes_flat = true;
    for axis in 3..=naxis {
        extra_axes_flat &= hdu.read_key::<i64>(file, &format!("NAXIS{axis}")).ok() == Some(1);
    }
    if naxis < 2 || !extra_axes_flat {
        return Err(AutodarkError::InvalidFits(format!(
            "expected a 2-dimensional image, NAXIS = {naxis}"
        )));
    }

    let width = require(file, "NAXIS1")?;
    let height = require(file, "NAXIS2")?;
    let (Ok(width), Ok(height)) = (usize::try_from(width), usize::try_from(height)) else {
        return Err(AutodarkError::InvalidDimensions {
            width: width.max(0) as usize,
            height: height.max(0) as usize,
        });
    };
    if width == 0 || height == 0 {
        return Err(AutodarkError::InvalidDimensions { width, height });
    }

    let layout = ImageLayout {
        bitpix,
        width,
        height,
    };
    if layout.data_byte_size().is_none() {
        return Err(AutodarkError::InvalidFits(format!(
            "image of {width}x{height} pixels is too large"
        )));
    }
    Ok(layout)
}
