use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutodarkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FITS I/O error: {0}")]
    Fits(#[from] fitsio::errors::Error),

    #[error("Invalid FITS file: {0}")]
    InvalidFits(String),

    #[error("Unsupported BITPIX value: {0}")]
    UnsupportedBitpix(i64),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Pixel matrix shape mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Unable to allocate a pixel matrix of {pixels} elements")]
    AllocationFailed { pixels: usize },

    #[error("Cannot divide a pixel matrix by zero")]
    ZeroDivisor,

    #[error("Too few calibration frames: found {found}, need at least {required}")]
    InsufficientCalibration { found: usize, required: usize },

    #[error("Pixel matrix is not loaded")]
    MissingPixels,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Processing panicked: {0}")]
    Panicked(String),
}

/// Coarse classification of an error, used to decide how far it propagates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// File cannot be opened, decoded or written. Only that file is abandoned.
    Codec,
    /// Not enough qualifying calibration frames. The file is left uncalibrated.
    InsufficientCalibration,
    /// Pixel buffer could not be allocated or shapes disagree.
    Resource,
    /// Bad startup configuration. Fatal for the whole run.
    Configuration,
}

impl AutodarkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::Fits(_) | Self::InvalidFits(_) | Self::UnsupportedBitpix(_) => {
                ErrorKind::Codec
            }
            Self::InvalidDimensions { .. } | Self::MissingPixels => ErrorKind::Codec,
            Self::InsufficientCalibration { .. } => ErrorKind::InsufficientCalibration,
            Self::DimensionMismatch { .. }
            | Self::AllocationFailed { .. }
            | Self::ZeroDivisor
            | Self::Panicked(_) => ErrorKind::Resource,
            Self::Config(_) => ErrorKind::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, AutodarkError>;
