/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Case-insensitive marker a file name must contain to be treated as a FITS image.
pub const IMAGE_NAME_MARKER: &str = "fit";

/// Default maximum distance in time between a calibration frame and its target.
pub const DEFAULT_MAX_TIME_DIFF_SECS: i64 = 86_400;

/// Default minimum exposure equality, in percent (100 = identical exposures).
pub const DEFAULT_MIN_EXPOSURE_EQUALITY_PCT: f64 = 65.0;

/// Default minimum number of dark frames required to build a master.
pub const DEFAULT_MIN_CALFILES: usize = 2;

/// Default cap on calibration frames folded into one master.
pub const DEFAULT_MAX_CALFILES: usize = 17;

/// Default worker threads per CPU core.
pub const DEFAULT_JOBS_PER_CORE: usize = 1;

/// Exposure ratio reported when the target carries no exposure (bias matching).
pub const FULL_EXPOSURE_EQUALITY_PCT: f64 = 100.0;

/// Header keys copied from the science frame into the calibrated output.
pub const COPIED_HEADER_KEYS: [&str; 6] = [
    "OBJECT", "DATE-OBS", "TIME-OBS", "FILTER", "TELESCOP", "OBSERVER",
];

pub const KEY_DATE_OBS: &str = "DATE-OBS";
pub const KEY_TIME_OBS: &str = "TIME-OBS";
pub const KEY_EXPTIME: &str = "EXPTIME";
pub const KEY_EXPOSURE: &str = "EXPOSURE";
pub const KEY_OBJECT: &str = "OBJECT";

/// Software identification written into every calibrated file.
pub const SOFTWARE_NAME: &str = concat!("autodark v", env!("CARGO_PKG_VERSION"));
