pub mod fits;
pub mod fits_writer;
pub mod fs_utils;
pub mod service;

pub use service::{FitsService, ImageFileService, ImageSink, ImageSource};
