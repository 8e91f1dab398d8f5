use std::path::PathBuf;

use anyhow::{Context, Result};
use autodark_core::frame::ImageHandle;
use autodark_core::io::fits::FitsReader;
use autodark_core::io::service::{FitsService, ImageSource};
use clap::Args;

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let reader = FitsReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let handle = ImageHandle::open(&FitsService, &args.file)?;
    let meta = handle.metadata();
    let layout = reader.layout;

    println!("File:        {}", args.file.display());
    println!("Dimensions:  {}x{}", layout.width, layout.height);
    println!("BITPIX:      {}", layout.bitpix);
    let bscale = reader.header_float("BSCALE").unwrap_or(1.0);
    let bzero = reader.header_float("BZERO").unwrap_or(0.0);
    if bscale != 1.0 || bzero != 0.0 {
        println!("Scaling:     BSCALE={} BZERO={}", bscale, bzero);
    }
    println!("Observed:    {}", meta.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Exposure:    {} s", meta.exposure);

    for (label, key) in [
        ("Object", "OBJECT"),
        ("Filter", "FILTER"),
        ("Telescope", "TELESCOP"),
        ("Observer", "OBSERVER"),
    ] {
        if let Some(value) = handle.header_string(key) {
            println!("{:<13}{}", format!("{label}:"), value);
        }
    }

    if let Some(bytes) = layout.data_byte_size() {
        println!("Data size:   {:.1} MB", bytes as f64 / (1024.0 * 1024.0));
    }

    Ok(())
}
