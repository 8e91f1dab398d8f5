use std::path::PathBuf;

use anyhow::{Context, Result};
use autodark_core::calibration::{CalibrationMatcher, MatchTarget};
use autodark_core::config::MatchTolerances;
use autodark_core::frame::ImageHandle;
use autodark_core::io::service::FitsService;
use clap::Args;
use console::Style;

use super::ToleranceArgs;

#[derive(Args)]
pub struct MatchArgs {
    /// Science FITS file
    pub file: PathBuf,

    /// Calibration directory to scan
    #[arg(short, long)]
    pub calibration: PathBuf,

    /// Treat the directory as bias frames (exposure is ignored)
    #[arg(long)]
    pub bias: bool,

    #[command(flatten)]
    pub tolerances: ToleranceArgs,
}

/// Dry run: score every candidate without touching any pixels.
pub fn run(args: &MatchArgs) -> Result<()> {
    let mut tolerances = MatchTolerances::default();
    args.tolerances.apply(&mut tolerances);
    tolerances.validate()?;

    let service = FitsService;
    let science = ImageHandle::open(&service, &args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let meta = science.metadata();
    let target = if args.bias {
        MatchTarget::bias(meta.timestamp)
    } else {
        MatchTarget::new(meta.timestamp, meta.exposure)
    };

    let matcher = CalibrationMatcher::new(&service, &tolerances);
    let reports = matcher
        .scan(&args.calibration, &target)
        .with_context(|| format!("Failed to scan {}", args.calibration.display()))?;

    let ok = Style::new().green();
    let no = Style::new().dim();
    let bad = Style::new().red();

    println!(
        "Target: {}  exposure {} s",
        target.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        target.exposure
    );
    println!();

    let mut qualifying = 0usize;
    for report in &reports {
        let name = report
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &report.result {
            Ok(score) => {
                let (mark, style) = if report.qualifies {
                    qualifying += 1;
                    ("match", &ok)
                } else {
                    ("--", &no)
                };
                println!(
                    "  {:<6} {:<40} {:>10} s {:>8.2} %",
                    style.apply_to(mark),
                    name,
                    score.time_diff_secs,
                    score.exposure_ratio_pct
                );
            }
            Err(e) => println!("  {:<6} {:<40} {}", bad.apply_to("error"), name, e),
        }
    }

    let used = qualifying.min(tolerances.max_calfiles);
    println!();
    println!(
        "{} of {} candidates qualify, {} would be used (min {}, max {})",
        qualifying,
        reports.len(),
        used,
        tolerances.min_calfiles,
        tolerances.max_calfiles
    );
    if !args.bias && used < tolerances.min_calfiles {
        println!("{}", bad.apply_to("Not enough darks, the file would stay uncalibrated"));
    }

    Ok(())
}
