use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use autodark_core::batch::BatchDispatcher;
use autodark_core::calibration::CalibrationOutcome;
use autodark_core::config::BatchConfig;
use autodark_core::io::service::FitsService;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::ToleranceArgs;
use crate::summary::{print_batch_header, print_batch_summary};

#[derive(Args)]
pub struct CalibrateArgs {
    /// Directory with science frames
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory for calibrated frames
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory with dark frames
    #[arg(short, long)]
    pub dark: Option<PathBuf>,

    /// Directory with bias frames
    #[arg(short, long)]
    pub bias: Option<PathBuf>,

    /// Directory with flat frames (accepted, not applied)
    #[arg(short, long)]
    pub flat: Option<PathBuf>,

    /// Worker threads per CPU core
    #[arg(long)]
    pub jobs_per_core: Option<usize>,

    /// Batch config file (TOML); flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub tolerances: ToleranceArgs,
}

pub fn run(args: &CalibrateArgs) -> Result<()> {
    let config = build_config(args)?;
    print_batch_header(&config);

    let started = Instant::now();
    let handle = BatchDispatcher::new(Arc::new(FitsService), config)
        .start(|| info!("Calibration finished"))
        .context("Unable to start calibration")?;

    let pb = ProgressBar::new(handle.total_files() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:30} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let summary = handle.wait_with(|report| {
        let name = report
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let CalibrationOutcome::Failed(e) = &report.outcome {
            pb.println(format!("  {name}: {e}"));
        }
        pb.set_message(name);
        pb.inc(1);
    });
    pb.finish_and_clear();

    print_batch_summary(&summary, started.elapsed());
    Ok(())
}

fn build_config(args: &CalibrateArgs) -> Result<BatchConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let mut config: BatchConfig =
                toml::from_str(&contents).context("Invalid batch config")?;
            if let Some(input) = &args.input {
                config.input = input.clone();
            }
            if let Some(output) = &args.output {
                config.output = output.clone();
            }
            config
        }
        None => match (&args.input, &args.output) {
            (Some(input), Some(output)) => BatchConfig::new(input, output),
            _ => bail!("--input and --output are required without --config"),
        },
    };

    if args.dark.is_some() {
        config.dark = args.dark.clone();
    }
    if args.bias.is_some() {
        config.bias = args.bias.clone();
    }
    if args.flat.is_some() {
        config.flat = args.flat.clone();
    }
    if let Some(jobs) = args.jobs_per_core {
        config.jobs_per_core = jobs;
    }
    args.tolerances.apply(&mut config.tolerances);

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
