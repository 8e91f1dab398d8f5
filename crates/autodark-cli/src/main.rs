mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "autodark", about = "Automatic dark and bias calibration for FITS exposures")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate every FITS file in a directory
    Calibrate(commands::calibrate::CalibrateArgs),
    /// Show FITS header metadata
    Info(commands::info::InfoArgs),
    /// List which calibration frames would match a science frame
    Match(commands::match_frames::MatchArgs),
    /// Print or save a default batch config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .init();

    match &cli.command {
        Commands::Calibrate(args) => commands::calibrate::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Match(args) => commands::match_frames::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
