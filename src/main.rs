extern crate log;
pub mod config;
pub mod convert;
pub mod geofile;
pub mod kml;
pub mod sheet;
use crate::config::Config;
use crate::convert::{convert_file, FileReport};
use anyhow::anyhow;
use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Convert the line placemarks of KML files to Excel spreadsheets, one row per line.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// KML files to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Path to the YAML config file.
    #[arg(short, long)]
    config_filepath: Option<String>,

    /// Directory to write the spreadsheets to, overrides the config file. Defaults to the
    /// directory of each input file.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn log_report(input: &Path, report: &FileReport) {
    for skipped in &report.skipped {
        log::warn!("{:?}: {}", input, skipped);
    }
    log::info!(
        "Wrote {} lines from {:?} to {:?}",
        report.feature_count,
        input,
        report.output_path
    );
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = match &args.config_filepath {
        Some(config_filepath) => Config::from_yaml_file(Path::new(config_filepath))?,
        None => Config::default(),
    };
    if let Some(output_dir) = args.output_dir {
        config.output_dir = Some(output_dir);
    }
    log::debug!("{:?}", config);

    log::info!("Converting {} files", args.inputs.len());
    // Documents share nothing, so they are converted in parallel.
    let bar = ProgressBar::new(args.inputs.len() as u64);
    let results: Vec<(&PathBuf, anyhow::Result<FileReport>)> = args
        .inputs
        .par_iter()
        .progress_with(bar.clone())
        .map(|input| (input, convert_file(input, &config)))
        .collect();
    bar.finish_and_clear();

    let mut num_failed = 0;
    for (input, result) in results {
        match result {
            Ok(report) => log_report(input, &report),
            Err(err) => {
                log::error!("{:?}", err);
                num_failed += 1;
            }
        }
    }
    if num_failed > 0 {
        return Err(anyhow!(
            "{} of {} files could not be converted",
            num_failed,
            args.inputs.len()
        ));
    }
    Ok(())
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
