use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::{info, warn};
use rayon::prelude::*;

use roi_mask_rust_lib::config::{Config, ForegroundRule};
use roi_mask_rust_lib::errors::{MaskError, Result};
use roi_mask_rust_lib::image_io::{get_png_files_in_dir, load_image};
use roi_mask_rust_lib::output::{write_summary_csv, write_summary_json};
use roi_mask_rust_lib::pipeline::{process_image, MaskSummary};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "ROI mask analysis - contours, components and perimeter of PNG masks")]
struct Args {
    /// Path to input file or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file (defaults are used when it is missing)
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Foreground threshold (overwrites config)
    #[clap(short, long)]
    threshold: Option<u8>,

    /// Foreground channel (overwrites config)
    #[clap(short, long)]
    foreground: Option<ForegroundArg>,

    /// Enable debug mode (save contour overlays and log more info)
    #[clap(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ForegroundArg {
    Alpha,
    Luma,
}

fn load_config(path: &str) -> Result<Config> {
    if PathBuf::from(path).exists() {
        Config::from_file(path)
    } else {
        info!("No config file at {}, using defaults", path);
        Ok(Config::default())
    }
}

fn run_one(path: &Path, config: &Config, debug: bool) -> Result<MaskSummary> {
    info!("Processing: {}", path.display());
    let input_image = load_image(path)?;
    process_image(input_image, config, debug)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // Load configuration
    let mut config = load_config(&args.config)?;

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }

    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }

    if let Some(threshold) = args.threshold {
        config.foreground_threshold = threshold;
    }

    if let Some(foreground) = args.foreground {
        config.foreground = match foreground {
            ForegroundArg::Alpha => ForegroundRule::Alpha,
            ForegroundArg::Luma => ForegroundRule::Luma,
        };
    }

    config.validate()?;

    let start_time = Instant::now();
    let output_base = PathBuf::from(&config.output_base_dir);
    let input_path = PathBuf::from(&config.input_path);

    let summaries: Vec<MaskSummary> = if input_path.is_file() {
        info!("Processing single file: {}", input_path.display());
        vec![run_one(&input_path, &config, args.debug)?]
    } else if input_path.is_dir() {
        info!("Processing directory: {}", input_path.display());
        let png_files = get_png_files_in_dir(&input_path)?;
        info!("Found {} PNG files", png_files.len());

        let results: Vec<(PathBuf, Result<MaskSummary>)> = if config.use_parallel {
            png_files
                .par_iter()
                .map(|path| (path.clone(), run_one(path, &config, args.debug)))
                .collect()
        } else {
            png_files
                .iter()
                .map(|path| (path.clone(), run_one(path, &config, args.debug)))
                .collect()
        };

        results
            .into_iter()
            .filter_map(|(path, result)| match result {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    } else {
        return Err(MaskError::InvalidPath(input_path));
    };

    let csv_path = write_summary_csv(&summaries, &output_base)?;
    let json_path = write_summary_json(&summaries, &output_base)?;
    info!("Wrote {} and {}", csv_path.display(), json_path.display());

    let elapsed = start_time.elapsed();
    info!(
        "Processed {} image(s) in {:.2} seconds",
        summaries.len(),
        elapsed.as_secs_f64()
    );

    Ok(())
}
