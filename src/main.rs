//! EV Atlas - Electric Vehicle Registration Analysis
//!
//! Command-line entry point: reads configuration, runs the analysis pipeline,
//! and optionally opens the rendered charts.

use anyhow::{Context, Result};
use clap::Parser;
use ev_atlas::config::AppConfig;
use ev_atlas::pipeline;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "ev_atlas.toml";

#[derive(Parser)]
#[command(name = "ev_atlas", version)]
#[command(about = "Analyze EV registrations and map them by county", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults to ev_atlas.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Registration CSV
    #[arg(short, long, value_name = "CSV")]
    input: Option<PathBuf>,

    /// County boundaries (.shp or .geojson)
    #[arg(short, long, value_name = "FILE")]
    boundaries: Option<PathBuf>,

    /// State name, postal abbreviation, or FIPS code
    #[arg(short, long)]
    state: Option<String>,

    /// Directory for the rendered images
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Also write a JSON summary of all counts
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,

    /// Open each rendered image in the system viewer
    #[arg(long)]
    show: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from_file(path)?,
            None if Path::new(DEFAULT_CONFIG).is_file() => {
                AppConfig::load_from_file(Path::new(DEFAULT_CONFIG))?
            }
            None => AppConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input.registrations = input.clone();
        }
        if let Some(boundaries) = &self.boundaries {
            config.input.boundaries = boundaries.clone();
        }
        if let Some(state) = &self.state {
            config.analysis.state = state.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config().context("Failed to resolve configuration")?;
    info!(
        registrations = %config.input.registrations.display(),
        boundaries = %config.input.boundaries.display(),
        state = %config.analysis.state,
        "Starting EV registration analysis"
    );

    let (analysis, images) = pipeline::run(&config)?;

    if let Some(path) = &cli.summary {
        pipeline::write_summary(&analysis, path)?;
    }

    info!(
        registrations = analysis.registrations,
        dropped = analysis.dropped,
        charts = images.len(),
        "Analysis complete"
    );

    if cli.show {
        for image in &images {
            if let Err(e) = open::that(image) {
                warn!(path = %image.display(), error = %e, "Failed to open image");
            }
        }
    }

    Ok(())
}
