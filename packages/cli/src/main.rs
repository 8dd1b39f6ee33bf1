#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line siting analysis over a cropland `GeoJSON` layer.
//!
//! The loaded layer plays the part of the map: a siting session queries it
//! for features, pushes its buffer polygon back to it, and the resulting
//! inventory is printed, exported to CSV, or dumped as JSON. Without a
//! subcommand the tool starts an interactive session.
//!
//! Uses `indicatif-log-bridge` (via [`cal_bioscape_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and spinners never fight for the terminal.

mod analyze;
mod interactive;
mod renderer;
mod report;

use std::path::{Path, PathBuf};

use cal_bioscape_cli_utils::MultiProgress;
use cal_bioscape_session::SessionConfig;
use cal_bioscape_siting_models::{DistanceUnit, InventoryMode};
use cal_bioscape_spatial::{Feature, features_from_geojson};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cal_bioscape", about = "Feedstock siting analysis tool")]
struct Cli {
    /// Session settings TOML (radius defaults, layer ids, feature property names)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inventory the crops within a radius of a site
    Analyze {
        /// Cropland `GeoJSON` `FeatureCollection`
        features: PathBuf,
        /// Site longitude
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Site latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Buffer radius (defaults to the configured radius)
        #[arg(long)]
        radius: Option<f64>,
        /// Radius unit: miles or kilometers (defaults to the configured unit)
        #[arg(long)]
        unit: Option<DistanceUnit>,
        /// Rows to show: `all_crops` or `residue_only`
        #[arg(long, default_value = "all_crops")]
        mode: InventoryMode,
        /// Write the inventory to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Write the buffer polygon to this `GeoJSON` file
        #[arg(long)]
        buffer_out: Option<PathBuf>,
        /// Print the inventory as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Compare total and residue acreage across several radii
    Sweep {
        /// Cropland `GeoJSON` `FeatureCollection`
        features: PathBuf,
        /// Site longitude
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Site latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Comma-separated radii (e.g., "5,10,25")
        #[arg(long, value_delimiter = ',', required = true)]
        radii: Vec<f64>,
        /// Radius unit: miles or kilometers
        #[arg(long, default_value = "miles")]
        unit: DistanceUnit,
    },
    /// List the residue factor table
    Factors {
        /// Also list the crop name aliases
        #[arg(long)]
        aliases: bool,
    },
    /// Run an interactive siting session over a cropland layer
    Interactive {
        /// Cropland `GeoJSON` `FeatureCollection` (prompted for when omitted)
        features: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = cal_bioscape_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    let Some(command) = cli.command else {
        return interactive::run(&multi, config, None);
    };

    match command {
        Commands::Analyze {
            features,
            lng,
            lat,
            radius,
            unit,
            mode,
            csv,
            buffer_out,
            json,
        } => {
            let features = load_features(&multi, &features, &config)?;
            let request = analyze::AnalyzeRequest {
                lng,
                lat,
                radius: radius.unwrap_or(config.default_radius),
                unit: unit.unwrap_or(config.default_unit),
                mode,
                csv,
                buffer_out,
                json,
            };
            analyze::run(features, config, &request)?;
        }
        Commands::Sweep {
            features,
            lng,
            lat,
            radii,
            unit,
        } => {
            let features = load_features(&multi, &features, &config)?;
            analyze::sweep(&multi, features, &config, lng, lat, &radii, unit)?;
        }
        Commands::Factors { aliases } => {
            report::print_factors(cal_bioscape_residue::ResidueTable::builtin(), aliases);
        }
        Commands::Interactive { features } => {
            let features = match features {
                Some(path) => Some(load_features(&multi, &path, &config)?),
                None => None,
            };
            interactive::run(&multi, config, features)?;
        }
    }

    Ok(())
}

/// Reads and parses a cropland layer with the configured property names.
fn load_features(
    multi: &MultiProgress,
    path: &Path,
    config: &SessionConfig,
) -> Result<Vec<Feature>, Box<dyn std::error::Error>> {
    let spinner = cal_bioscape_cli_utils::spinner(multi, &format!("Loading {}", path.display()));
    let data = std::fs::read_to_string(path)?;
    let features = features_from_geojson(&data, &config.schema)?;
    spinner.finish_and_clear();

    log::info!("Loaded {} features from {}", features.len(), path.display());
    Ok(features)
}
