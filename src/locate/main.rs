//! One-shot reverse geocoding from the command line.
//!
//! Prints the nearest place to LAT LON as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use geoloc::config::Config;
use geoloc::geonames::GeonamesDataset;
use geoloc::Geocoder;

#[derive(Parser, Debug)]
#[command(name = "locate")]
#[command(about = "Find the place nearest to a coordinate")]
struct Args {
    /// Latitude in decimal degrees
    #[arg(allow_hyphen_values = true)]
    lat: String,

    /// Longitude in decimal degrees
    #[arg(allow_hyphen_values = true)]
    lon: String,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the GeoNames dumps (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the result
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data.dir = dir;
    }

    info!("Searching... please wait");

    let geocoder = Geocoder::new(GeonamesDataset::from_config(&config.data));
    let result = geocoder
        .reverse_geocode(args.lat.as_str(), args.lon.as_str())
        .await
        .context("Reverse geocoding failed")?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
