//! Query server for reverse geocoding.
//!
//! Provides an HTTP API answering "which place is nearest to this point"
//! from a locally loaded GeoNames gazetteer.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use geoloc::config::Config;
use geoloc::geonames::GeonamesDataset;
use geoloc::{Geocoder, GeolocError, ReverseGeocodeResult, Status};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Offline reverse geocoding server")]
struct Args {
    /// Listen address (overrides the config file)
    #[arg(short, long)]
    listen: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the GeoNames dumps (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

/// Application state shared across handlers
struct AppState {
    geocoder: Geocoder,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data.dir = dir;
    }
    let listen = args.listen.unwrap_or_else(|| config.server.listen.clone());

    info!("geoloc query server");
    info!("GeoNames data directory: {}", config.data.dir.display());

    let dataset = GeonamesDataset::from_config(&config.data);
    let state = Arc::new(AppState {
        geocoder: Geocoder::new(dataset),
    });

    // Load the gazetteer in the background so the server can answer /health meanwhile
    let warm = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = warm.geocoder.warm_up().await {
            error!("Gazetteer failed to load: {}", e);
        }
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/reverse", get(reverse_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: state.geocoder.status(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: Status,
}

/// Reverse geocoding
async fn reverse_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReverseQueryParams>,
) -> Result<Json<ReverseGeocodeResult>, (StatusCode, String)> {
    let result = state
        .geocoder
        .reverse_geocode(params.lat, params.lon)
        .await
        .map_err(|e| {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("Reverse geocoding failed: {}", e);
            }
            (status, e.to_string())
        })?;

    Ok(Json(result))
}

fn status_for(err: &GeolocError) -> StatusCode {
    match err {
        GeolocError::InvalidCoordinate { .. } => StatusCode::BAD_REQUEST,
        GeolocError::NoMatch => StatusCode::NOT_FOUND,
        GeolocError::EmptyDataset | GeolocError::Load(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[derive(Deserialize)]
struct ReverseQueryParams {
    /// Point latitude; parsed by the geocoder so bad input gets a precise error
    lat: String,
    /// Point longitude
    lon: String,
}
