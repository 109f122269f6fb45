//! HTTP API server for cities, their regions and road-network graphs.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use citygraph::config::Config;
use citygraph::geocode::NominatimClient;
use citygraph::graph::{GraphDownloader, GraphStore, OverpassClient};
use citygraph::models::{CityView, RegionDescriptor};
use citygraph::regions::{load_geojson, RegionHierarchyResolver};
use citygraph::service::CityService;
use citygraph::store::CityStore;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "City metadata and region API server")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Boundary table GeoJSON (overrides config; the stored table is used otherwise)
    #[arg(long)]
    regions: Option<PathBuf>,
}

type AppState = Arc<CityService<NominatimClient, OverpassClient>>;

type ApiError = (StatusCode, String);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;

    info!("citygraph server");

    let store = CityStore::open(&config.storage.db_path).context("Failed to open store")?;

    let table = match args.regions.as_ref().or(config.regions.geojson.as_ref()) {
        Some(path) => load_geojson(path)?,
        None => store.load_boundaries()?,
    };
    info!(
        "Boundary table: {} records, parent match {:?}",
        table.len(),
        config.regions.parent_match
    );
    let regions = RegionHierarchyResolver::new(Arc::new(table), config.regions.parent_match);

    let geocoder = NominatimClient::new(
        &config.geocoder.nominatim_url,
        &config.geocoder.user_agent,
        config.geocoder.timeout(),
    )?;
    let overpass = OverpassClient::new(
        &config.geocoder.overpass_url,
        &config.geocoder.user_agent,
        config.geocoder.timeout(),
    )?;
    let downloader = GraphDownloader::new(
        geocoder,
        overpass,
        GraphStore::new(&config.storage.graph_dir),
    );

    let state: AppState = Arc::new(CityService::new(store, downloader, regions));

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/cities", get(cities_handler))
        .route("/cities/{id}", get(city_handler))
        .route(
            "/cities/{id}/download",
            post(download_handler).delete(delete_handler),
        )
        .route("/cities/{id}/regions", get(regions_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listen = args.listen.unwrap_or(config.server.listen);
    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn internal_error(context: &str, e: anyhow::Error) -> ApiError {
    tracing::error!("{} failed: {:#}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
}

fn found<T>(value: Option<T>, what: &str) -> Result<Json<T>, ApiError> {
    value
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("{} not found", what)))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Deserialize)]
struct PageParams {
    page: Option<usize>,
    per_page: Option<usize>,
}

async fn cities_handler(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<CityView>>, ApiError> {
    let cities = state
        .get_cities(params.page.unwrap_or(0), params.per_page.unwrap_or(10))
        .await
        .map_err(|e| internal_error("City listing", e))?;
    Ok(Json(cities))
}

async fn city_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<CityView>, ApiError> {
    let city = state
        .get_city(id)
        .await
        .map_err(|e| internal_error("City lookup", e))?;
    found(city, "city")
}

#[derive(Deserialize)]
struct DownloadParams {
    /// Percentage to enlarge the bounding box by
    extension: Option<f64>,
}

async fn download_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(params): Query<DownloadParams>,
) -> Result<Json<CityView>, ApiError> {
    let city = state
        .download_city(id, params.extension.unwrap_or(0.0))
        .await
        .map_err(|e| internal_error("Graph download", e))?;
    found(city, "city")
}

async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<CityView>, ApiError> {
    let city = state
        .delete_city(id)
        .await
        .map_err(|e| internal_error("Graph delete", e))?;
    found(city, "city")
}

#[derive(Deserialize)]
struct RegionParams {
    depth: Option<i64>,
}

async fn regions_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(params): Query<RegionParams>,
) -> Result<Json<Vec<RegionDescriptor>>, ApiError> {
    let regions = state
        .get_regions(id, params.depth.unwrap_or(0))
        .map_err(|e| internal_error("Region lookup", e))?;
    found(regions, "regions")
}
