//! Ingest pipeline.
//!
//! Loads the cities CSV into the store, and imports the administrative
//! boundary table from a GeoJSON export or an OSM PBF extract.

mod cities;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use osmpbfreader::OsmPbfReader;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use citygraph::config::Config;
use citygraph::regions::{extract_boundaries, load_geojson};
use citygraph::store::CityStore;

use crate::cities::{init_db, load_city_rows};

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Load cities and boundary tables into the store")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store directory (overrides config)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the cities CSV
    Cities {
        /// Cities CSV (optionally .gz)
        #[arg(short, long, default_value = "./data/cities.csv")]
        file: PathBuf,

        /// Directory of pre-fetched `{city}.osm` files (overrides config)
        #[arg(long)]
        osm_dir: Option<PathBuf>,
    },
    /// Replace the stored boundary table
    Boundaries {
        /// GeoJSON FeatureCollection export
        #[arg(long, conflicts_with = "pbf", required_unless_present = "pbf")]
        geojson: Option<PathBuf>,

        /// OSM PBF extract to derive boundaries from
        #[arg(long)]
        pbf: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;

    let db_path = args.db.unwrap_or(config.storage.db_path.clone());
    let store = CityStore::open(&db_path).context("Failed to open store")?;

    match args.command {
        Command::Cities { file, osm_dir } => {
            let osm_dir = osm_dir.unwrap_or(config.storage.osm_dir.clone());
            let rows = load_city_rows(&file)?;

            let pb = ProgressBar::new(rows.len() as u64);
            let template = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(template)?
                    .progress_chars("#>-"),
            );

            let summary = init_db(&store, &rows, &osm_dir, |row, _| {
                pb.set_message(row.name.clone());
                pb.inc(1);
            })?;
            pb.finish_with_message("done");

            info!(
                "Cities: {} inserted, {} already present, {} graphs attached",
                summary.inserted, summary.existing, summary.attached
            );
        }
        Command::Boundaries { geojson, pbf } => {
            let table = match (geojson, pbf) {
                (Some(path), _) => load_geojson(&path)?,
                (None, Some(path)) => {
                    info!("Reading boundaries from {}", path.display());
                    let file = File::open(&path).context("Failed to open PBF file")?;
                    let mut reader = OsmPbfReader::new(BufReader::new(file));
                    extract_boundaries(&mut reader)?
                }
                (None, None) => anyhow::bail!("Either --geojson or --pbf is required"),
            };

            store.put_boundaries(&table)?;
        }
    }

    store.flush()?;
    info!("Ingest complete");
    Ok(())
}
