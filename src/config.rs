//! TOML configuration shared by the server and ingest binaries.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::regions::ParentMatch;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub geocoder: GeocoderConfig,
    pub regions: RegionsConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// sled database directory
    pub db_path: PathBuf,
    /// Downloaded road-network graphs
    pub graph_dir: PathBuf,
    /// Pre-fetched `{city}.osm` files picked up during CSV ingest
    pub osm_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/citygraph.db"),
            graph_dir: PathBuf::from("./data/graphs"),
            osm_dir: PathBuf::from("./data/cities_osm"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    pub nominatim_url: String,
    pub overpass_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            nominatim_url: "https://nominatim.openstreetmap.org/".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            user_agent: "citygraph/0.1".to_string(),
            timeout_secs: 180,
        }
    }
}

impl GeocoderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RegionsConfig {
    /// Boundary table GeoJSON; the stored table is used when unset
    pub geojson: Option<PathBuf>,
    pub parent_match: ParentMatch,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}
