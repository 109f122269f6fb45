//! Road-network graph files per city.
//!
//! A city's drivable network is fetched for its (optionally enlarged)
//! bounding box and kept as an OSM XML file named after the city.

mod overpass;
mod store;

use std::future::Future;

use anyhow::Result;
use tracing::info;

use crate::geocode::{BoundingBox, Geocoder};

pub use overpass::{drive_network_query, OverpassClient};
pub use store::GraphStore;

/// Source of road-network extracts
pub trait NetworkSource: Send + Sync {
    /// OSM XML of the drivable network inside `bbox`
    fn fetch_drive_network(&self, bbox: BoundingBox)
        -> impl Future<Output = Result<String>> + Send;
}

/// Fetches and deletes graph files.
pub struct GraphDownloader<G, N> {
    geocoder: G,
    network: N,
    store: GraphStore,
}

impl<G: Geocoder, N: NetworkSource> GraphDownloader<G, N> {
    pub fn new(geocoder: G, network: N, store: GraphStore) -> Self {
        Self {
            geocoder,
            network,
            store,
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Make sure a graph file exists for the city.
    ///
    /// Returns `Ok(false)` when the geocoder does not know the name.
    pub async fn download_info(&self, city_name: &str, extension: f64) -> Result<bool> {
        if self.store.exists(city_name) {
            info!("Exists: {}", self.store.path_for(city_name).display());
            return Ok(true);
        }

        info!("Loading: {}", self.store.path_for(city_name).display());

        let Some(bbox) = self.geocoder.geocode(city_name).await? else {
            info!("Invalid city name: {}", city_name);
            return Ok(false);
        };

        let xml = self.network.fetch_drive_network(bbox.extend(extension)).await?;
        self.store.save(city_name, xml.as_bytes())?;
        Ok(true)
    }

    /// Remove the city's graph file; `Ok(false)` when there was none.
    pub fn delete_info(&self, city_name: &str) -> Result<bool> {
        self.store.delete(city_name)
    }
}
