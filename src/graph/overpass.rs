use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;
use url::form_urlencoded;

use super::NetworkSource;
use crate::geocode::BoundingBox;

/// Highway classes that make up the drivable network
const DRIVE_HIGHWAYS: &[&str] = &[
    "motorway",
    "motorway_link",
    "trunk",
    "trunk_link",
    "primary",
    "primary_link",
    "secondary",
    "secondary_link",
    "tertiary",
    "tertiary_link",
    "unclassified",
    "residential",
    "living_street",
    "road",
];

/// Overpass QL for drivable ways in the box, with their nodes, as OSM XML
pub fn drive_network_query(bbox: &BoundingBox, timeout_secs: u64) -> String {
    format!(
        "[out:xml][timeout:{timeout}];\
         (way[\"highway\"~\"^({classes})$\"][\"area\"!~\"yes\"]({south},{west},{north},{east}););\
         (._;>;);\
         out body;",
        timeout = timeout_secs,
        classes = DRIVE_HIGHWAYS.join("|"),
        south = bbox.south,
        west = bbox.west,
        north = bbox.north,
        east = bbox.east,
    )
}

/// Overpass API client
pub struct OverpassClient {
    client: Client,
    endpoint: String,
    timeout_secs: u64,
}

impl OverpassClient {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

impl NetworkSource for OverpassClient {
    async fn fetch_drive_network(&self, bbox: BoundingBox) -> Result<String> {
        let query = drive_network_query(&bbox, self.timeout_secs);
        let body: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("data", &query)
            .finish();

        info!(
            "Fetching drive network for bbox N{} S{} E{} W{}",
            bbox.north, bbox.south, bbox.east, bbox.west
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?
            .error_for_status()
            .context("Overpass request failed")?;

        let xml = response.text().await?;
        info!("Received {} bytes of network data", xml.len());
        Ok(xml)
    }
}
