use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::{BoundingBox, Geocoder};

/// Nominatim search client
pub struct NominatimClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: Option<String>,
    /// `[south, north, west, east]` as decimal strings
    boundingbox: [String; 4],
}

impl NominatimClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        // `join` replaces the last path segment unless it ends with '/'
        let mut base_url = Url::parse(base_url).context("Invalid Nominatim URL")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    fn search_url(&self, city: &str) -> Result<Url> {
        let mut url = self.base_url.join("search")?;
        url.query_pairs_mut()
            .append_pair("city", city)
            .append_pair("format", "json")
            .append_pair("limit", "1");
        Ok(url)
    }
}

impl Geocoder for NominatimClient {
    async fn geocode(&self, city: &str) -> Result<Option<BoundingBox>> {
        let url = self.search_url(city)?;
        debug!("Geocoding {} via {}", city, url);

        let response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()
            .context("Nominatim request failed")?;
        let places: Vec<NominatimPlace> = response.json().await?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        info!(
            "Geocoded {} to {}",
            city,
            place.display_name.as_deref().unwrap_or("?")
        );
        parse_bbox(&place.boundingbox).map(Some)
    }
}

fn parse_bbox(raw: &[String; 4]) -> Result<BoundingBox> {
    let parse = |s: &String| -> Result<f64> {
        s.parse()
            .with_context(|| format!("Invalid bounding box value {:?}", s))
    };

    Ok(BoundingBox {
        south: parse(&raw[0])?,
        north: parse(&raw[1])?,
        west: parse(&raw[2])?,
        east: parse(&raw[3])?,
    })
}
