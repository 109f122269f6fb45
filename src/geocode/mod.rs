//! City geocoding to bounding boxes.

mod nominatim;

use std::future::Future;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use nominatim::NominatimClient;

/// Geographic bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Enlarge the box by `extension` percent of its height and width,
    /// split evenly between opposite sides.
    pub fn extend(self, extension: f64) -> Self {
        let delta_ns = (self.north - self.south) * extension / 200.0;
        let delta_ew = (self.east - self.west) * extension / 200.0;
        Self {
            north: self.north + delta_ns,
            south: self.south - delta_ns,
            east: self.east + delta_ew,
            west: self.west - delta_ew,
        }
    }
}

/// Resolves a city name to its bounding box.
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when nothing matches the name
    fn geocode(&self, city: &str) -> impl Future<Output = Result<Option<BoundingBox>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_by_percent() {
        let bbox = BoundingBox {
            north: 10.0,
            south: 0.0,
            east: 40.0,
            west: 20.0,
        };

        let extended = bbox.extend(20.0);
        assert_eq!(extended.north, 11.0);
        assert_eq!(extended.south, -1.0);
        assert_eq!(extended.east, 42.0);
        assert_eq!(extended.west, 18.0);
    }

    #[test]
    fn test_zero_extension_is_identity() {
        let bbox = BoundingBox {
            north: 55.9,
            south: 55.5,
            east: 37.9,
            west: 37.3,
        };
        assert_eq!(bbox.extend(0.0), bbox);
    }
}
