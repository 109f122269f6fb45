//! City records as stored, and the views returned to API callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geocoded centre point of a city
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub id: u64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Demographic properties of a city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityProperty {
    pub id: u64,

    /// Id of the centre point in the `points` tree
    pub id_center: u64,

    pub population: u64,

    #[serde(default)]
    pub population_density: Option<f64>,

    pub time_zone: String,

    pub time_created: DateTime<Utc>,
}

/// A city row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: u64,
    pub city_name: String,
    pub id_property: u64,

    /// Whether a road-network graph file has been fetched for this city
    #[serde(default)]
    pub downloaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointView {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&GeoPoint> for PointView {
    fn from(point: &GeoPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyView {
    pub population: u64,
    pub population_density: Option<f64>,
    pub time_zone: String,
    pub time_created: String,
    pub center: Option<PointView>,
}

impl PropertyView {
    pub fn new(property: &CityProperty, center: Option<&GeoPoint>) -> Self {
        Self {
            population: property.population,
            population_density: property.population_density,
            time_zone: property.time_zone.clone(),
            time_created: property.time_created.to_rfc3339(),
            center: center.map(PointView::from),
        }
    }
}

/// City as returned by the API, with its property and centre resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityView {
    pub id: u64,
    pub city_name: String,
    pub downloaded: bool,
    pub property: Option<PropertyView>,
}

impl CityView {
    pub fn new(city: &City, property: Option<PropertyView>) -> Self {
        Self {
            id: city.id,
            city_name: city.city_name.clone(),
            downloaded: city.downloaded,
            property,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_view_serialization() {
        let city = City {
            id: 3,
            city_name: "Казань".to_string(),
            id_property: 1,
            downloaded: true,
        };
        let property = CityProperty {
            id: 1,
            id_center: 2,
            population: 1_257_391,
            population_density: None,
            time_zone: "UTC+3".to_string(),
            time_created: Utc::now(),
        };
        let center = GeoPoint {
            id: 2,
            latitude: 55.79,
            longitude: 49.12,
        };

        let view = CityView::new(&city, Some(PropertyView::new(&property, Some(&center))));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["downloaded"], true);
        assert_eq!(json["property"]["population"], 1_257_391);
        assert_eq!(json["property"]["center"]["latitude"], 55.79);
    }

    #[test]
    fn test_missing_density_defaults() {
        let json = r#"{"id":1,"id_center":1,"population":10,"time_zone":"UTC+5","time_created":"2024-01-01T00:00:00Z"}"#;
        let property: CityProperty = serde_json::from_str(json).unwrap();
        assert!(property.population_density.is_none());
    }
}
