//! Boundary table loader for GeoJSON exports (OSM-Boundaries layout:
//! `osm_id`, `local_name` and `parents` feature properties).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{BoundaryRecord, BoundaryTable};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    // decoded per feature so one bad geometry does not reject the file
    geometry: Option<Value>,
}

type Position = Vec<f64>;

/// Every RFC 7946 geometry type; whether a kind has a ring boundary is
/// decided when the record is converted, not here.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<GeoJsonGeometry> },
}

/// Load a boundary table from a GeoJSON FeatureCollection file
pub fn load_geojson(path: &Path) -> Result<BoundaryTable> {
    info!("Loading boundary table from {}", path.display());

    let file = File::open(path).context("Failed to open boundary GeoJSON")?;
    let table = read_geojson(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    info!("Loaded {} boundary records", table.len());
    Ok(table)
}

pub(crate) fn read_geojson<R: Read>(reader: R) -> Result<BoundaryTable> {
    let collection: FeatureCollection = serde_json::from_reader(reader)?;

    let mut records = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.into_iter().enumerate() {
        let properties = feature.properties.unwrap_or_default();

        let Some(id) = properties.get("osm_id").and_then(parse_id) else {
            warn!("Feature {} has no usable osm_id, skipping", index);
            continue;
        };

        let name = properties
            .get("local_name")
            .or_else(|| properties.get("name"))
            .and_then(Value::as_str);
        let Some(name) = name else {
            warn!("Boundary {} has no name, skipping", id);
            continue;
        };

        let Some(geometry) = feature.geometry.filter(|g| !g.is_null()) else {
            warn!("Boundary {} has no geometry, skipping", id);
            continue;
        };

        let geometry = match decode_geometry(geometry) {
            Ok(geometry) => geometry,
            Err(e) => {
                warn!("Boundary {} has an unreadable geometry, skipping: {:#}", id, e);
                continue;
            }
        };

        let admin_level = properties
            .get("admin_level")
            .and_then(parse_id)
            .and_then(|l| u8::try_from(l).ok());

        records.push(BoundaryRecord {
            id,
            name: name.to_string(),
            parents: properties.get("parents").and_then(parents_text),
            admin_level,
            geometry,
        });
    }

    Ok(BoundaryTable::new(records))
}

/// Relation ids come as numbers or numeric strings; some exporters negate
/// relation ids to tell them apart from ways.
fn parse_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    Some(id.abs())
}

fn parents_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|v| match v {
                    Value::Number(n) => Some(n.to_string()),
                    Value::String(s) => Some(s.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

fn to_coord(position: &[f64]) -> Result<Coord<f64>> {
    match position {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => bail!("position has {} values, expected at least 2", position.len()),
    }
}

fn to_line(positions: &[Position]) -> Result<LineString<f64>> {
    positions
        .iter()
        .map(|p| to_coord(p))
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn to_polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|r| to_line(r));
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => LineString::new(vec![]),
    };
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn decode_geometry(value: Value) -> Result<Geometry<f64>> {
    let geometry: GeoJsonGeometry = serde_json::from_value(value)?;
    to_geometry(geometry)
}

fn to_geometry(geometry: GeoJsonGeometry) -> Result<Geometry<f64>> {
    let geometry = match geometry {
        GeoJsonGeometry::Point { coordinates } => {
            Geometry::Point(Point::from(to_coord(&coordinates)?))
        }
        GeoJsonGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint::new(
            coordinates
                .iter()
                .map(|p| to_coord(p).map(Point::from))
                .collect::<Result<_>>()?,
        )),
        GeoJsonGeometry::LineString { coordinates } => {
            Geometry::LineString(to_line(&coordinates)?)
        }
        GeoJsonGeometry::MultiLineString { coordinates } => {
            Geometry::MultiLineString(MultiLineString::new(
                coordinates
                    .iter()
                    .map(|l| to_line(l))
                    .collect::<Result<_>>()?,
            ))
        }
        GeoJsonGeometry::Polygon { coordinates } => Geometry::Polygon(to_polygon(&coordinates)?),
        GeoJsonGeometry::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon::new(
            coordinates
                .iter()
                .map(|p| to_polygon(p))
                .collect::<Result<_>>()?,
        )),
        GeoJsonGeometry::GeometryCollection { geometries } => {
            Geometry::GeometryCollection(GeometryCollection(
                geometries
                    .into_iter()
                    .map(to_geometry)
                    .collect::<Result<_>>()?,
            ))
        }
    };
    Ok(geometry)
}
