//! Boundary table extraction from OSM PBF extracts.
//!
//! Admin boundary relations become boundary records; each record's
//! `parents` is derived spatially from the enclosing boundaries.

mod geometry;
mod parents;

use std::io::{Read, Seek};

use anyhow::Result;
use geo::MultiPolygon;
use osmpbfreader::{OsmObj, OsmPbfReader, Tags};
use tracing::{debug, info};

pub use geometry::GeometryResolver;

use super::BoundaryTable;

/// An admin boundary with its resolved geometry, before parents are known
#[derive(Debug, Clone)]
pub(crate) struct AdminBoundary {
    pub id: i64,
    pub name: String,
    pub admin_level: u8,
    pub geometry: MultiPolygon<f64>,
}

pub(crate) fn is_admin_boundary(tags: &Tags) -> bool {
    let is_admin = tags
        .get("boundary")
        .map(|v| v == "administrative")
        .unwrap_or(false);

    // Must be type=boundary or type=multipolygon
    let type_tag = tags.get("type").map(|v| v.as_str());
    is_admin && matches!(type_tag, Some("boundary") | Some("multipolygon"))
}

fn admin_level(tags: &Tags) -> Option<u8> {
    let level: u8 = tags.get("admin_level")?.parse().ok()?;
    (2..=11).contains(&level).then_some(level)
}

/// Extract a boundary table from an OSM PBF file
pub fn extract_boundaries<R: Read + Seek>(reader: &mut OsmPbfReader<R>) -> Result<BoundaryTable> {
    let resolver = GeometryResolver::build(reader, is_admin_boundary)?;

    info!("Extracting admin boundaries...");
    reader.rewind()?;

    let mut boundaries = Vec::new();

    for obj in reader.iter() {
        let obj = obj?;

        let rel = match &obj {
            OsmObj::Relation(r) if is_admin_boundary(&r.tags) => r,
            _ => continue,
        };

        let Some(level) = admin_level(&rel.tags) else {
            continue;
        };

        let Some(name) = rel.tags.get("name") else {
            continue;
        };

        match resolver.resolve_relation(rel.id) {
            Some(geometry) => boundaries.push(AdminBoundary {
                id: rel.id.0,
                name: name.to_string(),
                admin_level: level,
                geometry,
            }),
            None => debug!("Could not resolve geometry for admin boundary {}", rel.id.0),
        }
    }

    info!("Found {} admin boundaries", boundaries.len());

    // Country first; the table keeps this order
    boundaries.sort_by_key(|b| b.admin_level);

    Ok(parents::assign_parents(boundaries))
}
