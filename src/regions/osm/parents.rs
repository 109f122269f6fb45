//! Spatial derivation of parent ids for extracted boundaries.

use geo::{BoundingRect, Contains, Geometry, InteriorPoint};
use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use super::AdminBoundary;
use crate::regions::{BoundaryRecord, BoundaryTable};

/// R-tree entry pointing back into the boundary list
struct IndexedBoundary {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBoundary {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Turn boundaries into records whose `parents` is the id of the nearest
/// enclosing boundary: the one with the highest admin level strictly below
/// the record's own level that contains an interior point of it.
pub(crate) fn assign_parents(boundaries: Vec<AdminBoundary>) -> BoundaryTable {
    info!(
        "Building spatial index for {} boundaries...",
        boundaries.len()
    );

    let indexed: Vec<IndexedBoundary> = boundaries
        .iter()
        .enumerate()
        .filter_map(|(index, b)| {
            let rect = b.geometry.bounding_rect()?;
            Some(IndexedBoundary {
                index,
                envelope: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
            })
        })
        .collect();
    let tree = RTree::bulk_load(indexed);

    let parents: Vec<Option<i64>> = boundaries
        .iter()
        .map(|b| {
            let point = b.geometry.interior_point()?;
            tree.locate_in_envelope_intersecting(&AABB::from_point([point.x(), point.y()]))
                .map(|ib| &boundaries[ib.index])
                .filter(|candidate| candidate.admin_level < b.admin_level)
                .filter(|candidate| candidate.geometry.contains(&point))
                .max_by_key(|candidate| candidate.admin_level)
                .map(|candidate| candidate.id)
        })
        .collect();

    let linked = parents.iter().filter(|p| p.is_some()).count();
    info!("Linked {} of {} boundaries to a parent", linked, boundaries.len());

    boundaries
        .into_iter()
        .zip(parents)
        .map(|(b, parent)| BoundaryRecord {
            id: b.id,
            name: b.name,
            parents: parent.map(|id| id.to_string()),
            admin_level: Some(b.admin_level),
            geometry: Geometry::MultiPolygon(b.geometry),
        })
        .collect()
}
