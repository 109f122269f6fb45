//! Ring boundaries of area geometries.

use geo::{Geometry, LineString, MultiLineString, Polygon};

use super::RegionError;

/// Boundary of an area-bearing geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    /// A polygon without holes
    Ring(LineString<f64>),
    /// Polygons with holes, and multipolygons
    MultiRing(MultiLineString<f64>),
}

impl Boundary {
    /// Derive the boundary of a record's geometry.
    ///
    /// Points and lines have no ring boundary and are rejected, as are
    /// collections. A multipolygon always yields `MultiRing`, even with a
    /// single hole-free member.
    pub fn of(id: i64, geometry: &Geometry<f64>) -> Result<Self, RegionError> {
        match geometry {
            Geometry::Polygon(polygon) => Ok(Self::of_polygon(polygon)),
            Geometry::Rect(rect) => Ok(Self::of_polygon(&rect.to_polygon())),
            Geometry::Triangle(triangle) => Ok(Self::of_polygon(&triangle.to_polygon())),
            Geometry::MultiPolygon(multi) => Ok(Boundary::MultiRing(MultiLineString::new(
                multi.0.iter().flat_map(polygon_rings).collect(),
            ))),
            other => Err(RegionError::UnsupportedGeometryKind {
                id,
                kind: geometry_kind(other),
            }),
        }
    }

    fn of_polygon(polygon: &Polygon<f64>) -> Self {
        if polygon.interiors().is_empty() {
            Boundary::Ring(polygon.exterior().clone())
        } else {
            Boundary::MultiRing(MultiLineString::new(polygon_rings(polygon).collect()))
        }
    }
}

fn polygon_rings(polygon: &Polygon<f64>) -> impl Iterator<Item = LineString<f64>> + '_ {
    std::iter::once(polygon.exterior().clone()).chain(polygon.interiors().iter().cloned())
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

fn ring_coords(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    ring.coords().map(|c| [c.x, c.y]).collect()
}

/// Flatten a boundary to rings of `[x, y]` pairs, keeping coordinate and
/// ring order.
pub fn flatten_boundary(boundary: &Boundary) -> Vec<Vec<[f64; 2]>> {
    match boundary {
        Boundary::Ring(ring) => vec![ring_coords(ring)],
        Boundary::MultiRing(rings) => rings.0.iter().map(ring_coords).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, MultiPolygon};

    #[test]
    fn test_flatten_single_ring() {
        let ring = line_string![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        let flat = flatten_boundary(&Boundary::Ring(ring));
        assert_eq!(
            flat,
            vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        );
    }

    #[test]
    fn test_flatten_multi_ring_keeps_order() {
        let first = line_string![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ];
        let second = line_string![
            (x: 5.0, y: 5.0),
            (x: 6.0, y: 5.0),
            (x: 6.0, y: 6.0),
            (x: 5.0, y: 5.0),
        ];
        let flat = flatten_boundary(&Boundary::MultiRing(MultiLineString::new(vec![
            first, second,
        ])));

        assert_eq!(
            flat,
            vec![
                vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 0.0]],
                vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]],
            ]
        );
    }

    #[test]
    fn test_polygon_without_holes_is_ring() {
        let poly = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let boundary = Boundary::of(1, &Geometry::Polygon(poly)).unwrap();
        assert!(matches!(boundary, Boundary::Ring(_)));
    }

    #[test]
    fn test_polygon_with_hole_is_multi_ring() {
        let poly = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            interiors: [[(x: 2.0, y: 2.0), (x: 3.0, y: 2.0), (x: 3.0, y: 3.0)]],
        );
        let boundary = Boundary::of(1, &Geometry::Polygon(poly)).unwrap();
        match boundary {
            Boundary::MultiRing(rings) => assert_eq!(rings.0.len(), 2),
            other => panic!("expected multi ring, got {:?}", other),
        }
    }

    #[test]
    fn test_multipolygon_is_multi_ring() {
        let a = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let geometry = Geometry::MultiPolygon(MultiPolygon::new(vec![a]));
        let boundary = Boundary::of(4, &geometry).unwrap();
        assert_eq!(flatten_boundary(&boundary).len(), 1);
        assert!(matches!(boundary, Boundary::MultiRing(_)));
    }

    #[test]
    fn test_point_is_unsupported() {
        let err = Boundary::of(9, &Geometry::Point(point!(x: 1.0, y: 2.0))).unwrap_err();
        match err {
            RegionError::UnsupportedGeometryKind { id, kind } => {
                assert_eq!(id, 9);
                assert_eq!(kind, "Point");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
