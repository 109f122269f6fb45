use anyhow::Result;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use hashbrown::{HashMap, HashSet};
use osmpbfreader::{NodeId, OsmId, OsmObj, OsmPbfReader, RelationId, Tags, WayId};
use sled::Db;
use std::io::{Read, Seek};
use tempfile::{Builder, TempDir};
use tracing::info;

/// Resolves relation geometries from their outer member ways.
///
/// Node coordinates are kept in a temporary sled database so that
/// country-sized extracts do not have to fit in memory.
pub struct GeometryResolver {
    node_db: Db,
    _node_dir: TempDir,
    way_nodes: HashMap<WayId, Vec<NodeId>>,
    relation_members: HashMap<RelationId, Vec<WayId>>,
}

impl GeometryResolver {
    /// Build the resolver by scanning the file for relations matching `filter`
    pub fn build<R: Read + Seek, F>(reader: &mut OsmPbfReader<R>, filter: F) -> Result<Self>
    where
        F: Fn(&Tags) -> bool,
    {
        info!("Building geometry index...");

        let mut needed_ways = HashSet::new();
        let mut needed_nodes = HashSet::new();

        let mut relation_members = HashMap::new();
        let mut way_nodes = HashMap::new();

        info!("Pass 1/3: Identifying relevant relations...");
        reader.rewind()?;
        for obj in reader.iter() {
            if let OsmObj::Relation(rel) = obj? {
                if filter(&rel.tags) {
                    let ways: Vec<WayId> = rel
                        .refs
                        .iter()
                        .filter(|m| m.role == "outer" || m.role.is_empty())
                        .filter_map(|m| match m.member {
                            OsmId::Way(way_id) => Some(way_id),
                            _ => None,
                        })
                        .collect();
                    needed_ways.extend(ways.iter().copied());
                    relation_members.insert(rel.id, ways);
                }
            }
        }
        info!("Found {} relevant relations", relation_members.len());

        info!("Pass 2/3: Identifying member ways...");
        reader.rewind()?;
        for obj in reader.iter() {
            if let OsmObj::Way(way) = obj? {
                if needed_ways.contains(&way.id) {
                    needed_nodes.extend(way.nodes.iter().copied());
                    way_nodes.insert(way.id, way.nodes);
                }
            }
        }
        info!(
            "Found {} member ways, referencing {} nodes",
            way_nodes.len(),
            needed_nodes.len()
        );

        info!("Pass 3/3: Storing node coordinates...");
        reader.rewind()?;

        let node_dir = Builder::new().prefix("citygraph-geo-").tempdir()?;
        let node_db = sled::open(node_dir.path())?;

        let mut stored_count = 0;
        for obj in reader.iter() {
            if let OsmObj::Node(node) = obj? {
                if needed_nodes.contains(&node.id) {
                    node_db.insert(node.id.0.to_be_bytes(), &encode_coord(node.lon(), node.lat()))?;
                    stored_count += 1;
                }
            }
        }

        node_db.flush()?;
        info!("Stored {} node coordinates", stored_count);

        Ok(Self {
            node_db,
            _node_dir: node_dir,
            way_nodes,
            relation_members,
        })
    }

    fn node_coord(&self, node: &NodeId) -> Option<Coord<f64>> {
        let bytes = self.node_db.get(node.0.to_be_bytes()).ok()??;
        decode_coord(&bytes)
    }

    /// Resolve geometry for a relation (multipolygon of merged outer rings)
    pub fn resolve_relation(&self, rel_id: RelationId) -> Option<MultiPolygon<f64>> {
        let member_ways = self.relation_members.get(&rel_id)?;

        let rings: Vec<Vec<Coord<f64>>> = member_ways
            .iter()
            .filter_map(|way_id| self.way_nodes.get(way_id))
            .map(|nodes| nodes.iter().filter_map(|n| self.node_coord(n)).collect::<Vec<_>>())
            .filter(|coords| coords.len() >= 2)
            .collect();

        let polygons = merge_rings_to_polygons(rings);
        if polygons.is_empty() {
            return None;
        }

        Some(MultiPolygon::new(polygons))
    }
}

fn encode_coord(lon: f64, lat: f64) -> [u8; 16] {
    let mut value = [0u8; 16];
    value[0..8].copy_from_slice(&lon.to_be_bytes());
    value[8..16].copy_from_slice(&lat.to_be_bytes());
    value
}

fn decode_coord(bytes: &[u8]) -> Option<Coord<f64>> {
    let lon = f64::from_be_bytes(bytes.get(0..8)?.try_into().ok()?);
    let lat = f64::from_be_bytes(bytes.get(8..16)?.try_into().ok()?);
    Some(Coord { x: lon, y: lat })
}

/// Merge way segments into closed rings, one polygon per ring.
///
/// Segments are joined end to end (reversing when needed); chains that
/// cannot be closed into at least a triangle are dropped.
pub fn merge_rings_to_polygons(rings: Vec<Vec<Coord<f64>>>) -> Vec<Polygon<f64>> {
    let mut result = Vec::new();
    let mut remaining = rings;

    while !remaining.is_empty() {
        let mut current = remaining.remove(0);

        if current.first() == current.last() && current.len() >= 4 {
            result.push(Polygon::new(LineString::new(current), vec![]));
            continue;
        }

        while let Some(i) = remaining.iter().position(|segment| {
            segment.first() == current.last()
                || segment.last() == current.last()
                || segment.last() == current.first()
                || segment.first() == current.first()
        }) {
            let mut segment = remaining.remove(i);
            if segment.first() == current.last() {
                segment.remove(0);
                current.extend(segment);
            } else if segment.last() == current.last() {
                segment.reverse();
                segment.remove(0);
                current.extend(segment);
            } else if segment.last() == current.first() {
                segment.pop();
                segment.extend(current);
                current = segment;
            } else {
                segment.reverse();
                segment.pop();
                segment.extend(current);
                current = segment;
            }

            if current.first() == current.last() {
                break;
            }
        }

        if current.len() >= 3 {
            if current.first() != current.last() {
                current.push(current[0]);
            }
            if current.len() >= 4 {
                result.push(Polygon::new(LineString::new(current), vec![]));
            }
        }
    }

    result
}
