//! Administrative region hierarchy.
//!
//! Holds the flat boundary table (one row per administrative area, with
//! a textual parent-id list) and resolves the regions lying a given
//! number of parent/child hops below a named city.

mod boundary;
mod error;
mod geojson;
mod osm;
mod resolver;
mod table;

pub use boundary::{flatten_boundary, Boundary};
pub use error::RegionError;
pub use geojson::load_geojson;
pub use osm::{extract_boundaries, GeometryResolver};
pub use resolver::{
    children, convert_all, resolve_regions_at_depth, ParentMatch, RegionHierarchyResolver,
    MAX_DEPTH,
};
pub use table::{BoundaryRecord, BoundaryTable};
