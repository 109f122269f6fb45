//! Depth-bounded walk down the parent/child boundary hierarchy.

use std::sync::Arc;

use hashbrown::HashSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{flatten_boundary, Boundary, BoundaryTable, RegionError};
use crate::models::RegionDescriptor;

/// Deepest hop count that can be requested
pub const MAX_DEPTH: u8 = 2;

/// How a record's `parents` text is tested against the current id set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentMatch {
    /// The parents text contains any current id as a substring.
    ///
    /// Compatible with existing region outputs, but matches on digit
    /// substrings too: `parents = "12"` is a child of id `1`.
    #[default]
    Textual,
    /// The parents text is split into integer ids and tested for membership.
    Exact,
}

/// Resolves regions below a city against one loaded boundary table.
#[derive(Debug, Clone)]
pub struct RegionHierarchyResolver {
    table: Arc<BoundaryTable>,
    parent_match: ParentMatch,
}

impl RegionHierarchyResolver {
    pub fn new(table: Arc<BoundaryTable>, parent_match: ParentMatch) -> Self {
        Self {
            table,
            parent_match,
        }
    }

    pub fn resolve(
        &self,
        entity_name: &str,
        depth: i64,
    ) -> Result<Option<Vec<RegionDescriptor>>, RegionError> {
        resolve_regions_at_depth(entity_name, &self.table, depth, self.parent_match)
    }
}

/// Find the regions exactly `depth` hops below the records named
/// `entity_name`.
///
/// Returns `Ok(None)` when `depth` is outside `0..=MAX_DEPTH` or when the
/// walk runs out of records before reaching it; the two cases are not told
/// apart.
pub fn resolve_regions_at_depth(
    entity_name: &str,
    table: &BoundaryTable,
    depth: i64,
    parent_match: ParentMatch,
) -> Result<Option<Vec<RegionDescriptor>>, RegionError> {
    let depth = match u8::try_from(depth) {
        Ok(d) if d <= MAX_DEPTH => d,
        _ => return Ok(None),
    };

    let mut ids = table.ids_named(entity_name);
    let mut current_depth = 0u8;

    while !ids.is_empty() {
        if current_depth == depth {
            return convert_all(table, &ids, depth).map(Some);
        }

        ids = children(table, &ids, parent_match)?;
        current_depth += 1;
        debug!(
            "{}: {} regions at depth {}",
            entity_name,
            ids.len(),
            current_depth
        );
    }

    Ok(None)
}

/// Ids of the records whose `parents` reference any of `ids`, in row order.
pub fn children(
    table: &BoundaryTable,
    ids: &[i64],
    parent_match: ParentMatch,
) -> Result<Vec<i64>, RegionError> {
    let children = match parent_match {
        ParentMatch::Textual => {
            let alternation = ids
                .iter()
                .map(|id| regex::escape(&id.to_string()))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = Regex::new(&alternation)?;

            table
                .iter()
                .filter(|r| r.parents.as_deref().is_some_and(|p| pattern.is_match(p)))
                .map(|r| r.id)
                .collect()
        }
        ParentMatch::Exact => {
            let wanted: HashSet<i64> = ids.iter().copied().collect();

            table
                .iter()
                .filter(|r| {
                    r.parents
                        .as_deref()
                        .is_some_and(|p| parse_parent_ids(p).any(|id| wanted.contains(&id)))
                })
                .map(|r| r.id)
                .collect()
        }
    };

    Ok(children)
}

fn parse_parent_ids(parents: &str) -> impl Iterator<Item = i64> + '_ {
    parents
        .split(|c: char| c == ',' || c == ';' || c == '|' || c.is_whitespace())
        .filter_map(|token| token.trim().parse().ok())
}

/// Build descriptors for the records whose id is in `ids`.
///
/// Fails on the first record without a ring boundary; no partial result
/// is returned.
pub fn convert_all(
    table: &BoundaryTable,
    ids: &[i64],
    depth: u8,
) -> Result<Vec<RegionDescriptor>, RegionError> {
    let wanted: HashSet<i64> = ids.iter().copied().collect();

    table
        .iter()
        .filter(|r| wanted.contains(&r.id))
        .map(|r| {
            let boundary = Boundary::of(r.id, &r.geometry)?;
            Ok(RegionDescriptor {
                id: r.id,
                name: r.name.clone(),
                depth,
                regions: flatten_boundary(&boundary),
            })
        })
        .collect()
}
