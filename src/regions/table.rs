use geo::Geometry;
use serde::{Deserialize, Serialize};

/// One administrative area row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRecord {
    /// OSM relation ID
    pub id: i64,

    /// Local display name, matched against city names
    pub name: String,

    /// Delimited text of parent ids; `None` for root-level areas
    #[serde(default)]
    pub parents: Option<String>,

    /// OSM admin_level, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_level: Option<u8>,

    pub geometry: Geometry<f64>,
}

/// Flat, read-only table of boundary records in their natural row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryTable {
    records: Vec<BoundaryRecord>,
}

impl BoundaryTable {
    pub fn new(records: Vec<BoundaryRecord>) -> Self {
        Self { records }
    }

    /// Ids of every record with exactly this name, in row order
    pub fn ids_named(&self, name: &str) -> Vec<i64> {
        self.records
            .iter()
            .filter(|r| r.name == name)
            .map(|r| r.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundaryRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[BoundaryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<BoundaryRecord> for BoundaryTable {
    fn from_iter<I: IntoIterator<Item = BoundaryRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
