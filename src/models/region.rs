use serde::{Deserialize, Serialize};

/// An administrative region found below a city, with its boundary rings
/// flattened to `[x, y]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDescriptor {
    pub id: i64,
    pub name: String,
    pub depth: u8,
    pub regions: Vec<Vec<[f64; 2]>>,
}
