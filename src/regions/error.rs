use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegionError {
    /// The record's boundary is neither a single ring nor a set of rings
    #[error("boundary {id}: geometry kind {kind} has no ring boundary")]
    UnsupportedGeometryKind { id: i64, kind: &'static str },

    #[error("invalid parent pattern: {0}")]
    Pattern(#[from] regex::Error),
}
