//! Per-feature diagnostics collected while reconstructing geometry.
//!
//! A diagnostic never aborts the call that produced it; the affected feature
//! is skipped or degraded and processing continues.

use std::fmt;

/// Bucket of the output addressing triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum Bucket {
    Node = 0,
    Way = 1,
    Relation = 2,
}

/// Output address `(bucket, index[, member])` correlating geometry with its
/// attribute row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct GeometryPath {
    pub bucket: Bucket,
    pub index: usize,
    pub member: Option<usize>,
}

impl GeometryPath {
    pub fn new(bucket: Bucket, index: usize) -> Self {
        Self {
            bucket,
            index,
            member: None,
        }
    }

    /// Path of a relation member below this path.
    pub fn with_member(self, member: usize) -> Self {
        Self {
            member: Some(member),
            ..self
        }
    }

    /// Returns `true` if this path addresses the feature `(bucket, index)`,
    /// with or without a member index.
    pub fn belongs_to(&self, bucket: Bucket, index: usize) -> bool {
        self.bucket == bucket && self.index == index
    }
}

impl fmt::Display for GeometryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.member {
            Some(m) => write!(f, "{{{};{};{}}}", self.bucket as u8, self.index, m),
            None => write!(f, "{{{};{}}}", self.bucket as u8, self.index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum DiagnosticKind {
    /// A way references a node missing from the graph.
    UnresolvedReference,
    /// A closed ring has fewer than three distinct vertices.
    EmptyRing,
    /// A ring could not be turned into a planar surface.
    DegenerateRing,
    /// A raster clip window extends outside the raster.
    RasterWindowOutOfBounds,
    /// A raster projection could not be resolved and a fallback was used.
    SrsFallback,
    /// A point could not be converted between reference systems.
    Conversion,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub path: Option<GeometryPath>,
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic and reports it through the `log` facade.
    pub fn new(
        kind: DiagnosticKind,
        path: Option<GeometryPath>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        match path {
            Some(p) => log::warn!("{:?} at {}: {}", kind, p, message),
            None => log::warn!("{:?}: {}", kind, message),
        }
        Self {
            kind,
            path,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_display() {
        let p = GeometryPath::new(Bucket::Relation, 3);
        assert_eq!(p.to_string(), "{2;3}");
        assert_eq!(p.with_member(1).to_string(), "{2;3;1}");
        assert!(p.with_member(1).belongs_to(Bucket::Relation, 3));
    }
}
