//! Error types shared by the transform engine, the feature reconstructor and
//! the raster sampler.

use thiserror::Error;

/// Failures that prevent a transform, conversion or structural lookup from
/// producing a usable result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// The anchor plane could not be formed.
    #[error("degenerate anchor: {0}")]
    DegenerateAnchor(String),
    /// A spatial reference identifier could not be resolved.
    #[error("unresolved spatial reference `{identifier}`: {reason}")]
    UnresolvedSrs { identifier: String, reason: String },
    /// The transform matrix is singular.
    #[error("transform is not invertible")]
    NonInvertible,
    /// A feature references an id missing from the graph.
    #[error("{kind} {id} referenced by {referenced_by} is missing")]
    UnresolvedReference {
        kind: String,
        id: i64,
        referenced_by: String,
    },
    /// A ring could not be turned into a planar surface.
    #[error("degenerate ring: {0}")]
    DegenerateRing(String),
    /// The clip window extends outside the raster.
    #[error("clip window extends outside the raster bounds")]
    RasterWindowOutOfBounds,
    /// Raster dimensions and sample data disagree.
    #[error("invalid raster: {0}")]
    InvalidRaster(String),
    /// A point could not be converted between reference systems.
    #[error("coordinate conversion failed: {0}")]
    Conversion(String),
}

/// Failures when parsing coordinate text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid coordinate format: `{0}`")]
    InvalidFormat(String),
}
