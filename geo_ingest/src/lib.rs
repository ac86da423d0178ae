//! Core library for georeferencing models and importing geodata into them.
//!
//! Three components build on one another only through [`Transform`]:
//! the anchor transform engine ([`anchor`], [`crs`], [`dms`]), the feature
//! graph reconstructor ([`osm`]) and the raster grid sampler ([`raster`]).

pub mod anchor;
pub mod config;
pub mod crs;
pub mod diagnostics;
pub mod dms;
pub mod error;
pub mod geometry;
pub mod io;
pub mod osm;
pub mod raster;
pub mod surface;
pub mod transform;
pub mod vector;

pub use anchor::{build_anchor_transform, Anchor, AnchorPlane};
pub use crs::{ProjResolver, SpatialReference, SrsResolver};
pub use diagnostics::{Bucket, Diagnostic, DiagnosticKind, GeometryPath};
pub use error::{GeoError, ParseError};
pub use raster::{clip_and_mesh, ClipWindow, RasterGrid, TerrainMesh};
pub use surface::{PlanarSurface, ReconstructedGeometry};
pub use transform::{invert, Transform};
