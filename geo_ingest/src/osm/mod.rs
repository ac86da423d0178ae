//! OpenStreetMap feature graph and its reconstruction into geometry.

pub mod filter;
pub mod graph;
pub mod reconstruct;

pub use filter::FeatureFilter;
pub use graph::{FeatureGraph, FeatureNode, FeatureRelation, FeatureWay, Member, MemberType, Tags};
pub use reconstruct::{
    bounds_to_model, reconstruct, AttributeRow, Field, PlacedGeometry, ReconstructionResult,
};
