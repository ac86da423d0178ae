//! Tag and spatial selection of features before reconstruction.

use crate::error::ParseError;
use crate::geometry::{Extent, Point};

use super::graph::{FeatureGraph, FeatureNode, FeatureRelation, FeatureWay, MemberType, Tags};

/// Selects which features are reconstructed.
///
/// A feature passes the tag test when it carries any of `keys` and matches
/// any of `tags`; an empty list does not restrict. Untagged features are
/// rejected once either list is non-empty. `clip` is a geodetic window
/// (x = longitude, y = latitude) applied after the tag test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFilter {
    pub keys: Vec<String>,
    pub tags: Vec<(String, String)>,
    pub clip: Option<Extent>,
}

impl FeatureFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn with_clip(mut self, clip: Extent) -> Self {
        self.clip = Some(clip);
        self
    }

    /// Parses a `key=value` pair.
    pub fn parse_tag(text: &str) -> Result<(String, String), ParseError> {
        match text.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => {
                Ok((k.trim().to_string(), v.trim().to_string()))
            }
            _ => Err(ParseError::InvalidFormat(text.to_string())),
        }
    }

    /// Returns `true` if any tag restriction is set.
    pub fn is_active(&self) -> bool {
        !self.keys.is_empty() || !self.tags.is_empty()
    }

    pub fn admits_tags(&self, tags: &Tags) -> bool {
        if !self.is_active() {
            return true;
        }
        if tags.is_empty() {
            return false;
        }
        let key_ok = self.keys.is_empty() || self.keys.iter().any(|k| tags.contains_key(k));
        let tag_ok = self.tags.is_empty()
            || self
                .tags
                .iter()
                .any(|(k, v)| tags.get(k) == Some(v.as_str()));
        key_ok && tag_ok
    }

    fn node_inside(&self, node: &FeatureNode) -> bool {
        match &self.clip {
            Some(clip) => clip.contains(Point::new(node.longitude, node.latitude)),
            None => true,
        }
    }

    fn way_inside(&self, way: &FeatureWay, graph: &FeatureGraph) -> bool {
        way.node_ids
            .iter()
            .filter_map(|&id| graph.node(id))
            .any(|n| self.node_inside(n))
    }

    pub fn admits_node(&self, node: &FeatureNode) -> bool {
        self.admits_tags(&node.tags) && self.node_inside(node)
    }

    /// A way is inside the clip when any of its resolvable nodes is.
    pub fn admits_way(&self, way: &FeatureWay, graph: &FeatureGraph) -> bool {
        self.admits_tags(&way.tags) && (self.clip.is_none() || self.way_inside(way, graph))
    }

    /// A relation is inside the clip when any directly referenced node, or
    /// any node of a referenced way, is.
    pub fn admits_relation(&self, relation: &FeatureRelation, graph: &FeatureGraph) -> bool {
        if !self.admits_tags(&relation.tags) {
            return false;
        }
        if self.clip.is_none() {
            return true;
        }
        relation.members.iter().any(|m| match m.member_type {
            MemberType::Node => graph.node(m.id).map_or(false, |n| self.node_inside(n)),
            MemberType::Way => graph.way(m.id).map_or(false, |w| self.way_inside(w, graph)),
            MemberType::Relation => false,
        })
    }
}
