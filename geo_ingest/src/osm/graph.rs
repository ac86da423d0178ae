//! Flat store of tagged nodes, ways and relations addressable by id.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Ordered tag list. Lookups return the last value written for a key while
/// iteration yields every entry in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    entries: Vec<(String, String)>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Effective value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for (k, v) in iter {
            tags.insert(k, v);
        }
        tags
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemberType::Node => "node",
            MemberType::Way => "way",
            MemberType::Relation => "relation",
        };
        f.write_str(s)
    }
}

impl FromStr for MemberType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(MemberType::Node),
            "way" => Ok(MemberType::Way),
            "relation" => Ok(MemberType::Relation),
            other => Err(format!("unknown member type `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureNode {
    pub id: i64,
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: f64,
    pub tags: Tags,
}

impl FeatureNode {
    pub fn new(id: i64, longitude: f64, latitude: f64) -> Self {
        Self {
            id,
            longitude,
            latitude,
            elevation: 0.0,
            tags: Tags::new(),
        }
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWay {
    pub id: i64,
    pub node_ids: Vec<i64>,
    pub tags: Tags,
}

impl FeatureWay {
    pub fn new(id: i64, node_ids: Vec<i64>) -> Self {
        Self {
            id,
            node_ids,
            tags: Tags::new(),
        }
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// A way is closed when it starts and ends on the same node and has more
    /// than two references.
    pub fn is_closed(&self) -> bool {
        self.node_ids.len() > 2 && self.node_ids.first() == self.node_ids.last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub member_type: MemberType,
    pub id: i64,
    pub role: String,
}

impl Member {
    pub fn new(member_type: MemberType, id: i64, role: impl Into<String>) -> Self {
        Self {
            member_type,
            id,
            role: role.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRelation {
    pub id: i64,
    pub members: Vec<Member>,
    pub tags: Tags,
}

impl FeatureRelation {
    pub fn new(id: i64, members: Vec<Member>) -> Self {
        Self {
            id,
            members,
            tags: Tags::new(),
        }
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

/// Arena of features with id lookup per kind.
///
/// Re-adding an id replaces the stored feature but keeps its original
/// position in iteration order.
#[derive(Debug, Clone, Default)]
pub struct FeatureGraph {
    nodes: Vec<FeatureNode>,
    ways: Vec<FeatureWay>,
    relations: Vec<FeatureRelation>,
    node_index: HashMap<i64, usize>,
    way_index: HashMap<i64, usize>,
    relation_index: HashMap<i64, usize>,
}

fn upsert<T>(items: &mut Vec<T>, index: &mut HashMap<i64, usize>, id: i64, item: T) {
    match index.get(&id) {
        Some(&i) => items[i] = item,
        None => {
            index.insert(id, items.len());
            items.push(item);
        }
    }
}

impl FeatureGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: FeatureNode) {
        upsert(&mut self.nodes, &mut self.node_index, node.id, node);
    }

    pub fn add_way(&mut self, way: FeatureWay) {
        upsert(&mut self.ways, &mut self.way_index, way.id, way);
    }

    pub fn add_relation(&mut self, relation: FeatureRelation) {
        upsert(&mut self.relations, &mut self.relation_index, relation.id, relation);
    }

    pub fn node(&self, id: i64) -> Option<&FeatureNode> {
        self.node_index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn way(&self, id: i64) -> Option<&FeatureWay> {
        self.way_index.get(&id).map(|&i| &self.ways[i])
    }

    pub fn relation(&self, id: i64) -> Option<&FeatureRelation> {
        self.relation_index.get(&id).map(|&i| &self.relations[i])
    }

    /// Returns `true` if a feature of the given kind and id is stored.
    pub fn contains(&self, member_type: MemberType, id: i64) -> bool {
        match member_type {
            MemberType::Node => self.node_index.contains_key(&id),
            MemberType::Way => self.way_index.contains_key(&id),
            MemberType::Relation => self.relation_index.contains_key(&id),
        }
    }

    pub fn nodes(&self) -> &[FeatureNode] {
        &self.nodes
    }

    pub fn ways(&self) -> &[FeatureWay] {
        &self.ways
    }

    pub fn relations(&self) -> &[FeatureRelation] {
        &self.relations
    }

    /// Resolves the node references of `way` in order, returning the first
    /// missing id on failure.
    pub fn resolve_way(&self, way: &FeatureWay) -> Result<Vec<&FeatureNode>, i64> {
        way.node_ids
            .iter()
            .map(|&id| self.node(id).ok_or(id))
            .collect()
    }
}
