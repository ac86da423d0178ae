//! Reader for OpenStreetMap XML extracts.

use std::io;
use std::str::FromStr;

use roxmltree::{Document, Node};

use crate::geometry::{Extent, Point};
use crate::osm::{FeatureGraph, FeatureNode, FeatureRelation, FeatureWay, Member, MemberType, Tags};

use super::{invalid_data, read_to_string};

/// Parsed extract: the feature graph and the optional `<bounds>` element
/// (x = longitude, y = latitude).
#[derive(Debug, Clone, Default)]
pub struct OsmExtract {
    pub graph: FeatureGraph,
    pub bounds: Option<Extent>,
}

fn attr<T: FromStr>(node: &Node, name: &str) -> io::Result<T> {
    let raw = node.attribute(name).ok_or_else(|| {
        invalid_data(format!(
            "<{}> at byte {} lacks `{}`",
            node.tag_name().name(),
            node.range().start,
            name
        ))
    })?;
    raw.parse().map_err(|_| {
        invalid_data(format!(
            "<{}> has invalid `{}` value `{}`",
            node.tag_name().name(),
            name,
            raw
        ))
    })
}

fn read_tags(element: &Node) -> Tags {
    element
        .children()
        .filter(|c| c.has_tag_name("tag"))
        .filter_map(|t| Some((t.attribute("k")?, t.attribute("v").unwrap_or(""))))
        .collect()
}

fn read_bounds(element: &Node) -> io::Result<Extent> {
    Ok(Extent::new(
        Point::new(attr(element, "minlon")?, attr(element, "minlat")?),
        Point::new(attr(element, "maxlon")?, attr(element, "maxlat")?),
    ))
}

/// Parses an OSM XML document. Nodes without coordinates (deleted
/// entities in change files) are skipped.
pub fn parse_osm_xml(xml: &str) -> io::Result<OsmExtract> {
    let doc = Document::parse(xml).map_err(invalid_data)?;
    let root = doc.root_element();
    if !root.has_tag_name("osm") {
        return Err(invalid_data(format!(
            "expected <osm> root, found <{}>",
            root.tag_name().name()
        )));
    }
    let mut extract = OsmExtract::default();
    for element in root.children().filter(|c| c.is_element()) {
        match element.tag_name().name() {
            "bounds" => extract.bounds = Some(read_bounds(&element)?),
            "node" => {
                let id: i64 = attr(&element, "id")?;
                if element.attribute("lat").is_none() || element.attribute("lon").is_none() {
                    log::warn!("node {} has no coordinates, skipped", id);
                    continue;
                }
                let tags = read_tags(&element);
                let mut node = FeatureNode::new(id, attr(&element, "lon")?, attr(&element, "lat")?);
                if let Some(ele) = tags.get("ele").and_then(|v| v.trim().parse().ok()) {
                    node.elevation = ele;
                }
                extract.graph.add_node(node.with_tags(tags));
            }
            "way" => {
                let id: i64 = attr(&element, "id")?;
                let refs = element
                    .children()
                    .filter(|c| c.has_tag_name("nd"))
                    .map(|nd| attr::<i64>(&nd, "ref"))
                    .collect::<io::Result<Vec<_>>>()?;
                let tags = read_tags(&element);
                extract.graph.add_way(FeatureWay::new(id, refs).with_tags(tags));
            }
            "relation" => {
                let id: i64 = attr(&element, "id")?;
                let mut members = Vec::new();
                for m in element.children().filter(|c| c.has_tag_name("member")) {
                    let kind: String = attr(&m, "type")?;
                    let member_type = MemberType::from_str(&kind).map_err(invalid_data)?;
                    members.push(Member::new(
                        member_type,
                        attr(&m, "ref")?,
                        m.attribute("role").unwrap_or(""),
                    ));
                }
                let tags = read_tags(&element);
                extract
                    .graph
                    .add_relation(FeatureRelation::new(id, members).with_tags(tags));
            }
            _ => {}
        }
    }
    log::info!(
        "parsed OSM extract with {} nodes, {} ways, {} relations",
        extract.graph.nodes().len(),
        extract.graph.ways().len(),
        extract.graph.relations().len()
    );
    Ok(extract)
}

/// Reads an OSM XML file.
pub fn read_osm_xml(path: &str) -> io::Result<OsmExtract> {
    let xml = read_to_string(path)?;
    parse_osm_xml(&xml)
}
