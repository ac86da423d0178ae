//! Rebuilds points, curves and planar surfaces from a [`FeatureGraph`].

use crate::diagnostics::{Bucket, Diagnostic, DiagnosticKind, GeometryPath};
use crate::error::ParseError;
use crate::geometry::{Extent, Point3};
use crate::surface::{
    assemble_rings, distinct_vertex_count, normalize_ccw, open_ring, PlanarSurface,
    ReconstructedGeometry,
};
use crate::transform::Transform;

use super::filter::FeatureFilter;
use super::graph::{FeatureGraph, FeatureNode, FeatureRelation, FeatureWay, MemberType, Tags};

/// Name of the first attribute of every feature.
pub const ID_FIELD: &str = "osm id";

/// Geometry with its output address.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedGeometry {
    pub path: GeometryPath,
    pub geometry: ReconstructedGeometry,
}

/// One attribute slot. Untagged features carry a single empty slot after
/// the id.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Field {
    pub name: Option<String>,
    pub value: Option<String>,
}

/// Ordered attributes of one feature.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AttributeRow {
    pub path: GeometryPath,
    pub fields: Vec<Field>,
}

impl AttributeRow {
    fn from_tags(path: GeometryPath, id: i64, tags: &Tags) -> Self {
        let mut fields = vec![Field {
            name: Some(ID_FIELD.to_string()),
            value: Some(id.to_string()),
        }];
        if tags.is_empty() {
            fields.push(Field {
                name: None,
                value: None,
            });
        } else {
            fields.extend(tags.iter().map(|(k, v)| Field {
                name: Some(k.to_string()),
                value: Some(v.to_string()),
            }));
        }
        Self { path, fields }
    }

    /// Returns `true` if any slot carries exactly this name and value.
    pub fn has_pair(&self, name: &str, value: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.name.as_deref() == Some(name) && f.value.as_deref() == Some(value))
    }
}

/// Output of [`reconstruct`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconstructionResult {
    pub geometries: Vec<PlacedGeometry>,
    pub attributes: Vec<AttributeRow>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ReconstructionResult {
    pub fn geometry_at(&self, path: GeometryPath) -> Option<&ReconstructedGeometry> {
        self.geometries
            .iter()
            .find(|g| g.path == path)
            .map(|g| &g.geometry)
    }

    pub fn attributes_for(&self, bucket: Bucket, index: usize) -> Option<&AttributeRow> {
        self.attributes
            .iter()
            .find(|a| a.path.belongs_to(bucket, index))
    }

    /// Keeps only the features whose attributes contain the `key=value`
    /// pair given in `tag`. Diagnostics are kept unchanged.
    pub fn filter_by_tag(&self, tag: &str) -> Result<ReconstructionResult, ParseError> {
        let (key, value) = FeatureFilter::parse_tag(tag)?;
        let attributes: Vec<AttributeRow> = self
            .attributes
            .iter()
            .filter(|a| a.has_pair(&key, &value))
            .cloned()
            .collect();
        let geometries = self
            .geometries
            .iter()
            .filter(|g| {
                attributes
                    .iter()
                    .any(|a| g.path.belongs_to(a.path.bucket, a.path.index))
            })
            .cloned()
            .collect();
        Ok(ReconstructionResult {
            geometries,
            attributes,
            diagnostics: self.diagnostics.clone(),
        })
    }
}

fn node_position(transform: &Transform, node: &FeatureNode) -> Point3 {
    transform.apply(Point3::new(node.longitude, node.latitude, 0.0))
}

/// Reconstructs every admitted feature of `graph`, mapping geodetic
/// coordinates through `transform`.
///
/// Nodes are visited first, then ways, then relations, each in insertion
/// order. A way with a missing node is skipped with a diagnostic but still
/// consumes its index.
pub fn reconstruct(
    graph: &FeatureGraph,
    transform: &Transform,
    filter: &FeatureFilter,
) -> ReconstructionResult {
    let mut result = ReconstructionResult::default();

    for (index, node) in graph.nodes().iter().filter(|n| filter.admits_node(n)).enumerate() {
        let path = GeometryPath::new(Bucket::Node, index);
        result.geometries.push(PlacedGeometry {
            path,
            geometry: ReconstructedGeometry::Point(node_position(transform, node)),
        });
        result
            .attributes
            .push(AttributeRow::from_tags(path, node.id, &node.tags));
    }

    for (index, way) in graph
        .ways()
        .iter()
        .filter(|w| filter.admits_way(w, graph))
        .enumerate()
    {
        let path = GeometryPath::new(Bucket::Way, index);
        let Some(vertices) = way_vertices(graph, way, transform, path, &mut result.diagnostics)
        else {
            continue;
        };
        let geometry = if way.is_closed() {
            closed_way_geometry(vertices, path, &mut result.diagnostics)
        } else {
            ReconstructedGeometry::OpenCurve(vertices)
        };
        result.geometries.push(PlacedGeometry { path, geometry });
        result
            .attributes
            .push(AttributeRow::from_tags(path, way.id, &way.tags));
    }

    for (index, relation) in graph
        .relations()
        .iter()
        .filter(|r| filter.admits_relation(r, graph))
        .enumerate()
    {
        let path = GeometryPath::new(Bucket::Relation, index);
        reconstruct_relation(graph, transform, relation, path, &mut result);
        result
            .attributes
            .push(AttributeRow::from_tags(path, relation.id, &relation.tags));
    }

    log::info!(
        "reconstructed {} geometries from {} nodes, {} ways, {} relations ({} diagnostics)",
        result.geometries.len(),
        graph.nodes().len(),
        graph.ways().len(),
        graph.relations().len(),
        result.diagnostics.len()
    );
    result
}

fn way_vertices(
    graph: &FeatureGraph,
    way: &FeatureWay,
    transform: &Transform,
    path: GeometryPath,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Vec<Point3>> {
    match graph.resolve_way(way) {
        Ok(nodes) => Some(nodes.into_iter().map(|n| node_position(transform, n)).collect()),
        Err(missing) => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnresolvedReference,
                Some(path),
                format!("way {} references missing node {}", way.id, missing),
            ));
            None
        }
    }
}

fn closed_way_geometry(
    vertices: Vec<Point3>,
    path: GeometryPath,
    diagnostics: &mut Vec<Diagnostic>,
) -> ReconstructedGeometry {
    let mut ring = open_ring(&vertices);
    if distinct_vertex_count(&ring) < 3 {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::EmptyRing,
            Some(path),
            "closed way has fewer than three distinct vertices",
        ));
        return ReconstructedGeometry::OpenCurve(vertices);
    }
    normalize_ccw(&mut ring);
    match PlanarSurface::new(ring.clone(), Vec::new()) {
        Ok(surface) => ReconstructedGeometry::PlanarSurfaceWithHoles(surface),
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::DegenerateRing,
                Some(path),
                e.to_string(),
            ));
            ReconstructedGeometry::ClosedCurve(ring)
        }
    }
}

enum MemberCurve {
    Ring(Vec<Point3>),
    Open(Vec<Point3>),
}

fn reconstruct_relation(
    graph: &FeatureGraph,
    transform: &Transform,
    relation: &FeatureRelation,
    path: GeometryPath,
    result: &mut ReconstructionResult,
) {
    let mut curves: Vec<(usize, MemberCurve)> = Vec::new();
    for (m, member) in relation.members.iter().enumerate() {
        let member_path = path.with_member(m);
        match member.member_type {
            MemberType::Node => match graph.node(member.id) {
                Some(node) => result.geometries.push(PlacedGeometry {
                    path: member_path,
                    geometry: ReconstructedGeometry::Point(node_position(transform, node)),
                }),
                None => log::debug!(
                    "relation {} skips missing node member {}",
                    relation.id,
                    member.id
                ),
            },
            MemberType::Way => {
                let Some(way) = graph.way(member.id) else {
                    log::debug!(
                        "relation {} skips missing way member {}",
                        relation.id,
                        member.id
                    );
                    continue;
                };
                let Some(vertices) =
                    way_vertices(graph, way, transform, member_path, &mut result.diagnostics)
                else {
                    continue;
                };
                if !way.is_closed() {
                    curves.push((m, MemberCurve::Open(vertices)));
                    continue;
                }
                let mut ring = open_ring(&vertices);
                if distinct_vertex_count(&ring) < 3 {
                    result.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::EmptyRing,
                        Some(member_path),
                        format!("member way {} has fewer than three distinct vertices", way.id),
                    ));
                    curves.push((m, MemberCurve::Open(vertices)));
                    continue;
                }
                normalize_ccw(&mut ring);
                curves.push((m, MemberCurve::Ring(ring)));
            }
            MemberType::Relation => log::debug!(
                "relation {} does not expand nested relation {}",
                relation.id,
                member.id
            ),
        }
    }

    if curves.is_empty() {
        return;
    }
    if curves.iter().all(|(_, c)| matches!(c, MemberCurve::Ring(_))) {
        let rings: Vec<Vec<Point3>> = curves
            .iter()
            .filter_map(|(_, c)| match c {
                MemberCurve::Ring(r) => Some(r.clone()),
                MemberCurve::Open(_) => None,
            })
            .collect();
        match assemble_rings(rings) {
            Ok(geometry) => {
                result.geometries.push(PlacedGeometry { path, geometry });
                return;
            }
            Err(e) => result.diagnostics.push(Diagnostic::new(
                DiagnosticKind::DegenerateRing,
                Some(path),
                e.to_string(),
            )),
        }
    }
    for (m, curve) in curves {
        let geometry = match curve {
            MemberCurve::Ring(r) => ReconstructedGeometry::ClosedCurve(r),
            MemberCurve::Open(v) => ReconstructedGeometry::OpenCurve(v),
        };
        result.geometries.push(PlacedGeometry {
            path: path.with_member(m),
            geometry,
        });
    }
}

/// Maps a geodetic extent (x = longitude, y = latitude) into model space.
pub fn bounds_to_model(bounds: &Extent, transform: &Transform) -> Option<Extent> {
    let corners = [
        (bounds.min.x, bounds.min.y),
        (bounds.max.x, bounds.min.y),
        (bounds.max.x, bounds.max.y),
        (bounds.min.x, bounds.max.y),
    ];
    Extent::from_points(
        corners
            .iter()
            .map(|&(x, y)| transform.apply(Point3::new(x, y, 0.0)).xy()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::osm::graph::Member;

    fn grid_graph() -> FeatureGraph {
        let mut g = FeatureGraph::new();
        for (id, x, y) in [(1, 0.0, 0.0), (2, 1.0, 0.0), (3, 1.0, 1.0), (4, 0.0, 1.0)] {
            g.add_node(FeatureNode::new(id, x, y));
        }
        g
    }

    fn highway(value: &str) -> Tags {
        [("highway", value)].into_iter().collect()
    }

    #[test]
    fn open_way_becomes_open_curve() {
        let mut g = grid_graph();
        g.add_way(FeatureWay::new(10, vec![1, 2, 3]).with_tags(highway("path")));
        let r = reconstruct(&g, &Transform::identity(), &FeatureFilter::new().with_key("highway"));
        assert_eq!(r.geometries.len(), 1);
        let path = GeometryPath::new(Bucket::Way, 0);
        assert!(matches!(
            r.geometry_at(path),
            Some(ReconstructedGeometry::OpenCurve(v)) if v.len() == 3
        ));
        let row = r.attributes_for(Bucket::Way, 0).unwrap();
        assert!(row.has_pair("osm id", "10"));
        assert!(row.has_pair("highway", "path"));
    }

    #[test]
    fn untagged_feature_has_empty_slot() {
        let g = grid_graph();
        let r = reconstruct(&g, &Transform::identity(), &FeatureFilter::new());
        let row = r.attributes_for(Bucket::Node, 0).unwrap();
        assert_eq!(row.fields.len(), 2);
        assert_eq!(row.fields[1], Field { name: None, value: None });
    }

    #[test]
    fn relation_tolerates_missing_members() {
        let mut g = grid_graph();
        g.add_relation(FeatureRelation::new(
            50,
            vec![
                Member::new(MemberType::Node, 99, ""),
                Member::new(MemberType::Node, 2, "label"),
                Member::new(MemberType::Relation, 51, "subarea"),
            ],
        ));
        let r = reconstruct(&g, &Transform::identity(), &FeatureFilter::new());
        let member = GeometryPath::new(Bucket::Relation, 0).with_member(1);
        assert!(matches!(r.geometry_at(member), Some(ReconstructedGeometry::Point(_))));
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn relation_with_open_member_falls_back_to_curves() {
        let mut g = grid_graph();
        g.add_way(FeatureWay::new(20, vec![1, 2, 3, 1]));
        g.add_way(FeatureWay::new(21, vec![3, 4]));
        g.add_relation(FeatureRelation::new(
            60,
            vec![Member::new(MemberType::Way, 20, "outer"), Member::new(MemberType::Way, 21, "")],
        ));
        let r = reconstruct(&g, &Transform::identity(), &FeatureFilter::new().with_key("none"));
        assert!(r.geometries.is_empty());
        let r = reconstruct(&g, &Transform::identity(), &FeatureFilter::new());
        let base = GeometryPath::new(Bucket::Relation, 0);
        assert!(r.geometry_at(base).is_none());
        assert!(matches!(
            r.geometry_at(base.with_member(0)),
            Some(ReconstructedGeometry::ClosedCurve(v)) if v.len() == 3
        ));
        assert!(matches!(
            r.geometry_at(base.with_member(1)),
            Some(ReconstructedGeometry::OpenCurve(_))
        ));
    }

    #[test]
    fn filter_by_tag_keeps_matching_features() {
        let mut g = grid_graph();
        g.add_way(FeatureWay::new(10, vec![1, 2]).with_tags(highway("path")));
        g.add_way(FeatureWay::new(11, vec![2, 3]).with_tags(highway("primary")));
        let r = reconstruct(&g, &Transform::identity(), &FeatureFilter::new().with_key("highway"));
        let filtered = r.filter_by_tag("highway=primary").unwrap();
        assert_eq!(filtered.geometries.len(), 1);
        assert_eq!(filtered.geometries[0].path, GeometryPath::new(Bucket::Way, 1));
        assert!(r.filter_by_tag("highway").is_err());
    }

    #[test]
    fn bounds_map_through_transform() {
        let b = Extent::new(Point::new(0.0, 0.0), Point::new(1.0, 2.0));
        let t = Transform::scale(10.0, 10.0, 1.0);
        let m = bounds_to_model(&b, &t).unwrap();
        assert_eq!(m.max, Point::new(10.0, 20.0));
    }
}
