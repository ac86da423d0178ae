//! Conversion of OGR-style nested geometry collections into reconstructed
//! geometry.

use geo_types::{Coord, Geometry, LineString, Polygon};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::geometry::Point3;
use crate::osm::Field;
use crate::surface::{
    distinct_vertex_count, normalize_ccw, open_ring, PlanarSurface, ReconstructedGeometry,
};
use crate::transform::Transform;

/// A geometry with its attributes, as read from a vector source.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFeature {
    pub geometry: Geometry<f64>,
    pub properties: Vec<(String, String)>,
}

/// One converted part of a feature.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorItem {
    pub feature: usize,
    pub part: usize,
    pub geometry: ReconstructedGeometry,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorImport {
    pub items: Vec<VectorItem>,
    /// Field list per input feature, in input order.
    pub fields: Vec<Vec<Field>>,
    pub diagnostics: Vec<Diagnostic>,
}

fn point(c: Coord<f64>, transform: &Transform) -> Point3 {
    transform.apply(Point3::new(c.x, c.y, 0.0))
}

fn line_points(line: &LineString<f64>, transform: &Transform) -> Vec<Point3> {
    line.coords().map(|&c| point(c, transform)).collect()
}

fn convert_line(line: &LineString<f64>, transform: &Transform) -> ReconstructedGeometry {
    let vertices = line_points(line, transform);
    if line.is_closed() && vertices.len() > 3 {
        ReconstructedGeometry::ClosedCurve(open_ring(&vertices))
    } else {
        ReconstructedGeometry::OpenCurve(vertices)
    }
}

fn convert_polygon(
    polygon: &Polygon<f64>,
    transform: &Transform,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ReconstructedGeometry> {
    let mut outer = open_ring(&line_points(polygon.exterior(), transform));
    if distinct_vertex_count(&outer) < 3 {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::EmptyRing,
            None,
            "polygon exterior has fewer than three distinct vertices",
        ));
        return Vec::new();
    }
    normalize_ccw(&mut outer);
    let holes: Vec<Vec<Point3>> = polygon
        .interiors()
        .iter()
        .map(|r| open_ring(&line_points(r, transform)))
        .filter(|r| distinct_vertex_count(r) >= 3)
        .collect();
    match PlanarSurface::new(outer.clone(), holes.clone()) {
        Ok(s) => vec![ReconstructedGeometry::PlanarSurfaceWithHoles(s)],
        Err(e) => {
            diagnostics.push(Diagnostic::new(DiagnosticKind::DegenerateRing, None, e.to_string()));
            std::iter::once(outer)
                .chain(holes)
                .map(ReconstructedGeometry::ClosedCurve)
                .collect()
        }
    }
}

/// Converts a geometry and any nested collections into a flat list of
/// parts. Open rings of polygons are closed implicitly.
pub fn convert_geometry(
    geometry: &Geometry<f64>,
    transform: &Transform,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ReconstructedGeometry> {
    match geometry {
        Geometry::Point(p) => vec![ReconstructedGeometry::Point(point(p.0, transform))],
        Geometry::MultiPoint(mp) => mp
            .iter()
            .map(|p| ReconstructedGeometry::Point(point(p.0, transform)))
            .collect(),
        Geometry::Line(l) => vec![ReconstructedGeometry::OpenCurve(vec![
            point(l.start, transform),
            point(l.end, transform),
        ])],
        Geometry::LineString(ls) => vec![convert_line(ls, transform)],
        Geometry::MultiLineString(mls) => {
            mls.iter().map(|ls| convert_line(ls, transform)).collect()
        }
        Geometry::Polygon(p) => convert_polygon(p, transform, diagnostics),
        Geometry::MultiPolygon(mp) => mp
            .iter()
            .flat_map(|p| convert_polygon(p, transform, diagnostics))
            .collect(),
        Geometry::Rect(r) => convert_polygon(&r.to_polygon(), transform, diagnostics),
        Geometry::Triangle(t) => convert_polygon(&t.to_polygon(), transform, diagnostics),
        Geometry::GeometryCollection(gc) => gc
            .iter()
            .flat_map(|g| convert_geometry(g, transform, diagnostics))
            .collect(),
    }
}

/// Converts attributed features, keeping one field list per feature.
pub fn import_features(features: &[VectorFeature], transform: &Transform) -> VectorImport {
    let mut import = VectorImport::default();
    for (feature, f) in features.iter().enumerate() {
        let parts = convert_geometry(&f.geometry, transform, &mut import.diagnostics);
        import
            .items
            .extend(parts.into_iter().enumerate().map(|(part, geometry)| VectorItem {
                feature,
                part,
                geometry,
            }));
        import.fields.push(
            f.properties
                .iter()
                .map(|(k, v)| Field {
                    name: Some(k.clone()),
                    value: Some(v.clone()),
                })
                .collect(),
        );
    }
    import
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point, polygon, GeometryCollection};

    #[test]
    fn nested_collection_is_flattened() {
        let inner = GeometryCollection::new_from(vec![
            Geometry::Point(point!(x: 1.0, y: 2.0)),
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]),
        ]);
        let outer = Geometry::GeometryCollection(GeometryCollection::new_from(vec![
            Geometry::GeometryCollection(inner),
            Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 2.0, y: 0.0),
                (x: 2.0, y: 2.0),
                (x: 0.0, y: 2.0),
            ]),
        ]));
        let mut diags = Vec::new();
        let parts = convert_geometry(&outer, &Transform::identity(), &mut diags);
        assert_eq!(parts.len(), 3);
        assert!(matches!(parts[0], ReconstructedGeometry::Point(_)));
        assert!(matches!(parts[1], ReconstructedGeometry::OpenCurve(_)));
        match &parts[2] {
            ReconstructedGeometry::PlanarSurfaceWithHoles(s) => assert_eq!(s.outer.len(), 4),
            other => panic!("unexpected {:?}", other),
        }
        assert!(diags.is_empty());
    }

    #[test]
    fn degenerate_polygon_is_reported() {
        let flat =
            Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0)]);
        let mut diags = Vec::new();
        let parts = convert_geometry(&flat, &Transform::identity(), &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(matches!(parts[0], ReconstructedGeometry::ClosedCurve(_)));
    }

    #[test]
    fn features_keep_fields() {
        let features = vec![VectorFeature {
            geometry: Geometry::Point(point!(x: 0.0, y: 0.0)),
            properties: vec![("name".into(), "well".into())],
        }];
        let import = import_features(&features, &Transform::identity());
        assert_eq!(import.items.len(), 1);
        assert_eq!(import.fields[0][0].value.as_deref(), Some("well"));
    }
}
