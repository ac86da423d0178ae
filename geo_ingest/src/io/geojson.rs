//! GeoJSON export of reconstruction results and import of attributed
//! vector features.

use std::io;

use ::geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};

use crate::geometry::Point3;
use crate::osm::ReconstructionResult;
use crate::surface::ReconstructedGeometry;
use crate::vector::VectorFeature;

use super::{invalid_data, write_string};

fn position(p: &Point3) -> Vec<f64> {
    vec![p.x, p.y, p.z]
}

fn closed_positions(ring: &[Point3]) -> Vec<Vec<f64>> {
    let mut coords: Vec<Vec<f64>> = ring.iter().map(position).collect();
    if let Some(first) = coords.first().cloned() {
        coords.push(first);
    }
    coords
}

fn geometry_value(geometry: &ReconstructedGeometry) -> Value {
    match geometry {
        ReconstructedGeometry::Point(p) => Value::Point(position(p)),
        ReconstructedGeometry::OpenCurve(v) => Value::LineString(v.iter().map(position).collect()),
        ReconstructedGeometry::ClosedCurve(v) => Value::LineString(closed_positions(v)),
        ReconstructedGeometry::PlanarSurfaceWithHoles(s) => {
            let mut rings = vec![closed_positions(&s.outer)];
            // Holes are written clockwise.
            rings.extend(s.holes.iter().map(|h| {
                let mut ring = closed_positions(h);
                ring.reverse();
                ring
            }));
            Value::Polygon(rings)
        }
        ReconstructedGeometry::MultiPart(parts) => Value::GeometryCollection(
            parts
                .iter()
                .map(|p| Geometry::new(geometry_value(p)))
                .collect(),
        ),
    }
}

/// Builds a feature collection with one feature per placed geometry. Each
/// feature carries its address as `path` and the fields of its attribute
/// row as properties.
pub fn result_to_geojson(result: &ReconstructionResult) -> FeatureCollection {
    let features = result
        .geometries
        .iter()
        .map(|placed| {
            let mut properties = JsonObject::new();
            properties.insert("path".into(), JsonValue::from(placed.path.to_string()));
            properties.insert(
                "kind".into(),
                JsonValue::from(placed.geometry.kind_name()),
            );
            if let Some(row) = result.attributes_for(placed.path.bucket, placed.path.index) {
                for field in &row.fields {
                    if let Some(name) = &field.name {
                        properties.insert(
                            name.clone(),
                            field.value.clone().map_or(JsonValue::Null, JsonValue::from),
                        );
                    }
                }
            }
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geometry_value(&placed.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Writes [`result_to_geojson`] to `path`.
pub fn write_result_geojson(path: &str, result: &ReconstructionResult) -> io::Result<()> {
    let json = GeoJson::FeatureCollection(result_to_geojson(result)).to_string();
    write_string(path, &json)
}

fn property_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_vector_feature(
    geometry: Geometry,
    properties: Option<&JsonObject>,
) -> io::Result<VectorFeature> {
    let geometry = geo_types::Geometry::<f64>::try_from(geometry).map_err(invalid_data)?;
    let properties = properties
        .map(|p| p.iter().map(|(k, v)| (k.clone(), property_text(v))).collect())
        .unwrap_or_default();
    Ok(VectorFeature {
        geometry,
        properties,
    })
}

/// Parses GeoJSON text into attributed features. Features without a
/// geometry are skipped.
pub fn read_geojson_features(text: &str) -> io::Result<Vec<VectorFeature>> {
    let geojson: GeoJson = text.parse().map_err(invalid_data)?;
    match geojson {
        GeoJson::Geometry(g) => Ok(vec![to_vector_feature(g, None)?]),
        GeoJson::Feature(f) => match f.geometry {
            Some(g) => Ok(vec![to_vector_feature(g, f.properties.as_ref())?]),
            None => Ok(Vec::new()),
        },
        GeoJson::FeatureCollection(fc) => fc
            .features
            .into_iter()
            .filter_map(|f| {
                let properties = f.properties;
                f.geometry.map(|g| to_vector_feature(g, properties.as_ref()))
            })
            .collect(),
    }
}
