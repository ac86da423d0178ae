#![allow(dead_code)]

use geo_ingest::crs::{SpatialReference, SrsResolver};
use geo_ingest::geometry::Point3;
use geo_ingest::GeoError;

/// Meters per degree of the plate carrée test projection.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Offline resolver knowing WGS84, a plate carrée projection in meters
/// (`TEST`) and in international feet (`TESTFT`), and a geographic alias
/// (`GEO`).
pub struct PlateCarree;

impl SrsResolver for PlateCarree {
    fn resolve(&self, identifier: &str) -> Result<SpatialReference, GeoError> {
        match identifier {
            "WGS84" | "EPSG:4326" => Ok(SpatialReference::wgs84()),
            "TEST" => Ok(SpatialReference::projected("TEST", "test", "metre", None)),
            "TESTFT" => Ok(SpatialReference::projected("TESTFT", "test", "foot", None)),
            "GEO" => Ok(SpatialReference::geographic("GEO", "geo")),
            other => Err(GeoError::UnresolvedSrs {
                identifier: other.to_string(),
                reason: "unknown to the test resolver".into(),
            }),
        }
    }

    fn from_wgs84(&self, target: &SpatialReference, p: Point3) -> Result<Point3, GeoError> {
        if target.is_geographic() {
            return Ok(p);
        }
        let k = METERS_PER_DEGREE / target.linear_unit_to_meter();
        Ok(Point3::new(p.x * k, p.y * k, p.z))
    }

    fn to_wgs84(&self, source: &SpatialReference, p: Point3) -> Result<Point3, GeoError> {
        if source.is_geographic() {
            return Ok(p);
        }
        let k = METERS_PER_DEGREE / source.linear_unit_to_meter();
        Ok(Point3::new(p.x / k, p.y / k, p.z))
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn assert_close(a: Point3, b: Point3, tol: f64) {
    assert!(
        (a.x - b.x).abs() <= tol && (a.y - b.y).abs() <= tol && (a.z - b.z).abs() <= tol,
        "{:?} != {:?}",
        a,
        b
    );
}
