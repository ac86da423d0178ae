//! Spatial reference systems and their resolution through the `proj` crate.

use once_cell::sync::Lazy;
use proj::Proj;
use regex::Regex;

use crate::error::GeoError;
use crate::geometry::Point3;

const WGS84_DEFINITION: &str = "EPSG:4326";
const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;
const INTERNATIONAL_FOOT: f64 = 0.3048;

/// Resolved spatial reference system.
///
/// The definition string can be an authority code (`"EPSG:4326"`), a Proj4
/// definition or a WKT definition. Properties are derived once when the
/// reference is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialReference {
    identifier: String,
    definition: String,
    epsg: Option<u32>,
    geographic: bool,
    linear_unit_name: String,
    linear_unit_to_meter: f64,
}

impl SpatialReference {
    /// Geodetic WGS84 (EPSG:4326).
    pub fn wgs84() -> Self {
        Self {
            identifier: "WGS84".into(),
            definition: WGS84_DEFINITION.into(),
            epsg: Some(4326),
            geographic: true,
            linear_unit_name: "degree".into(),
            linear_unit_to_meter: 1.0,
        }
    }

    /// A geographic (latitude/longitude) reference.
    pub fn geographic(identifier: &str, definition: &str) -> Self {
        Self {
            identifier: identifier.into(),
            definition: definition.into(),
            epsg: epsg_code(definition),
            geographic: true,
            linear_unit_name: "degree".into(),
            linear_unit_to_meter: 1.0,
        }
    }

    /// A projected or local reference measured in `unit_name`. When
    /// `unit_to_meter` is `None` the factor is derived from the unit name.
    pub fn projected(
        identifier: &str,
        definition: &str,
        unit_name: &str,
        unit_to_meter: Option<f64>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            definition: definition.into(),
            epsg: epsg_code(definition),
            geographic: false,
            linear_unit_name: unit_name.into(),
            linear_unit_to_meter: unit_to_meter.unwrap_or_else(|| linear_unit_factor(unit_name)),
        }
    }

    /// The identifier the reference was requested with.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the underlying definition string.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Returns the EPSG code for this reference, if available.
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// `true` for latitude/longitude-native systems.
    pub fn is_geographic(&self) -> bool {
        self.geographic
    }

    /// Name of the linear unit, `degree` for geographic references.
    pub fn linear_unit_name(&self) -> &str {
        &self.linear_unit_name
    }

    /// Meters per linear unit. Always 1 for geographic references.
    pub fn linear_unit_to_meter(&self) -> f64 {
        self.linear_unit_to_meter
    }

    pub fn is_wgs84(&self) -> bool {
        self.epsg == Some(4326)
    }
}

fn epsg_code(definition: &str) -> Option<u32> {
    let upper = definition.trim().to_ascii_uppercase();
    upper.strip_prefix("EPSG:")?.trim().parse().ok()
}

/// Meters per unit for a linear unit name. Names mentioning feet resolve to
/// the international foot, or the US survey foot when marked as such.
pub fn linear_unit_factor(name: &str) -> f64 {
    let lower = name.trim().to_ascii_lowercase();
    match lower.as_str() {
        "" | "m" | "metre" | "meter" | "metres" | "meters" => return 1.0,
        "km" | "kilometre" | "kilometer" => return 1000.0,
        "us-ft" | "us_ft" | "ussurveyfoot" => return US_SURVEY_FOOT,
        "ft" => return INTERNATIONAL_FOOT,
        _ => {}
    }
    if lower.contains("feet") || lower.contains("foot") {
        if lower.contains("us") || lower.contains("survey") {
            US_SURVEY_FOOT
        } else {
            INTERNATIONAL_FOOT
        }
    } else {
        1.0
    }
}

/// Turns identifiers into spatial references and converts points between a
/// reference and WGS84. WGS84 points are `(longitude, latitude, elevation)`;
/// elevation passes through unchanged.
pub trait SrsResolver {
    fn resolve(&self, identifier: &str) -> Result<SpatialReference, GeoError>;

    fn from_wgs84(&self, target: &SpatialReference, p: Point3) -> Result<Point3, GeoError>;

    fn to_wgs84(&self, source: &SpatialReference, p: Point3) -> Result<Point3, GeoError>;

    /// Converts many points to WGS84. Implementations may share setup work
    /// across the batch.
    fn to_wgs84_many(
        &self,
        source: &SpatialReference,
        points: &[Point3],
    ) -> Result<Vec<Point3>, GeoError> {
        points.iter().map(|&p| self.to_wgs84(source, p)).collect()
    }
}

/// [`SrsResolver`] backed by PROJ.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjResolver;

impl ProjResolver {
    pub fn new() -> Self {
        Self
    }

    fn create(from: &str, to: &str) -> Result<Proj, GeoError> {
        Proj::new_known_crs(from, to, None).map_err(|e| GeoError::Conversion(e.to_string()))
    }

    fn convert(proj: &Proj, p: Point3) -> Result<Point3, GeoError> {
        let (x, y) = proj
            .convert((p.x, p.y))
            .map_err(|e| GeoError::Conversion(e.to_string()))?;
        Ok(Point3::new(x, y, p.z))
    }
}

/// Maps user identifiers to a PROJ-understood definition.
pub fn normalize_identifier(identifier: &str) -> Result<String, GeoError> {
    let trimmed = identifier.trim();
    let unresolved = |reason: &str| GeoError::UnresolvedSrs {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    };
    if trimmed.is_empty() {
        return Err(unresolved("empty identifier"));
    }
    let upper = trimmed.to_ascii_uppercase();
    if matches!(
        upper.as_str(),
        "WGS84" | "WGS 84" | "WGS-84" | "CRS84" | "OGC:CRS84"
    ) {
        return Ok(WGS84_DEFINITION.to_string());
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Ok(format!("EPSG:{}", trimmed));
    }
    if let Some(code) = upper.strip_prefix("EPSG:") {
        return code
            .trim()
            .parse::<u32>()
            .map(|c| format!("EPSG:{}", c))
            .map_err(|_| unresolved("invalid EPSG code"));
    }
    Ok(trimmed.to_string())
}

static WKT_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:LENGTH)?UNIT\[\s*"([^"]+)"\s*,\s*([0-9.eE+-]+)"#).expect("unit pattern")
});

const HELPER_STEPS: &[&str] = &[
    "pipeline", "axisswap", "unitconvert", "noop", "push", "pop", "cart", "helmert",
    "hgridshift", "vgridshift", "molodensky", "affine", "geogoffset", "set", "longlat",
    "latlong", "lonlat", "latlon", "deformation", "xyzgridshift", "gridshift",
];

fn definition_is_geographic(definition: &str) -> Option<bool> {
    let lower = definition.to_ascii_lowercase();
    let upper = definition.trim_start().to_ascii_uppercase();
    if lower.contains("proj=longlat") || lower.contains("proj=latlong") {
        return Some(true);
    }
    if lower.contains("+proj=") {
        return Some(false);
    }
    if ["GEOGCS", "GEOGCRS", "GEOGRAPHICCRS"]
        .iter()
        .any(|k| upper.starts_with(*k))
    {
        return Some(true);
    }
    if ["PROJCS", "PROJCRS", "PROJECTEDCRS"]
        .iter()
        .any(|k| upper.starts_with(*k))
    {
        return Some(false);
    }
    None
}

/// `true` when the pipeline contains an actual map projection step.
fn pipeline_projects(pipeline: &str) -> bool {
    pipeline
        .split_whitespace()
        .filter_map(|tok| tok.trim_start_matches('+').strip_prefix("proj="))
        .any(|name| !HELPER_STEPS.contains(&name))
}

fn unit_from_definitions(definition: &str, pipeline: &str) -> (String, Option<f64>) {
    if let Some(caps) = WKT_UNIT
        .captures_iter(definition)
        .filter(|c| {
            let name = c[1].to_ascii_lowercase();
            !(name.contains("degree") || name.contains("radian") || name.contains("grad"))
        })
        .last()
    {
        return (caps[1].to_string(), caps[2].parse().ok());
    }
    for source in [definition, pipeline] {
        let tokens: Vec<&str> = source
            .split_whitespace()
            .map(|t| t.trim_start_matches('+'))
            .collect();
        if let Some(f) = tokens
            .iter()
            .rev()
            .find_map(|t| t.strip_prefix("to_meter="))
            .and_then(|v| v.parse::<f64>().ok())
        {
            return ("to_meter".into(), Some(f));
        }
        if let Some(name) = tokens
            .iter()
            .rev()
            .find_map(|t| t.strip_prefix("xy_out=").or_else(|| t.strip_prefix("units=")))
        {
            if !matches!(name, "rad" | "deg") {
                return (name.to_string(), None);
            }
        }
    }
    ("metre".into(), Some(1.0))
}

impl SrsResolver for ProjResolver {
    fn resolve(&self, identifier: &str) -> Result<SpatialReference, GeoError> {
        let definition = normalize_identifier(identifier)?;
        if definition == WGS84_DEFINITION {
            return Ok(SpatialReference {
                identifier: identifier.to_string(),
                ..SpatialReference::wgs84()
            });
        }
        let proj = Proj::new_known_crs(WGS84_DEFINITION, &definition, None).map_err(|e| {
            GeoError::UnresolvedSrs {
                identifier: identifier.to_string(),
                reason: e.to_string(),
            }
        })?;
        let pipeline = proj.def().unwrap_or_default();
        let geographic = definition_is_geographic(&definition)
            .unwrap_or_else(|| !pipeline_projects(&pipeline));
        log::debug!(
            "resolved `{}` as {} ({})",
            identifier,
            if geographic { "geographic" } else { "projected" },
            pipeline
        );
        if geographic {
            return Ok(SpatialReference::geographic(identifier, &definition));
        }
        let (unit, factor) = unit_from_definitions(&definition, &pipeline);
        Ok(SpatialReference::projected(identifier, &definition, &unit, factor))
    }

    fn from_wgs84(&self, target: &SpatialReference, p: Point3) -> Result<Point3, GeoError> {
        if target.is_wgs84() {
            return Ok(p);
        }
        let proj = Self::create(WGS84_DEFINITION, target.definition())?;
        Self::convert(&proj, p)
    }

    fn to_wgs84(&self, source: &SpatialReference, p: Point3) -> Result<Point3, GeoError> {
        if source.is_wgs84() {
            return Ok(p);
        }
        let proj = Self::create(source.definition(), WGS84_DEFINITION)?;
        Self::convert(&proj, p)
    }

    fn to_wgs84_many(
        &self,
        source: &SpatialReference,
        points: &[Point3],
    ) -> Result<Vec<Point3>, GeoError> {
        if source.is_wgs84() {
            return Ok(points.to_vec());
        }
        let proj = Self::create(source.definition(), WGS84_DEFINITION)?;
        points.iter().map(|&p| Self::convert(&proj, p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wgs84_to_web_mercator() {
        let resolver = ProjResolver::new();
        let webm = resolver.resolve("EPSG:3857").unwrap();
        assert!(!webm.is_geographic());
        let p = resolver.from_wgs84(&webm, Point3::new(0.0, 0.0, 5.0)).unwrap();
        assert!(p.x.abs() < 1e-6 && p.y.abs() < 1e-6);
        assert_eq!(p.z, 5.0);
    }

    #[test]
    fn identifier_normalization() {
        assert_eq!(normalize_identifier("wgs84").unwrap(), "EPSG:4326");
        assert_eq!(normalize_identifier("2056").unwrap(), "EPSG:2056");
        assert_eq!(normalize_identifier("epsg: 32633").unwrap(), "EPSG:32633");
        assert!(normalize_identifier("EPSG:abc").is_err());
        assert!(normalize_identifier("  ").is_err());
    }

    #[test]
    fn unit_names() {
        assert_eq!(linear_unit_factor("metre"), 1.0);
        assert_eq!(linear_unit_factor("foot"), 0.3048);
        assert_eq!(linear_unit_factor("US survey foot"), 1200.0 / 3937.0);
        assert_eq!(linear_unit_factor("us-ft"), 1200.0 / 3937.0);
    }

    #[test]
    fn wkt_unit_is_read() {
        let wkt = concat!(
            r#"PROJCS["x",GEOGCS["g",UNIT["degree",0.0174532925199433]],"#,
            r#"UNIT["US survey foot",0.304800609601219]]"#
        );
        let (name, factor) = unit_from_definitions(wkt, "");
        assert_eq!(name, "US survey foot");
        assert!((factor.unwrap() - 0.304800609601219).abs() < 1e-15);
        assert_eq!(definition_is_geographic(wkt), Some(false));
    }

    #[test]
    fn pipeline_classification() {
        let swap = "proj=pipeline step proj=axisswap order=2,1 \
                    step proj=unitconvert xy_in=deg xy_out=rad";
        let utm = "proj=pipeline step proj=unitconvert xy_in=deg xy_out=rad step proj=utm zone=33";
        let feet = "proj=pipeline step proj=tmerc step proj=unitconvert xy_in=m xy_out=us-ft";
        assert!(!pipeline_projects(swap));
        assert!(pipeline_projects(utm));
        assert_eq!(unit_from_definitions("", feet).0, "us-ft");
    }

    #[test]
    fn unknown_identifier_is_unresolved() {
        let err = ProjResolver::new().resolve("EPSG:999999").unwrap_err();
        assert!(matches!(err, GeoError::UnresolvedSrs { .. }));
    }
}
