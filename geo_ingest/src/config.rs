//! Per-document georeferencing context.

use crate::anchor::Anchor;
use crate::crs::{SpatialReference, SrsResolver};
use crate::error::GeoError;

fn default_srs() -> String {
    "WGS84".into()
}

fn enabled() -> bool {
    true
}

/// Georeferencing settings of one document: the anchor, the user SRS
/// identifier and import options.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoContext {
    pub anchor: Anchor,
    #[serde(default = "default_srs")]
    pub srs: String,
    /// Clip imports to the requested window.
    #[serde(default = "enabled")]
    pub clip: bool,
    /// Expand raster windows by one pixel on every side.
    #[serde(default = "enabled")]
    pub pad_pixels: bool,
}

impl Default for GeoContext {
    fn default() -> Self {
        Self::new(Anchor::default())
    }
}

impl GeoContext {
    pub fn new(anchor: Anchor) -> Self {
        Self {
            anchor,
            srs: default_srs(),
            clip: true,
            pad_pixels: true,
        }
    }

    pub fn with_srs(mut self, srs: impl Into<String>) -> Self {
        self.srs = srs.into();
        self
    }

    /// Resolves the user SRS identifier.
    pub fn spatial_reference(
        &self,
        resolver: &dyn SrsResolver,
    ) -> Result<SpatialReference, GeoError> {
        resolver.resolve(&self.srs)
    }

    /// Saves this context to a JSON file.
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Loads a context from a JSON file and validates its anchor.
    pub fn load(path: &str) -> std::io::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let ctx: Self = serde_json::from_str(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        ctx.anchor
            .validate()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::AnchorPlane;
    use crate::geometry::Point3;

    #[test]
    fn save_and_load_round_trip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let anchor = Anchor::new(46.5, 6.6, 372.0)
            .unwrap()
            .with_unit_scale(0.001)
            .with_plane(AnchorPlane {
                origin: Point3::new(5.0, 5.0, 0.0),
                ..AnchorPlane::default()
            });
        let ctx = GeoContext::new(anchor).with_srs("EPSG:2056");
        ctx.save(path).unwrap();
        assert_eq!(GeoContext::load(path).unwrap(), ctx);
    }

    #[test]
    fn missing_options_take_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let json = r#"{"anchor":{"latitude":1.0,"longitude":2.0,"elevation":0.0,
            "plane":{"origin":{"x":0,"y":0,"z":0},
                "east":{"x":1,"y":0,"z":0},"north":{"x":0,"y":1,"z":0}},
            "unit_scale":1.0}}"#;
        std::fs::write(path, json).unwrap();
        let ctx = GeoContext::load(path).unwrap();
        assert_eq!(ctx.srs, "WGS84");
        assert!(ctx.clip && ctx.pad_pixels);
    }

    #[test]
    fn invalid_anchor_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let mut ctx = GeoContext::default();
        ctx.anchor.latitude = 120.0;
        ctx.save(path).unwrap();
        assert!(GeoContext::load(path).is_err());
    }

    #[test]
    fn default_srs_resolves_to_wgs84() {
        let srs = GeoContext::default()
            .spatial_reference(&crate::crs::ProjResolver::new())
            .unwrap();
        assert!(srs.is_wgs84() && srs.is_geographic());
        assert_eq!(srs.linear_unit_name(), "degree");
    }
}
