//! Gridded elevation rasters and their resampling into quad meshes.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::crs::{SpatialReference, SrsResolver};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::GeoError;
use crate::geometry::{Extent, Point, Point3};
use crate::transform::Transform;

/// Samples below this value are treated as missing.
pub const NO_DATA_SENTINEL: f64 = -10_000.0;

/// Six-parameter affine pixel to world mapping:
/// `x = g0 + col * g1 + row * g2`, `y = g3 + col * g4 + row * g5`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// North-up transform with square pixels anchored at the top-left corner.
    pub fn north_up(left: f64, top: f64, pixel_size: f64) -> Self {
        Self([left, pixel_size, 0.0, top, 0.0, -pixel_size])
    }

    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let g = &self.0;
        (g[0] + col * g[1] + row * g[2], g[3] + col * g[4] + row * g[5])
    }

    /// Inverse mapping from world to fractional pixel coordinates, or `None`
    /// when the pixel axes are degenerate.
    pub fn invert(&self) -> Option<GeoTransform> {
        let g = &self.0;
        let det = g[1] * g[5] - g[2] * g[4];
        if det.abs() < 1e-15 {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(GeoTransform([
            (g[2] * g[3] - g[0] * g[5]) * inv_det,
            g[5] * inv_det,
            -g[2] * inv_det,
            (-g[1] * g[3] + g[0] * g[4]) * inv_det,
            -g[4] * inv_det,
            g[1] * inv_det,
        ]))
    }
}

/// Raster dataset as exposed by an external reader.
pub trait RasterSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn geo_transform(&self) -> GeoTransform;
    /// Reads a window of samples in row-major order.
    fn read_window(&self, col: usize, row: usize, width: usize, height: usize) -> Vec<f64>;
    /// Projection identifier or definition, possibly empty.
    fn projection(&self) -> String;
    /// Projection of the ground control points, possibly empty.
    fn gcp_projection(&self) -> String {
        String::new()
    }
}

/// In-memory elevation grid with its reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    pub width: usize,
    pub height: usize,
    pub geo_transform: GeoTransform,
    /// Row-major samples.
    pub samples: Vec<f64>,
    pub srs: SpatialReference,
}

impl RasterGrid {
    pub fn new(
        width: usize,
        height: usize,
        geo_transform: GeoTransform,
        samples: Vec<f64>,
        srs: SpatialReference,
    ) -> Result<Self, GeoError> {
        if samples.len() != width * height {
            return Err(GeoError::InvalidRaster(format!(
                "{} samples for a {}x{} grid",
                samples.len(),
                width,
                height
            )));
        }
        if geo_transform.invert().is_none() {
            return Err(GeoError::InvalidRaster("pixel axes are degenerate".into()));
        }
        Ok(Self {
            width,
            height,
            geo_transform,
            samples,
            srs,
        })
    }

    /// Loads every sample of `source`, resolving its projection through the
    /// fallback chain of [`resolve_raster_srs`].
    pub fn from_source(
        source: &dyn RasterSource,
        resolver: &dyn SrsResolver,
    ) -> Result<(Self, Vec<Diagnostic>), GeoError> {
        let (srs, diagnostics) = resolve_raster_srs(source, resolver);
        let samples = source.read_window(0, 0, source.width(), source.height());
        let grid = Self::new(
            source.width(),
            source.height(),
            source.geo_transform(),
            samples,
            srs,
        )?;
        Ok((grid, diagnostics))
    }

    pub fn sample(&self, col: usize, row: usize) -> f64 {
        self.samples[row * self.width + col]
    }

    /// Bounding box of the raster in its own reference system.
    pub fn extent(&self) -> Extent {
        let (w, h) = (self.width as f64, self.height as f64);
        let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        Extent::from_points(corners.iter().map(|&(c, r)| {
            let (x, y) = self.geo_transform.apply(c, r);
            Point::new(x, y)
        }))
        .unwrap_or(Extent::new(Point::new(0.0, 0.0), Point::new(0.0, 0.0)))
    }

    /// Bounding box of the raster in geodetic coordinates.
    pub fn geodetic_extent(&self, resolver: &dyn SrsResolver) -> Result<Extent, GeoError> {
        let e = self.extent();
        let corners: Vec<Point3> = [
            (e.min.x, e.min.y),
            (e.max.x, e.min.y),
            (e.max.x, e.max.y),
            (e.min.x, e.max.y),
        ]
        .iter()
        .map(|&(x, y)| Point3::new(x, y, 0.0))
        .collect();
        let geo = resolver.to_wgs84_many(&self.srs, &corners)?;
        Extent::from_points(geo.iter().map(|p| p.xy()))
            .ok_or_else(|| GeoError::InvalidRaster("raster has no corners".into()))
    }
}

impl RasterSource for RasterGrid {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn geo_transform(&self) -> GeoTransform {
        self.geo_transform
    }

    fn read_window(&self, col: usize, row: usize, width: usize, height: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(width * height);
        for r in row..row + height {
            let start = r * self.width + col;
            out.extend_from_slice(&self.samples[start..start + width]);
        }
        out
    }

    fn projection(&self) -> String {
        self.srs.definition().to_string()
    }
}

static ESRI_AUTHORITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:AUTHORITY|ID)\[\s*"ESRI"\s*,\s*"?(\d+)"?"#).expect("esri pattern")
});

fn esri_identifier(projection: &str) -> Option<String> {
    let trimmed = projection.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("ESRI:{}", trimmed));
    }
    let upper = trimmed.to_ascii_uppercase();
    if let Some(code) = upper.strip_prefix("ESRI:") {
        return Some(format!("ESRI:{}", code.trim()));
    }
    ESRI_AUTHORITY
        .captures(trimmed)
        .map(|c| format!("ESRI:{}", &c[1]))
}

/// Resolves the reference system of a raster: the dataset projection, then
/// its ESRI authority code, then the ground-control-point projection, then
/// WGS84. Each fallback step is recorded as a diagnostic.
pub fn resolve_raster_srs(
    source: &dyn RasterSource,
    resolver: &dyn SrsResolver,
) -> (SpatialReference, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let projection = source.projection();
    if projection.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::SrsFallback,
            None,
            "raster projection is missing",
        ));
    } else {
        match resolver.resolve(&projection) {
            Ok(srs) => return (srs, diagnostics),
            Err(e) => diagnostics.push(Diagnostic::new(
                DiagnosticKind::SrsFallback,
                None,
                format!("raster projection is not usable: {}", e),
            )),
        }
        if let Some(esri) = esri_identifier(&projection) {
            if let Ok(srs) = resolver.resolve(&esri) {
                log::info!("raster projection morphed to `{}`", esri);
                return (srs, diagnostics);
            }
        }
    }
    let gcp = source.gcp_projection();
    if !gcp.trim().is_empty() {
        if let Ok(srs) = resolver.resolve(&gcp) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::SrsFallback,
                None,
                "raster projection taken from ground control points",
            ));
            return (srs, diagnostics);
        }
    }
    diagnostics.push(Diagnostic::new(
        DiagnosticKind::SrsFallback,
        None,
        "raster projection defaulted to WGS84",
    ));
    (SpatialReference::wgs84(), diagnostics)
}

/// Geodetic clip rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl ClipWindow {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west: west.min(east),
            south: south.min(north),
            east: west.max(east),
            north: south.max(north),
        }
    }
}

/// Quad mesh sampled from a raster. Vertices are row-major with
/// `width * height` entries.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct TerrainMesh {
    pub width: usize,
    pub height: usize,
    pub vertices: Vec<Point3>,
    pub faces: Vec<[usize; 4]>,
    /// Geodetic bounds of the whole raster.
    pub extent: Option<Extent>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TerrainMesh {
    pub fn vertex_index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    fn empty(extent: Option<Extent>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            extent,
            diagnostics,
            ..Self::default()
        }
    }
}

/// Builds quad faces for a row-major grid with the winding
/// `v(r-1,c-1), v(r-1,c), v(r,c), v(r,c-1)`.
pub fn grid_faces(width: usize, height: usize) -> Vec<[usize; 4]> {
    let mut faces = Vec::with_capacity(width.saturating_sub(1) * height.saturating_sub(1));
    for r in 1..height {
        for c in 1..width {
            faces.push([
                (r - 1) * width + (c - 1),
                (r - 1) * width + c,
                r * width + c,
                r * width + (c - 1),
            ]);
        }
    }
    faces
}

fn clean_sample(v: f64) -> f64 {
    if v.is_nan() || v < NO_DATA_SENTINEL {
        0.0
    } else {
        v
    }
}

const PIXEL_EPS: f64 = 1e-6;

/// Resamples the part of `raster` inside `window` into a quad mesh.
///
/// Every sample is taken at its pixel's grid position, converted to WGS84
/// with the sample value as elevation and mapped through `world_transform`.
/// Missing samples become 0. A window reaching outside the raster is
/// clipped and reported; an empty intersection yields an empty mesh.
pub fn clip_and_mesh(
    raster: &RasterGrid,
    resolver: &dyn SrsResolver,
    world_transform: &Transform,
    window: &ClipWindow,
    pad_pixels: bool,
) -> TerrainMesh {
    let mut diagnostics = Vec::new();
    let conversion_failed = |e: GeoError, mut diagnostics: Vec<Diagnostic>| {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::Conversion,
            None,
            e.to_string(),
        ));
        diagnostics
    };

    let extent = match raster.geodetic_extent(resolver) {
        Ok(e) => Some(e),
        Err(e) => {
            diagnostics = conversion_failed(e, diagnostics);
            None
        }
    };

    let corners = [
        Point3::new(window.west, window.south, 0.0),
        Point3::new(window.east, window.south, 0.0),
        Point3::new(window.east, window.north, 0.0),
        Point3::new(window.west, window.north, 0.0),
    ];
    let native: Result<Vec<Point3>, GeoError> = corners
        .iter()
        .map(|&p| resolver.from_wgs84(&raster.srs, p))
        .collect();
    let native = match native {
        Ok(n) => n,
        Err(e) => return TerrainMesh::empty(extent, conversion_failed(e, diagnostics)),
    };
    let Some(window_native) = Extent::from_points(native.iter().map(|p| p.xy())) else {
        return TerrainMesh::empty(extent, diagnostics);
    };
    let raster_extent = raster.extent();
    if !raster_extent.covers(&window_native) {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::RasterWindowOutOfBounds,
            None,
            format!(
                "window [{}, {}, {}, {}] extends outside the raster",
                window.west, window.south, window.east, window.north
            ),
        ));
    }
    let Some(window_native) = window_native.intersection(&raster_extent) else {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::RasterWindowOutOfBounds,
            None,
            "window does not overlap the raster",
        ));
        return TerrainMesh::empty(extent, diagnostics);
    };

    let Some(inverse) = raster.geo_transform.invert() else {
        return TerrainMesh::empty(extent, diagnostics);
    };
    let pixel_corners: Vec<(f64, f64)> = [
        (window_native.min.x, window_native.min.y),
        (window_native.max.x, window_native.min.y),
        (window_native.max.x, window_native.max.y),
        (window_native.min.x, window_native.max.y),
    ]
    .iter()
    .map(|&(x, y)| inverse.apply(x, y))
    .collect();
    let min_c = pixel_corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max_c = pixel_corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let min_r = pixel_corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_r = pixel_corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    let pad = if pad_pixels { 1.0 } else { 0.0 };
    let clamp = |v: f64, limit: usize| v.max(0.0).min(limit as f64) as usize;
    let col0 = clamp((min_c + PIXEL_EPS).floor() - pad, raster.width);
    let col1 = clamp((max_c - PIXEL_EPS).ceil() + pad, raster.width);
    let row0 = clamp((min_r + PIXEL_EPS).floor() - pad, raster.height);
    let row1 = clamp((max_r - PIXEL_EPS).ceil() + pad, raster.height);
    if col1 <= col0 || row1 <= row0 {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::RasterWindowOutOfBounds,
            None,
            "window does not overlap the raster",
        ));
        return TerrainMesh::empty(extent, diagnostics);
    }
    let (width, height) = (col1 - col0, row1 - row0);

    let samples = raster.read_window(col0, row0, width, height);
    let mut native_points = Vec::with_capacity(width * height);
    for r in 0..height {
        for c in 0..width {
            let (x, y) = raster
                .geo_transform
                .apply((col0 + c) as f64, (row0 + r) as f64);
            native_points.push(Point3::new(x, y, clean_sample(samples[r * width + c])));
        }
    }
    let geodetic = match resolver.to_wgs84_many(&raster.srs, &native_points) {
        Ok(g) => g,
        Err(e) => return TerrainMesh::empty(extent, conversion_failed(e, diagnostics)),
    };
    let vertices: Vec<Point3> = geodetic.into_iter().map(|p| world_transform.apply(p)).collect();

    log::debug!(
        "sampled {}x{} window at pixel ({}, {}) of a {}x{} raster",
        width,
        height,
        col0,
        row0,
        raster.width,
        raster.height
    );
    TerrainMesh {
        width,
        height,
        vertices,
        faces: grid_faces(width, height),
        extent,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_transform_inverse() {
        let gt = GeoTransform([100.0, 2.0, 0.5, 50.0, 0.0, -2.0]);
        let inv = gt.invert().unwrap();
        let (x, y) = gt.apply(3.0, 4.0);
        let (c, r) = inv.apply(x, y);
        assert!((c - 3.0).abs() < 1e-12 && (r - 4.0).abs() < 1e-12);
        assert!(GeoTransform([0.0, 1.0, 1.0, 0.0, 1.0, 1.0]).invert().is_none());
    }

    #[test]
    fn face_winding_is_row_major() {
        let faces = grid_faces(3, 2);
        assert_eq!(faces, vec![[0, 1, 4, 3], [1, 2, 5, 4]]);
    }

    #[test]
    fn sample_count_must_match() {
        let err = RasterGrid::new(
            2,
            2,
            GeoTransform::north_up(0.0, 2.0, 1.0),
            vec![0.0; 3],
            SpatialReference::wgs84(),
        );
        assert!(matches!(err, Err(GeoError::InvalidRaster(_))));
    }

    #[test]
    fn esri_codes() {
        assert_eq!(esri_identifier("102100").as_deref(), Some("ESRI:102100"));
        assert_eq!(esri_identifier("esri:54030").as_deref(), Some("ESRI:54030"));
        assert_eq!(
            esri_identifier(r#"PROJCS["x",AUTHORITY["ESRI","102003"]]"#).as_deref(),
            Some("ESRI:102003")
        );
        assert!(esri_identifier("garbage").is_none());
    }

    #[test]
    fn no_data_is_zeroed() {
        assert_eq!(clean_sample(-99999.0), 0.0);
        assert_eq!(clean_sample(f64::NAN), 0.0);
        assert_eq!(clean_sample(-10.0), -10.0);
    }
}
