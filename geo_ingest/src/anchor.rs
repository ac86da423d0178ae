//! Georeferencing anchor and the transforms derived from it.
//!
//! The anchor ties a point of the model's local plane to a geodetic
//! position. Model coordinates are mapped to WGS84 through a local
//! linearisation of the ellipsoid at the anchor latitude; transforms towards
//! other reference systems are built by sampling the anchor and two
//! auxiliary points half a degree north and east of it.

use std::fmt;

use crate::crs::{SpatialReference, SrsResolver};
use crate::dms::{parse_dms_latitude, parse_dms_longitude};
use crate::error::{GeoError, ParseError};
use crate::geometry::Point3;
use crate::transform::{Frame, Transform};

/// WGS84 semi-major axis in meters.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

const AUX_OFFSET_DEG: f64 = 0.5;

/// Local plane of the model space the anchor is attached to.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnchorPlane {
    pub origin: Point3,
    /// Model direction pointing east.
    pub east: Point3,
    /// Model direction pointing north.
    pub north: Point3,
}

impl Default for AnchorPlane {
    fn default() -> Self {
        Self {
            origin: Point3::origin(),
            east: Point3::new(1.0, 0.0, 0.0),
            north: Point3::new(0.0, 1.0, 0.0),
        }
    }
}

/// Geodetic control point with its local orientation.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Anchor {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub plane: AnchorPlane,
    /// Meters per model unit.
    pub unit_scale: f64,
}

impl Default for Anchor {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            elevation: 0.0,
            plane: AnchorPlane::default(),
            unit_scale: 1.0,
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Latitude: {} / Longitude: {}", self.latitude, self.longitude)
    }
}

/// Meters per degree of latitude and of longitude at `latitude` on the
/// WGS84 ellipsoid.
pub fn meters_per_degree(latitude: f64) -> (f64, f64) {
    let e2 = WGS84_F * (2.0 - WGS84_F);
    let phi = latitude.to_radians();
    let w = 1.0 - e2 * phi.sin().powi(2);
    let meridional = WGS84_A * (1.0 - e2) / w.powf(1.5);
    let normal = WGS84_A / w.sqrt();
    let rad = std::f64::consts::PI / 180.0;
    (meridional * rad, normal * phi.cos() * rad)
}

impl Anchor {
    /// Anchor at the given position with the world XY plane and meter units.
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Result<Self, GeoError> {
        let anchor = Self {
            latitude,
            longitude,
            elevation,
            ..Self::default()
        };
        anchor.validate()?;
        Ok(anchor)
    }

    pub fn with_plane(mut self, plane: AnchorPlane) -> Self {
        self.plane = plane;
        self
    }

    pub fn with_unit_scale(mut self, unit_scale: f64) -> Self {
        self.unit_scale = unit_scale;
        self
    }

    /// Checks ranges, units and the plane.
    pub fn validate(&self) -> Result<(), GeoError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(GeoError::DegenerateAnchor(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(GeoError::DegenerateAnchor(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        if !(self.unit_scale.is_finite() && self.unit_scale > 0.0) {
            return Err(GeoError::DegenerateAnchor(format!(
                "unit scale {} must be positive",
                self.unit_scale
            )));
        }
        self.frame().map(|_| ())
    }

    /// Replaces the geodetic position from latitude and longitude text in
    /// decimal or DMS notation. The anchor is left untouched on failure.
    pub fn set_location(&mut self, latitude: &str, longitude: &str) -> Result<(), ParseError> {
        let lat = parse_dms_latitude(latitude)?;
        let lon = parse_dms_longitude(longitude)?;
        self.latitude = lat;
        self.longitude = lon;
        log::info!("anchor moved to {}", self);
        Ok(())
    }

    /// Orthonormal frame of the anchor plane.
    pub fn frame(&self) -> Result<Frame, GeoError> {
        Frame::from_axes(self.plane.origin, self.plane.east, self.plane.north).ok_or_else(|| {
            GeoError::DegenerateAnchor("plane directions are zero or parallel".into())
        })
    }

    /// Projects model coordinates onto the anchor frame and scales them to
    /// meters: the result is `(east, north, up)` in meters.
    fn model_to_local_meters(&self) -> Result<Transform, GeoError> {
        let f = self.frame()?;
        let s = self.unit_scale;
        Ok(Transform::scale(s, s, s)
            .compose(&Transform::from_columns(f.x_axis, f.y_axis, f.z_axis).inverse()?)
            .compose(&Transform::translation(-f.origin)))
    }

    /// Transform taking model coordinates to WGS84 `(longitude, latitude,
    /// elevation)`.
    pub fn model_to_wgs84_transform(&self) -> Result<Transform, GeoError> {
        self.validate()?;
        if self.latitude.abs() >= 90.0 - 1e-9 {
            return Err(GeoError::DegenerateAnchor(
                "longitude scale vanishes at the poles".into(),
            ));
        }
        let (m_lat, m_lon) = meters_per_degree(self.latitude);
        Ok(
            Transform::translation(Point3::new(self.longitude, self.latitude, self.elevation))
                .compose(&Transform::scale(1.0 / m_lon, 1.0 / m_lat, 1.0))
                .compose(&self.model_to_local_meters()?),
        )
    }

    /// Inverse of [`Anchor::model_to_wgs84_transform`].
    pub fn wgs84_to_model_transform(&self) -> Result<Transform, GeoError> {
        self.model_to_wgs84_transform()?.inverse()
    }

    pub fn model_to_wgs84(&self, p: Point3) -> Result<Point3, GeoError> {
        Ok(self.model_to_wgs84_transform()?.apply(p))
    }

    pub fn wgs84_to_model(&self, p: Point3) -> Result<Point3, GeoError> {
        Ok(self.wgs84_to_model_transform()?.apply(p))
    }

    /// Latitude and longitude of a model point.
    pub fn point_to_decimal_degrees(&self, p: Point3) -> Result<(f64, f64), GeoError> {
        let g = self.model_to_wgs84(p)?;
        Ok((g.y, g.x))
    }
}

/// Builds the transform taking model coordinates to `target` coordinates.
///
/// Projected and local targets get a rigid motion with the uniform factor
/// `unit_scale / target unit`. Geographic targets reuse the degree offsets of
/// the auxiliary points, so a WGS84 target reproduces
/// [`Anchor::model_to_wgs84_transform`].
pub fn build_anchor_transform(
    anchor: &Anchor,
    target: &SpatialReference,
    resolver: &dyn SrsResolver,
) -> Result<Transform, GeoError> {
    anchor.validate()?;
    if target.is_wgs84() {
        return anchor.model_to_wgs84_transform();
    }
    let geo = Point3::new(anchor.longitude, anchor.latitude, anchor.elevation);
    let origin = resolver.from_wgs84(target, geo)?;
    let east_pt = resolver.from_wgs84(target, geo + Point3::new(AUX_OFFSET_DEG, 0.0, 0.0))?;
    let north_pt = resolver.from_wgs84(target, geo + Point3::new(0.0, AUX_OFFSET_DEG, 0.0))?;
    let east = east_pt - origin;
    let north = north_pt - origin;
    let degenerate = || {
        GeoError::DegenerateAnchor(format!(
            "auxiliary points coincide with the anchor in `{}`",
            target.identifier()
        ))
    };

    let to_target = if target.is_geographic() {
        if anchor.latitude.abs() >= 90.0 - 1e-9 {
            return Err(GeoError::DegenerateAnchor(
                "longitude scale vanishes at the poles".into(),
            ));
        }
        let per_deg_east = east * (1.0 / AUX_OFFSET_DEG);
        let per_deg_north = north * (1.0 / AUX_OFFSET_DEG);
        if per_deg_east.cross(per_deg_north).length() <= f64::EPSILON {
            return Err(degenerate());
        }
        let (m_lat, m_lon) = meters_per_degree(anchor.latitude);
        Transform::translation(origin)
            .compose(&Transform::from_columns(
                per_deg_east,
                per_deg_north,
                Point3::new(0.0, 0.0, 1.0),
            ))
            .compose(&Transform::scale(1.0 / m_lon, 1.0 / m_lat, 1.0))
    } else {
        let frame = Frame::from_axes(origin, east, north).ok_or_else(degenerate)?;
        let k = 1.0 / target.linear_unit_to_meter();
        Transform::translation(origin)
            .compose(&Transform::from_columns(frame.x_axis, frame.y_axis, frame.z_axis))
            .compose(&Transform::scale(k, k, k))
    };
    let transform = to_target.compose(&anchor.model_to_local_meters()?);
    log::debug!(
        "anchor transform to `{}`: {:?}",
        target.identifier(),
        transform.rows()
    );
    Ok(transform)
}

/// Resolves `identifier` and builds the model to user SRS transform.
pub fn model_to_user_srs(
    anchor: &Anchor,
    identifier: &str,
    resolver: &dyn SrsResolver,
) -> Result<Transform, GeoError> {
    let target = resolver.resolve(identifier)?;
    build_anchor_transform(anchor, &target, resolver)
}

/// Inverse of [`model_to_user_srs`].
pub fn user_srs_to_model(
    anchor: &Anchor,
    identifier: &str,
    resolver: &dyn SrsResolver,
) -> Result<Transform, GeoError> {
    model_to_user_srs(anchor, identifier, resolver)?.inverse()
}
