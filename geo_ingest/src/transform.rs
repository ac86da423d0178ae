//! Affine transforms stored as 4x4 homogeneous matrices.

use nalgebra::{Matrix4, Vector4};

use crate::error::GeoError;
use crate::geometry::Point3;

/// Orthonormal coordinate frame: an origin with three unit axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Point3,
    pub x_axis: Point3,
    pub y_axis: Point3,
    pub z_axis: Point3,
}

impl Frame {
    /// Builds a right-handed frame from an origin and two in-plane
    /// directions. The second direction is orthogonalised against the first.
    /// Returns `None` when either direction has zero length or both are
    /// parallel.
    pub fn from_axes(origin: Point3, x_dir: Point3, y_dir: Point3) -> Option<Self> {
        let x_axis = x_dir.normalized()?;
        let y_axis = (y_dir - x_axis * y_dir.dot(x_axis)).normalized()?;
        if y_dir.normalized()?.cross(x_axis).length() < 1e-12 {
            return None;
        }
        Some(Self {
            origin,
            x_axis,
            y_axis,
            z_axis: x_axis.cross(y_axis),
        })
    }

    /// The world XY frame.
    pub fn world_xy() -> Self {
        Self {
            origin: Point3::origin(),
            x_axis: Point3::new(1.0, 0.0, 0.0),
            y_axis: Point3::new(0.0, 1.0, 0.0),
            z_axis: Point3::new(0.0, 0.0, 1.0),
        }
    }
}

/// A 4x4 affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    matrix: Matrix4<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Row-major copy of the matrix values.
    pub fn rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = self.matrix[(r, c)];
            }
        }
        rows
    }

    pub fn translation(offset: Point3) -> Self {
        Self {
            matrix: Matrix4::new_translation(&nalgebra::Vector3::new(offset.x, offset.y, offset.z)),
        }
    }

    /// Non-uniform scale about the origin.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            matrix: Matrix4::new_nonuniform_scaling(&nalgebra::Vector3::new(sx, sy, sz)),
        }
    }

    /// Linear map sending the world axes to the given columns.
    pub fn from_columns(x: Point3, y: Point3, z: Point3) -> Self {
        Self {
            matrix: Matrix4::new(
                x.x, y.x, z.x, 0.0, //
                x.y, y.y, z.y, 0.0, //
                x.z, y.z, z.z, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ),
        }
    }

    /// Maps coordinates expressed relative to `from` onto `to`, so that the
    /// origin and axes of `from` land on those of `to`. Both frames must be
    /// orthonormal.
    pub fn change_of_basis(from: &Frame, to: &Frame) -> Self {
        let to_world = Transform::translation(to.origin)
            .compose(&Transform::from_columns(to.x_axis, to.y_axis, to.z_axis));
        let from_local = Transform::from_columns(from.x_axis, from.y_axis, from.z_axis)
            .transposed()
            .compose(&Transform::translation(-from.origin));
        to_world.compose(&from_local)
    }

    fn transposed(&self) -> Self {
        Self {
            matrix: self.matrix.transpose(),
        }
    }

    /// Returns `self ∘ inner`: the result applies `inner` first.
    pub fn compose(&self, inner: &Transform) -> Self {
        Self {
            matrix: self.matrix * inner.matrix,
        }
    }

    /// Returns the inverse transform.
    pub fn inverse(&self) -> Result<Transform, GeoError> {
        let det = self.matrix.determinant();
        if !det.is_finite() || det.abs() < 1e-300 {
            return Err(GeoError::NonInvertible);
        }
        let inv = self.matrix.try_inverse().ok_or(GeoError::NonInvertible)?;
        if inv.iter().any(|v| !v.is_finite()) {
            return Err(GeoError::NonInvertible);
        }
        Ok(Self { matrix: inv })
    }

    /// Applies the transform to a point.
    pub fn apply(&self, p: Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        if v.w != 0.0 && v.w != 1.0 {
            Point3::new(v.x / v.w, v.y / v.w, v.z / v.w)
        } else {
            Point3::new(v.x, v.y, v.z)
        }
    }

    /// Element-wise comparison, relative to the largest entry.
    pub fn approx_eq(&self, other: &Transform, tol: f64) -> bool {
        let scale = self
            .matrix
            .iter()
            .chain(other.matrix.iter())
            .fold(1.0f64, |m, v| m.max(v.abs()));
        self.matrix
            .iter()
            .zip(other.matrix.iter())
            .all(|(a, b)| (a - b).abs() <= tol * scale)
    }
}

/// Returns the inverse of `transform`.
pub fn invert(transform: &Transform) -> Result<Transform, GeoError> {
    transform.inverse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singular_matrix_is_not_invertible() {
        let t = Transform::scale(1.0, 0.0, 1.0);
        assert_eq!(invert(&t), Err(GeoError::NonInvertible));
    }

    #[test]
    fn compose_applies_inner_first() {
        let s = Transform::scale(2.0, 2.0, 2.0);
        let t = Transform::translation(Point3::new(1.0, 0.0, 0.0));
        let p = t.compose(&s).apply(Point3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Point3::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn change_of_basis_maps_frames() {
        let from = Frame::world_xy();
        let to = Frame::from_axes(
            Point3::new(10.0, 5.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
        )
        .unwrap();
        let t = Transform::change_of_basis(&from, &to);
        let p = t.apply(Point3::new(1.0, 0.0, 0.0));
        assert!((p.x - 10.0).abs() < 1e-12 && (p.y - 6.0).abs() < 1e-12);
        let inv = t.inverse().unwrap();
        assert!(t.compose(&inv).approx_eq(&Transform::identity(), 1e-12));
    }

    #[test]
    fn parallel_axes_do_not_form_a_frame() {
        let o = Point3::origin();
        let (x, twice_x) = (Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        assert!(Frame::from_axes(o, x, twice_x).is_none());
        assert!(Frame::from_axes(o, Point3::origin(), Point3::new(0.0, 1.0, 0.0)).is_none());
    }
}
