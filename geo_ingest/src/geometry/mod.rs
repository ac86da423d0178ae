//! Basic geometry primitives shared by the transform engine and the
//! reconstructors.

use std::ops::{Add, Mul, Neg, Sub};

/// Representation of a 2D point.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Representation of a 3D point or vector.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn dot(self, other: Point3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Point3) -> Point3 {
        Point3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Returns the unit vector in the same direction, or `None` for a
    /// zero-length vector.
    pub fn normalized(self) -> Option<Point3> {
        let len = self.length();
        if len <= f64::EPSILON || !len.is_finite() {
            None
        } else {
            Some(self * (1.0 / len))
        }
    }

    pub fn xy(self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl Add for Point3 {
    type Output = Point3;
    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Point3;
    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point3 {
    type Output = Point3;
    fn mul(self, rhs: f64) -> Point3 {
        Point3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Point3 {
    type Output = Point3;
    fn neg(self) -> Point3 {
        Point3::new(-self.x, -self.y, -self.z)
    }
}

/// Signed area of a ring projected onto the XY plane (shoelace formula).
/// Positive for counter-clockwise rings.
pub fn signed_area_xy(vertices: &[Point3]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..vertices.len() {
        let j = (i + 1) % vertices.len();
        sum += vertices[i].x * vertices[j].y - vertices[j].x * vertices[i].y;
    }
    sum * 0.5
}

/// Returns `true` if point `p` is inside the polygon defined by `poly` using
/// the ray casting algorithm.
pub fn point_in_polygon(p: Point, poly: &[Point3]) -> bool {
    let mut inside = false;
    if poly.is_empty() {
        return inside;
    }
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let pi = poly[i];
        let pj = poly[j];
        if ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Axis-aligned rectangle in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Extent {
    pub min: Point,
    pub max: Point,
}

impl Extent {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Smallest extent covering all `points`, or `None` when empty.
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut ext = Self::new(first, first);
        for p in iter {
            ext.min.x = ext.min.x.min(p.x);
            ext.min.y = ext.min.y.min(p.y);
            ext.max.x = ext.max.x.max(p.x);
            ext.max.y = ext.max.y.max(p.y);
        }
        Some(ext)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Overlapping part of two extents.
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        let min = Point::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y));
        let max = Point::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y));
        if min.x > max.x || min.y > max.y {
            None
        } else {
            Some(Extent::new(min, max))
        }
    }

    /// Returns `true` if `other` lies entirely inside this extent.
    pub fn covers(&self, other: &Extent) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shoelace_sign_follows_winding() {
        let square = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        assert!((signed_area_xy(&square) - 1.0).abs() < 1e-12);
        let reversed: Vec<Point3> = square.iter().rev().copied().collect();
        assert!(signed_area_xy(&reversed) < 0.0);
    }

    #[test]
    fn point3_cross_and_normalize() {
        let e = Point3::new(2.0, 0.0, 0.0);
        let n = Point3::new(0.0, 3.0, 0.0);
        assert_eq!(e.cross(n), Point3::new(0.0, 0.0, 6.0));
        assert_eq!(e.normalized(), Some(Point3::new(1.0, 0.0, 0.0)));
        assert!(Point3::origin().normalized().is_none());
        assert!(((n - e).length() - 13f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn ray_casting_inside() {
        let ring = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 4.0, 0.0),
            Point3::new(0.0, 4.0, 0.0),
        ];
        assert!(point_in_polygon(Point::new(2.0, 2.0), &ring));
        assert!(!point_in_polygon(Point::new(5.0, 2.0), &ring));
    }

    #[test]
    fn extent_intersection() {
        let a = Extent::new(Point::new(0.0, 0.0), Point::new(4.0, 4.0));
        let b = Extent::new(Point::new(2.0, -1.0), Point::new(6.0, 3.0));
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, Extent::new(Point::new(2.0, 0.0), Point::new(4.0, 3.0)));
        assert!(!a.covers(&b));
        let c = Extent::new(Point::new(10.0, 10.0), Point::new(11.0, 11.0));
        assert!(a.intersection(&c).is_none());
    }
}
