//! Reconstructed output geometry and planar patch construction for rings
//! with holes.

use crate::error::GeoError;
use crate::geometry::{point_in_polygon, signed_area_xy, Extent, Point, Point3};
use crate::transform::Frame;

/// Geometry produced by the feature and vector reconstructors.
///
/// Closed curves store their ring without repeating the first vertex.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconstructedGeometry {
    Point(Point3),
    OpenCurve(Vec<Point3>),
    ClosedCurve(Vec<Point3>),
    PlanarSurfaceWithHoles(PlanarSurface),
    MultiPart(Vec<ReconstructedGeometry>),
}

impl ReconstructedGeometry {
    /// Short lowercase name used in logs and exports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ReconstructedGeometry::Point(_) => "point",
            ReconstructedGeometry::OpenCurve(_) => "open curve",
            ReconstructedGeometry::ClosedCurve(_) => "closed curve",
            ReconstructedGeometry::PlanarSurfaceWithHoles(_) => "planar surface",
            ReconstructedGeometry::MultiPart(_) => "multipart",
        }
    }
}

/// Planar surface bounded by an outer ring with optional holes, together
/// with a triangulation of its interior.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarSurface {
    pub outer: Vec<Point3>,
    pub holes: Vec<Vec<Point3>>,
    /// Triangles indexing the concatenation of `outer` and every hole.
    pub triangles: Vec<[usize; 3]>,
}

impl PlanarSurface {
    /// Builds a planar patch from rings that do not repeat their first
    /// vertex. Fails with [`GeoError::DegenerateRing`] when the rings do not
    /// span a plane, are not coplanar, or cannot be triangulated.
    pub fn new(outer: Vec<Point3>, holes: Vec<Vec<Point3>>) -> Result<Self, GeoError> {
        if distinct_vertex_count(&outer) < 3 {
            return Err(GeoError::DegenerateRing(
                "outer ring has fewer than three distinct vertices".into(),
            ));
        }
        if let Some(h) = holes.iter().position(|h| distinct_vertex_count(h) < 3) {
            return Err(GeoError::DegenerateRing(format!(
                "hole {} has fewer than three distinct vertices",
                h
            )));
        }
        let frame = fit_plane(&outer)?;
        let size = ring_size(&outer);
        let tol = 1e-9 * size.max(1.0);
        let all: Vec<Point3> = outer.iter().chain(holes.iter().flatten()).copied().collect();
        if all
            .iter()
            .any(|p| (*p - frame.origin).dot(frame.z_axis).abs() > tol)
        {
            return Err(GeoError::DegenerateRing("rings are not coplanar".into()));
        }

        let local: Vec<Point3> = all
            .iter()
            .map(|p| {
                let d = *p - frame.origin;
                Point3::new(d.dot(frame.x_axis), d.dot(frame.y_axis), 0.0)
            })
            .collect();
        let outer_local = &local[..outer.len()];
        if signed_area_xy(outer_local).abs() <= 1e-12 * size * size {
            return Err(GeoError::DegenerateRing("outer ring has no area".into()));
        }

        let mut edges: Vec<(usize, usize)> = Vec::new();
        let mut ranges = Vec::new();
        let mut start = 0;
        for len in std::iter::once(outer.len()).chain(holes.iter().map(Vec::len)) {
            for i in 0..len {
                edges.push((start + i, start + (i + 1) % len));
            }
            ranges.push(start..start + len);
            start += len;
        }
        let coords: Vec<(f64, f64)> = local.iter().map(|p| (p.x, p.y)).collect();
        let tris = cdt::triangulate_with_edges(&coords, &edges)
            .map_err(|e| GeoError::DegenerateRing(format!("triangulation failed: {:?}", e)))?;

        let hole_rings: Vec<&[Point3]> = ranges[1..].iter().map(|r| &local[r.clone()]).collect();
        let triangles: Vec<[usize; 3]> = tris
            .into_iter()
            .map(|t| [t.0, t.1, t.2])
            .filter(|t| {
                let c = Point::new(
                    (local[t[0]].x + local[t[1]].x + local[t[2]].x) / 3.0,
                    (local[t[0]].y + local[t[1]].y + local[t[2]].y) / 3.0,
                );
                point_in_polygon(c, outer_local)
                    && !hole_rings.iter().any(|h| point_in_polygon(c, h))
            })
            .collect();
        if triangles.is_empty() {
            return Err(GeoError::DegenerateRing("triangulation is empty".into()));
        }
        Ok(Self {
            outer,
            holes,
            triangles,
        })
    }

    /// Area of the triangulated patch.
    pub fn area(&self) -> f64 {
        let all: Vec<Point3> = self
            .outer
            .iter()
            .chain(self.holes.iter().flatten())
            .copied()
            .collect();
        self.triangles
            .iter()
            .map(|t| 0.5 * (all[t[1]] - all[t[0]]).cross(all[t[2]] - all[t[0]]).length())
            .sum()
    }
}

/// Plane through the ring using Newell's normal.
fn fit_plane(ring: &[Point3]) -> Result<Frame, GeoError> {
    let mut normal = Point3::origin();
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    let normal = normal
        .normalized()
        .ok_or_else(|| GeoError::DegenerateRing("ring does not span a plane".into()))?;
    let helper = if normal.z.abs() < 0.9 {
        Point3::new(0.0, 0.0, 1.0)
    } else {
        Point3::new(1.0, 0.0, 0.0)
    };
    // Keep the local frame aligned with world XY for horizontal rings.
    let x_dir = if normal.z.abs() >= 0.9 {
        helper - normal * helper.dot(normal)
    } else {
        helper.cross(normal)
    };
    let y_dir = normal.cross(x_dir);
    Frame::from_axes(ring[0], x_dir, y_dir)
        .ok_or_else(|| GeoError::DegenerateRing("ring does not span a plane".into()))
}

fn ring_size(ring: &[Point3]) -> f64 {
    Extent::from_points(ring.iter().map(|p| p.xy()))
        .map(|e| {
            let zmin = ring.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
            let zmax = ring.iter().map(|p| p.z).fold(f64::NEG_INFINITY, f64::max);
            (e.max.x - e.min.x).max(e.max.y - e.min.y).max(zmax - zmin)
        })
        .unwrap_or(0.0)
}

/// Number of distinct vertices in a ring.
pub fn distinct_vertex_count(ring: &[Point3]) -> usize {
    let mut seen: Vec<Point3> = Vec::new();
    for p in ring {
        if !seen.iter().any(|q| q == p) {
            seen.push(*p);
        }
    }
    seen.len()
}

/// Drops the repeated closing vertex of a closed vertex sequence.
pub fn open_ring(vertices: &[Point3]) -> Vec<Point3> {
    let mut ring = vertices.to_vec();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Reverses the ring if it is wound clockwise in the XY plane.
pub fn normalize_ccw(ring: &mut [Point3]) {
    if signed_area_xy(ring) < 0.0 {
        ring.reverse();
    }
}

/// Groups rings into outer boundaries with holes by containment depth.
/// Rings at even depth are outer boundaries; rings at odd depth become holes
/// of their smallest container. Outers keep encounter order.
pub fn assemble_rings(rings: Vec<Vec<Point3>>) -> Result<ReconstructedGeometry, GeoError> {
    if rings.is_empty() {
        return Err(GeoError::DegenerateRing("no rings to assemble".into()));
    }
    let areas: Vec<f64> = rings.iter().map(|r| signed_area_xy(r).abs()).collect();
    let containers: Vec<Vec<usize>> = (0..rings.len())
        .map(|i| {
            (0..rings.len())
                .filter(|&j| j != i && areas[j] > areas[i] && contains_ring(&rings[j], &rings[i]))
                .collect()
        })
        .collect();

    let mut outers: Vec<usize> = Vec::new();
    let mut holes_of: Vec<Vec<usize>> = vec![Vec::new(); rings.len()];
    for (i, cont) in containers.iter().enumerate() {
        if cont.len() % 2 == 0 {
            outers.push(i);
        } else {
            let parent = cont
                .iter()
                .copied()
                .filter(|&j| containers[j].len() % 2 == 0)
                .min_by(|&a, &b| areas[a].total_cmp(&areas[b]))
                .ok_or_else(|| GeoError::DegenerateRing("hole without a container".into()))?;
            holes_of[parent].push(i);
        }
    }

    let mut surfaces = Vec::with_capacity(outers.len());
    for &o in &outers {
        let holes = holes_of[o].iter().map(|&h| rings[h].clone()).collect();
        surfaces.push(PlanarSurface::new(rings[o].clone(), holes)?);
    }
    if surfaces.len() == 1 {
        Ok(ReconstructedGeometry::PlanarSurfaceWithHoles(surfaces.remove(0)))
    } else {
        Ok(ReconstructedGeometry::MultiPart(
            surfaces
                .into_iter()
                .map(ReconstructedGeometry::PlanarSurfaceWithHoles)
                .collect(),
        ))
    }
}

fn contains_ring(outer: &[Point3], inner: &[Point3]) -> bool {
    inner
        .iter()
        .find(|p| !outer.contains(p))
        .map(|p| point_in_polygon(p.xy(), outer))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point3> {
        vec![
            Point3::new(x0, y0, 0.0),
            Point3::new(x0 + size, y0, 0.0),
            Point3::new(x0 + size, y0 + size, 0.0),
            Point3::new(x0, y0 + size, 0.0),
        ]
    }

    #[test]
    fn square_patch_area() {
        let s = PlanarSurface::new(square(0.0, 0.0, 2.0), vec![]).unwrap();
        assert_eq!(s.triangles.len(), 2);
        assert!((s.area() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn patch_with_hole_excludes_hole_area() {
        let s = PlanarSurface::new(square(0.0, 0.0, 10.0), vec![square(4.0, 4.0, 2.0)]).unwrap();
        assert!((s.area() - 96.0).abs() < 1e-6);
    }

    #[test]
    fn collinear_ring_is_degenerate() {
        let ring = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(matches!(
            PlanarSurface::new(ring, vec![]),
            Err(GeoError::DegenerateRing(_))
        ));
    }

    #[test]
    fn vertical_ring_is_planar() {
        let ring = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let s = PlanarSurface::new(ring, vec![]).unwrap();
        assert!((s.area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_rings_become_multipart() {
        let g = assemble_rings(vec![square(0.0, 0.0, 1.0), square(5.0, 0.0, 1.0)]).unwrap();
        match g {
            ReconstructedGeometry::MultiPart(parts) => assert_eq!(parts.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn open_ring_and_orientation() {
        let mut ring = open_ring(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ]);
        assert_eq!(ring.len(), 3);
        normalize_ccw(&mut ring);
        assert!(signed_area_xy(&ring) > 0.0);
    }
}
