mod common;

use assert_fs::prelude::*;
use common::{assert_close, init_logging, PlateCarree, METERS_PER_DEGREE};
use geo_ingest::diagnostics::DiagnosticKind;
use geo_ingest::geometry::Point3;
use geo_ingest::io::read_ascii_grid;
use geo_ingest::raster::GeoTransform;
use geo_ingest::{clip_and_mesh, ClipWindow, RasterGrid, SpatialReference, SrsResolver, Transform};

fn four_by_four() -> RasterGrid {
    let mut samples: Vec<f64> = (0..16).map(f64::from).collect();
    samples[5] = -99999.0;
    RasterGrid::new(
        4,
        4,
        GeoTransform::north_up(0.0, 4.0, 1.0),
        samples,
        SpatialReference::wgs84(),
    )
    .unwrap()
}

#[test]
fn full_extent_yields_full_grid() {
    init_logging();
    let raster = four_by_four();
    for pad in [false, true] {
        let mesh = clip_and_mesh(
            &raster,
            &PlateCarree,
            &Transform::identity(),
            &ClipWindow::new(0.0, 0.0, 4.0, 4.0),
            pad,
        );
        assert_eq!((mesh.width, mesh.height), (4, 4));
        assert_eq!(mesh.vertices.len(), 16);
        assert_eq!(mesh.faces.len(), 9);
        assert!(mesh.diagnostics.is_empty());
        assert_eq!(mesh.faces[0], [0, 1, 5, 4]);
        assert_eq!(mesh.vertices[5].z, 0.0);
        assert_eq!(mesh.vertices[6].z, 6.0);
        assert_close(mesh.vertices[mesh.vertex_index(1, 2)], Point3::new(2.0, 3.0, 6.0), 1e-12);
    }
}

#[test]
fn padding_adds_a_ring_of_pixels() {
    let raster = four_by_four();
    let window = ClipWindow::new(1.5, 1.5, 2.5, 2.5);
    let tight = clip_and_mesh(&raster, &PlateCarree, &Transform::identity(), &window, false);
    let padded = clip_and_mesh(&raster, &PlateCarree, &Transform::identity(), &window, true);
    assert_eq!((tight.width, tight.height), (2, 2));
    assert_eq!((padded.width, padded.height), (4, 4));
}

#[test]
fn window_outside_raster_is_reported() {
    let raster = four_by_four();
    let partial = clip_and_mesh(
        &raster,
        &PlateCarree,
        &Transform::identity(),
        &ClipWindow::new(2.0, 2.0, 9.0, 9.0),
        false,
    );
    assert!(!partial.vertices.is_empty());
    assert!(partial
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::RasterWindowOutOfBounds));

    let disjoint = clip_and_mesh(
        &raster,
        &PlateCarree,
        &Transform::identity(),
        &ClipWindow::new(20.0, 20.0, 30.0, 30.0),
        false,
    );
    assert!(disjoint.vertices.is_empty() && disjoint.faces.is_empty());
    assert!(!disjoint.diagnostics.is_empty());

    // Padding never pulls in pixels for a window that misses the raster.
    let beside = clip_and_mesh(
        &raster,
        &PlateCarree,
        &Transform::identity(),
        &ClipWindow::new(4.2, 1.0, 4.8, 2.0),
        true,
    );
    assert_eq!((beside.width, beside.height), (0, 0));
    assert!(beside.vertices.is_empty());
}

#[test]
fn projected_raster_is_converted_to_wgs84() {
    let srs = PlateCarree.resolve("TEST").unwrap();
    let raster = RasterGrid::new(
        2,
        2,
        GeoTransform::north_up(0.0, 2.0 * METERS_PER_DEGREE, METERS_PER_DEGREE),
        vec![10.0, 11.0, 12.0, 13.0],
        srs,
    )
    .unwrap();
    let shift = Transform::translation(Point3::new(100.0, 0.0, 0.0));
    let window = ClipWindow::new(0.0, 0.0, 2.0, 2.0);
    let mesh = clip_and_mesh(&raster, &PlateCarree, &shift, &window, false);
    assert_eq!(mesh.vertices.len(), 4);
    assert_close(mesh.vertices[0], Point3::new(100.0, 2.0, 10.0), 1e-9);
    assert_close(mesh.vertices[3], Point3::new(101.0, 1.0, 13.0), 1e-9);
    let extent = mesh.extent.unwrap();
    assert!((extent.max.x - 2.0).abs() < 1e-9 && (extent.max.y - 2.0).abs() < 1e-9);
}

#[test]
fn ascii_grid_without_projection_falls_back_to_wgs84() {
    init_logging();
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("dem.asc");
    file.write_str(
        "ncols 3\nnrows 3\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -9999\n\
         1 2 3\n4 -9999 6\n7 8 9\n",
    )
    .unwrap();
    let grid = read_ascii_grid(file.path().to_str().unwrap()).unwrap();
    let (raster, diagnostics) = RasterGrid::from_source(&grid, &PlateCarree).unwrap();
    assert!(raster.srs.is_wgs84());
    assert!(diagnostics
        .iter()
        .all(|d| d.kind == DiagnosticKind::SrsFallback));
    assert!(!diagnostics.is_empty());

    let mesh = clip_and_mesh(
        &raster,
        &PlateCarree,
        &Transform::identity(),
        &ClipWindow::new(0.0, 0.0, 3.0, 3.0),
        false,
    );
    assert_eq!(mesh.vertices.len(), 9);
    assert_eq!(mesh.vertices[4].z, 0.0);
    dir.close().unwrap();
}

#[test]
fn prj_file_supplies_projection() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("dem.asc");
    file.write_str("ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n5\n")
        .unwrap();
    dir.child("dem.prj").write_str("TEST\n").unwrap();
    let grid = read_ascii_grid(file.path().to_str().unwrap()).unwrap();
    let (raster, diagnostics) = RasterGrid::from_source(&grid, &PlateCarree).unwrap();
    assert_eq!(raster.srs.identifier(), "TEST");
    assert!(diagnostics.is_empty());
    dir.close().unwrap();
}
