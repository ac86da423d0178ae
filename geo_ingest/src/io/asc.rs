//! ESRI ASCII grid reader.

use std::io;
use std::path::Path;

use crate::raster::{GeoTransform, RasterSource};

use super::{invalid_data, read_to_string};

/// Elevation grid read from an `.asc` file. Missing samples are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct AsciiGrid {
    pub ncols: usize,
    pub nrows: usize,
    pub geo_transform: GeoTransform,
    /// Row-major samples, north row first.
    pub samples: Vec<f64>,
    /// Projection definition from a sibling `.prj` file, possibly empty.
    pub projection: String,
}

impl RasterSource for AsciiGrid {
    fn width(&self) -> usize {
        self.ncols
    }

    fn height(&self) -> usize {
        self.nrows
    }

    fn geo_transform(&self) -> GeoTransform {
        self.geo_transform
    }

    fn read_window(&self, col: usize, row: usize, width: usize, height: usize) -> Vec<f64> {
        (row..row + height)
            .flat_map(|r| {
                let start = r * self.ncols + col;
                self.samples[start..start + width].iter().copied()
            })
            .collect()
    }

    fn projection(&self) -> String {
        self.projection.clone()
    }
}

fn grid_dimension(key: &str, value: f64) -> io::Result<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value >= usize::MAX as f64 {
        return Err(invalid_data(format!(
            "`{}` must be a non-negative integer, got {}",
            key, value
        )));
    }
    Ok(value as usize)
}

/// Parses the text of an ASCII grid.
pub fn parse_ascii_grid(text: &str, projection: &str) -> io::Result<AsciiGrid> {
    let mut tokens = text.split_whitespace().peekable();
    let mut ncols = None;
    let mut nrows = None;
    let mut x = None;
    let mut y = None;
    let mut centered = false;
    let mut cellsize = None;
    let mut nodata = None;
    while let Some(key) = tokens.peek() {
        if key.parse::<f64>().is_ok() {
            break;
        }
        let key = key.to_ascii_lowercase();
        tokens.next();
        let value: f64 = tokens
            .next()
            .ok_or_else(|| invalid_data(format!("missing value for `{}`", key)))?
            .parse()
            .map_err(|_| invalid_data(format!("invalid value for `{}`", key)))?;
        match key.as_str() {
            "ncols" => ncols = Some(grid_dimension(&key, value)?),
            "nrows" => nrows = Some(grid_dimension(&key, value)?),
            "xllcorner" => x = Some(value),
            "yllcorner" => y = Some(value),
            "xllcenter" => {
                x = Some(value);
                centered = true;
            }
            "yllcenter" => {
                y = Some(value);
                centered = true;
            }
            "cellsize" => cellsize = Some(value),
            "nodata_value" => nodata = Some(value),
            other => log::debug!("ignoring ascii grid header `{}`", other),
        }
    }
    let missing = |k: &str| invalid_data(format!("ascii grid header lacks `{}`", k));
    let ncols = ncols.ok_or_else(|| missing("ncols"))?;
    let nrows = nrows.ok_or_else(|| missing("nrows"))?;
    let mut x = x.ok_or_else(|| missing("xllcorner"))?;
    let mut y = y.ok_or_else(|| missing("yllcorner"))?;
    let cellsize = cellsize.ok_or_else(|| missing("cellsize"))?;
    if centered {
        x -= cellsize / 2.0;
        y -= cellsize / 2.0;
    }
    let samples = tokens
        .map(|t| {
            let v: f64 = t
                .parse()
                .map_err(|_| invalid_data(format!("invalid sample `{}`", t)))?;
            Ok(if Some(v) == nodata { f64::NAN } else { v })
        })
        .collect::<io::Result<Vec<f64>>>()?;
    let expected = ncols
        .checked_mul(nrows)
        .ok_or_else(|| invalid_data(format!("grid of {}x{} samples is too large", ncols, nrows)))?;
    if samples.len() != expected {
        return Err(invalid_data(format!(
            "expected {} samples, found {}",
            expected,
            samples.len()
        )));
    }
    Ok(AsciiGrid {
        ncols,
        nrows,
        geo_transform: GeoTransform::north_up(x, y + nrows as f64 * cellsize, cellsize),
        samples,
        projection: projection.trim().to_string(),
    })
}

/// Reads an ASCII grid and the `.prj` file next to it, if any.
pub fn read_ascii_grid(path: &str) -> io::Result<AsciiGrid> {
    let text = read_to_string(path)?;
    let prj = Path::new(path).with_extension("prj");
    let projection = match prj.to_str() {
        Some(p) if prj.exists() => read_to_string(p)?,
        _ => String::new(),
    };
    parse_ascii_grid(&text, &projection)
}
