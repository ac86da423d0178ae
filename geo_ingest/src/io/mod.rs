//! File input and output helpers for geodata extracts.

use std::fs::File;
use std::io::{self, Read};

pub mod asc;
pub mod geojson;
pub mod osm;

pub use asc::{parse_ascii_grid, read_ascii_grid, AsciiGrid};
pub use self::geojson::{read_geojson_features, result_to_geojson, write_result_geojson};
pub use osm::{parse_osm_xml, read_osm_xml, OsmExtract};

/// Reads a file to string.
pub fn read_to_string(path: &str) -> io::Result<String> {
    let mut buffer = String::new();
    File::open(path)?.read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Writes a string to a file, replacing its contents.
pub fn write_string(path: &str, contents: &str) -> io::Result<()> {
    std::fs::write(path, contents)
}

pub(crate) fn invalid_data<E>(e: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, e)
}
