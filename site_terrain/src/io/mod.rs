//! File input and output helpers for terrain data.

use std::fs::File;
use std::io::{self, Read, Write};

pub mod points;
pub mod raster_json;
#[cfg(feature = "gdal")]
pub mod geotiff;

#[cfg(feature = "gdal")]
pub use geotiff::GeoTiffRasterIo;
pub use points::{parse_points_csv, read_points_csv, read_points_json};
pub use raster_json::{JsonRasterIo, RasterIo};

/// Reads a file to string.
pub fn read_to_string(path: &str) -> io::Result<String> {
    let mut buffer = String::new();
    File::open(path)?.read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Writes a string to a file, replacing any existing contents.
pub fn write_string(path: &str, contents: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.flush()
}
