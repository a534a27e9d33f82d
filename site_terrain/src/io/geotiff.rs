//! GeoTIFF persistence through GDAL.

use gdal::errors::GdalError;
use gdal::raster::Buffer;
use gdal::{Dataset, DriverManager};
use log::debug;

use super::RasterIo;
use crate::error::{Result, TerrainError};
use crate::raster::{GeoTransform, RasterGrid, DEFAULT_NODATA};
use crate::Progress;

/// Reads and writes single-band Float32 GeoTIFF files.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoTiffRasterIo;

fn gdal_err(e: GdalError) -> TerrainError {
    TerrainError::Format(e.to_string())
}

impl RasterIo for GeoTiffRasterIo {
    fn read(&self, path: &str) -> Result<RasterGrid> {
        let ds = Dataset::open(path).map_err(gdal_err)?;
        let (width, height) = ds.raster_size();
        let gt = ds.geo_transform().map_err(gdal_err)?;
        let band = ds.rasterband(1).map_err(gdal_err)?;
        let nodata = band
            .no_data_value()
            .map(|v| v as f32)
            .unwrap_or(DEFAULT_NODATA);
        let buffer = band
            .read_as::<f32>((0, 0), (width, height), (width, height), None)
            .map_err(gdal_err)?;
        debug!("Loaded {}x{} GeoTIFF from {}", width, height, path);
        RasterGrid::from_cells(
            width,
            height,
            GeoTransform::from_gdal(gt),
            nodata,
            buffer.data().to_vec(),
        )
    }

    fn write_with_progress(
        &self,
        grid: &RasterGrid,
        path: &str,
        progress: Progress<'_>,
    ) -> Result<()> {
        progress(10);
        let driver = DriverManager::get_driver_by_name("GTiff").map_err(gdal_err)?;
        progress(30);
        let mut ds = driver
            .create_with_band_type::<f32, _>(path, grid.width(), grid.height(), 1)
            .map_err(gdal_err)?;
        progress(40);
        ds.set_geo_transform(&grid.transform().to_gdal())
            .map_err(gdal_err)?;
        progress(50);
        let mut band = ds.rasterband(1).map_err(gdal_err)?;
        band.set_no_data_value(Some(grid.nodata() as f64))
            .map_err(gdal_err)?;
        progress(60);
        let mut buffer = Buffer::new((grid.width(), grid.height()), grid.cells().to_vec());
        progress(70);
        band.write((0, 0), (grid.width(), grid.height()), &mut buffer)
            .map_err(gdal_err)?;
        debug!(
            "Saved {}x{} GeoTIFF to {}",
            grid.width(),
            grid.height(),
            path
        );
        progress(100);
        Ok(())
    }
}
