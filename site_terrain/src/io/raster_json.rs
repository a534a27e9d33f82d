use std::fs::File;
use std::io::{BufWriter, Write};

use log::debug;

use crate::error::Result;
use crate::raster::RasterGrid;
use crate::Progress;

/// Persistence for single-band elevation rasters.
pub trait RasterIo {
    /// Loads a raster, restoring its geotransform and nodata value.
    fn read(&self, path: &str) -> Result<RasterGrid>;

    /// Stores `grid`, reporting progress at fixed milestones.
    fn write_with_progress(
        &self,
        grid: &RasterGrid,
        path: &str,
        progress: Progress<'_>,
    ) -> Result<()>;

    fn write(&self, grid: &RasterGrid, path: &str) -> Result<()> {
        self.write_with_progress(grid, path, &mut |_| {})
    }
}

/// Stores rasters as JSON documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRasterIo {
    /// Indent the output for human reading.
    pub pretty: bool,
}

impl RasterIo for JsonRasterIo {
    fn read(&self, path: &str) -> Result<RasterGrid> {
        let contents = crate::io::read_to_string(path)?;
        let raw: RasterGrid = serde_json::from_str(&contents)?;
        // re-check the cell count and nodata invariant lost by deserializing
        let grid = RasterGrid::from_cells(
            raw.width(),
            raw.height(),
            *raw.transform(),
            raw.nodata(),
            raw.cells().to_vec(),
        )?;
        debug!(
            "Loaded {}x{} raster from {}",
            grid.width(),
            grid.height(),
            path
        );
        Ok(grid)
    }

    fn write_with_progress(
        &self,
        grid: &RasterGrid,
        path: &str,
        progress: Progress<'_>,
    ) -> Result<()> {
        progress(10);
        let file = File::create(path)?;
        progress(30);
        let mut out = BufWriter::new(file);
        progress(40);
        if self.pretty {
            serde_json::to_writer_pretty(&mut out, grid)?;
        } else {
            serde_json::to_writer(&mut out, grid)?;
        }
        progress(50);
        out.flush()?;
        progress(60);
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        progress(70);
        debug!(
            "Saved {}x{} raster to {}",
            grid.width(),
            grid.height(),
            path
        );
        progress(100);
        Ok(())
    }
}
