//! Regular elevation grid with an affine geotransform.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::contour::{Contour, ContourExtractor};
use crate::error::{Result, TerrainError};
use crate::geometry::{Point, Point3};
use crate::interpolate::GridInterpolator;
use crate::Progress;

/// Nodata sentinel written by the interpolator and raster writers.
pub const DEFAULT_NODATA: f32 = -9999.0;

/// Affine mapping from raster (row, col) to world (x, y).
///
/// `x = origin_x + col * pixel_width + row * rotation_x`
/// `y = origin_y + col * rotation_y + row * pixel_height`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub rotation_x: f64,
    pub rotation_y: f64,
}

impl GeoTransform {
    /// North-aligned transform with no rotation terms.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            rotation_x: 0.0,
            rotation_y: 0.0,
        }
    }

    /// Builds a transform from the six GDAL coefficients.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            origin_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            origin_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    /// Returns the coefficients in GDAL order.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.rotation_x,
            self.origin_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Maps fractional raster coordinates to world coordinates.
    pub fn apply(&self, col: f64, row: f64) -> Point {
        Point::new(
            self.origin_x + col * self.pixel_width + row * self.rotation_x,
            self.origin_y + col * self.rotation_y + row * self.pixel_height,
        )
    }

    /// Ground area covered by one cell.
    pub fn cell_area(&self) -> f64 {
        (self.pixel_width * self.pixel_height).abs()
    }
}

/// Single-band elevation raster stored row-major.
///
/// Every cell holds either a finite elevation or exactly `nodata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterGrid {
    width: usize,
    height: usize,
    transform: GeoTransform,
    nodata: f32,
    cells: Vec<f32>,
}

/// A non-finite nodata value never compares equal to a cell, so it is
/// replaced by [`DEFAULT_NODATA`].
fn sentinel(nodata: f32) -> f32 {
    if nodata.is_finite() {
        nodata
    } else {
        debug!("Non-finite nodata {} replaced by {}", nodata, DEFAULT_NODATA);
        DEFAULT_NODATA
    }
}

impl RasterGrid {
    /// Creates a grid where every cell is nodata.
    pub fn new(width: usize, height: usize, transform: GeoTransform, nodata: f32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TerrainError::InvalidInput(format!(
                "raster dimensions must be positive, got {width}x{height}"
            )));
        }
        let nodata = sentinel(nodata);
        Ok(Self {
            width,
            height,
            transform,
            nodata,
            cells: vec![nodata; width * height],
        })
    }

    /// Wraps existing cell values. Non-finite values are stored as nodata.
    pub fn from_cells(
        width: usize,
        height: usize,
        transform: GeoTransform,
        nodata: f32,
        cells: Vec<f32>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TerrainError::InvalidInput(format!(
                "raster dimensions must be positive, got {width}x{height}"
            )));
        }
        if cells.len() != width * height {
            return Err(TerrainError::InvalidInput(format!(
                "cell count mismatch: expected {}, got {}",
                width * height,
                cells.len()
            )));
        }
        let nodata = sentinel(nodata);
        let cells = cells
            .into_iter()
            .map(|v| if v.is_finite() { v } else { nodata })
            .collect();
        Ok(Self {
            width,
            height,
            transform,
            nodata,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn nodata(&self) -> f32 {
        self.nodata
    }

    /// Row-major cell values.
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub fn is_nodata(&self, value: f32) -> bool {
        value == self.nodata
    }

    /// Raw cell value, nodata included. `None` outside the grid.
    pub fn cell_at(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.height && col < self.width {
            Some(self.cells[row * self.width + col])
        } else {
            None
        }
    }

    /// Elevation of a cell, `None` for nodata or out-of-range cells.
    pub fn elevation_at(&self, row: usize, col: usize) -> Option<f32> {
        self.cell_at(row, col).filter(|v| !self.is_nodata(*v))
    }

    /// Writes a cell. Non-finite values are stored as nodata.
    pub fn set_cell(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        if row >= self.height || col >= self.width {
            return Err(TerrainError::InvalidInput(format!(
                "cell ({row}, {col}) outside {}x{} raster",
                self.width, self.height
            )));
        }
        self.cells[row * self.width + col] = if value.is_finite() { value } else { self.nodata };
        Ok(())
    }

    /// World coordinate of the cell's origin corner.
    pub fn world_coord_of(&self, row: usize, col: usize) -> Point {
        self.transform.apply(col as f64, row as f64)
    }

    /// World coordinate of the cell centre.
    pub fn cell_center(&self, row: usize, col: usize) -> Point {
        self.transform.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    pub fn cell_area(&self) -> f64 {
        self.transform.cell_area()
    }

    /// Minimum and maximum elevation ignoring nodata.
    pub fn scan_min_max(&self) -> Result<(f32, f32)> {
        let mut range: Option<(f32, f32)> = None;
        for &v in &self.cells {
            if self.is_nodata(v) {
                continue;
            }
            range = Some(match range {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        range.ok_or(TerrainError::AllNodata)
    }

    /// Number of cells holding an elevation.
    pub fn valid_cell_count(&self) -> usize {
        self.cells.iter().filter(|v| !self.is_nodata(**v)).count()
    }

    /// Iterates `(row, col, elevation)` over cells holding an elevation.
    pub fn valid_cells(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, v)| !self.is_nodata(**v))
            .map(|(i, &v)| (i / self.width, i % self.width, v))
    }

    /// Axis-aligned world bounds of the full raster footprint.
    pub fn extent(&self) -> (Point, Point) {
        let corners = [
            self.transform.apply(0.0, 0.0),
            self.transform.apply(self.width as f64, 0.0),
            self.transform.apply(0.0, self.height as f64),
            self.transform.apply(self.width as f64, self.height as f64),
        ];
        let mut min = corners[0];
        let mut max = corners[0];
        for c in &corners[1..] {
            min.x = min.x.min(c.x);
            min.y = min.y.min(c.y);
            max.x = max.x.max(c.x);
            max.y = max.y.max(c.y);
        }
        (min, max)
    }
}

/// Raster production, cell access and contour tracing capability.
///
/// Volume and mesh code only consume [`RasterGrid`] values, so any backend
/// that fills a grid can be swapped in. Cell access defaults to the grid's
/// own storage.
pub trait RasterBackend {
    /// Fills a new raster from scattered points.
    fn from_points(
        &self,
        points: &[Point3],
        pixel_size: f64,
        progress: Progress<'_>,
    ) -> Result<RasterGrid>;

    /// Traces iso-elevation lines at every multiple of `interval`.
    fn trace_contours(&self, grid: &RasterGrid, interval: f64) -> Result<Vec<Contour>>;

    /// Raw value of one cell, nodata included.
    fn read_cell(&self, grid: &RasterGrid, row: usize, col: usize) -> Option<f32> {
        grid.cell_at(row, col)
    }

    fn write_cell(&self, grid: &mut RasterGrid, row: usize, col: usize, value: f32) -> Result<()> {
        grid.set_cell(row, col, value)
    }
}

/// Backend pairing inverse-distance interpolation with marching squares.
#[derive(Debug, Default, Clone)]
pub struct IdwRasterBackend {
    pub interpolator: GridInterpolator,
    pub extractor: ContourExtractor,
}

impl RasterBackend for IdwRasterBackend {
    fn from_points(
        &self,
        points: &[Point3],
        pixel_size: f64,
        progress: Progress<'_>,
    ) -> Result<RasterGrid> {
        self.interpolator
            .generate_with_progress(points, pixel_size, progress)
    }

    fn trace_contours(&self, grid: &RasterGrid, interval: f64) -> Result<Vec<Contour>> {
        self.extractor.extract(grid, interval)
    }
}
