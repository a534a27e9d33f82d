//! Inverse distance weighted gridding of scattered survey points.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::geometry::Point3;
use crate::raster::{GeoTransform, RasterGrid, DEFAULT_NODATA};
use crate::validation::validate_point3;
use crate::Progress;

/// Upper bound on cells in a generated grid.
pub const MAX_CELLS: usize = 200_000_000;

/// IDW interpolation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdwConfig {
    /// Distance exponent.
    pub power: f64,
    /// Added to `distance^power` before inversion.
    pub smoothing: f64,
    /// Expansion of the point bounding box on every side, in ground units.
    pub margin: f64,
}

impl Default for IdwConfig {
    fn default() -> Self {
        Self {
            power: 2.0,
            smoothing: 1.0,
            margin: 5.0,
        }
    }
}

impl IdwConfig {
    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }
}

/// Interpolates the elevation at `(x, y)` from `points`.
///
/// A point at distance zero is returned verbatim. `None` when no point
/// carries weight.
pub fn idw_at(points: &[Point3], x: f64, y: f64, config: &IdwConfig) -> Option<f64> {
    let mut weight_sum = 0.0;
    let mut value_sum = 0.0;
    for p in points {
        let d = (p.x - x).hypot(p.y - y);
        if d == 0.0 {
            return Some(p.z);
        }
        let w = 1.0 / (d.powf(config.power) + config.smoothing);
        if w.is_finite() {
            weight_sum += w;
            value_sum += w * p.z;
        }
    }
    if weight_sum > 0.0 {
        Some(value_sum / weight_sum)
    } else {
        None
    }
}

/// Turns a point set into a regular elevation grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridInterpolator {
    pub config: IdwConfig,
    pub nodata: f32,
}

impl Default for GridInterpolator {
    fn default() -> Self {
        Self {
            config: IdwConfig::default(),
            nodata: DEFAULT_NODATA,
        }
    }
}

impl GridInterpolator {
    pub fn new(config: IdwConfig) -> Self {
        Self {
            config,
            nodata: DEFAULT_NODATA,
        }
    }

    /// Generates a grid with `pixel_size` ground units per cell.
    pub fn generate(&self, points: &[Point3], pixel_size: f64) -> Result<RasterGrid> {
        self.generate_with_progress(points, pixel_size, &mut |_| {})
    }

    /// Same as [`generate`](Self::generate), reporting progress at fixed
    /// milestones between 10 and 100.
    pub fn generate_with_progress(
        &self,
        points: &[Point3],
        pixel_size: f64,
        progress: Progress<'_>,
    ) -> Result<RasterGrid> {
        validate_point3(points)?;
        if !(pixel_size > 0.0 && pixel_size.is_finite()) {
            return Err(TerrainError::InvalidParameter {
                name: "pixel size",
                value: pixel_size,
            });
        }
        progress(10);
        debug!(
            "Generating DTM with {} points, pixel size {}",
            points.len(),
            pixel_size
        );

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        progress(30);

        let margin = self.config.margin.max(0.0);
        min_x -= margin;
        min_y -= margin;
        max_x += margin;
        max_y += margin;
        progress(40);

        let cols = ((max_x - min_x) / pixel_size).floor().max(1.0);
        let rows = ((max_y - min_y) / pixel_size).floor().max(1.0);
        if !(cols.is_finite() && rows.is_finite()) || cols * rows > MAX_CELLS as f64 {
            return Err(TerrainError::InterpolationFailure(format!(
                "grid of {cols}x{rows} cells exceeds the {MAX_CELLS} cell limit"
            )));
        }
        let (cols, rows) = (cols as usize, rows as usize);
        if cols == 0 && rows == 0 {
            return Err(TerrainError::InterpolationFailure(
                "grid dimensions collapsed to zero".into(),
            ));
        }
        progress(50);

        let mut pixel_width = (max_x - min_x) / cols as f64;
        let mut pixel_height = (max_y - min_y) / rows as f64;
        if pixel_width <= 0.0 {
            pixel_width = pixel_size;
        }
        if pixel_height <= 0.0 {
            pixel_height = pixel_size;
        }
        let transform = GeoTransform::new(min_x, min_y, pixel_width, pixel_height);
        let mut grid = RasterGrid::new(cols, rows, transform, self.nodata)?;
        progress(60);

        progress(70);
        for row in 0..rows {
            for col in 0..cols {
                let c = grid.cell_center(row, col);
                let z = idw_at(points, c.x, c.y, &self.config)
                    .map(|z| z as f32)
                    .unwrap_or(self.nodata);
                grid.set_cell(row, col, z)?;
            }
        }
        progress(100);

        debug!(
            "DTM generated: {}x{} cells, bounds [{}, {}] to [{}, {}]",
            cols, rows, min_x, min_y, max_x, max_y
        );
        Ok(grid)
    }
}
