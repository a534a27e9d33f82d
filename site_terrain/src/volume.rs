//! Cut and fill volumes against a horizontal reference plane.
//!
//! Two independent methods are provided: a raster sum over grid cells and a
//! prism sum over TIN triangles. Both report through [`VolumeResult`].

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::dtm::Tin;
use crate::error::{Result, TerrainError};
use crate::geometry::{close_ring, GeometryBackend, PlanarGeometry, Point};
use crate::raster::RasterGrid;
use crate::validation::MIN_POINTS;

/// Earthwork totals. `net` is always `cut - fill`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeResult {
    pub cut: f64,
    pub fill: f64,
    pub net: f64,
    /// Plan area that contributed, in square ground units.
    pub area: f64,
}

impl VolumeResult {
    pub fn new(cut: f64, fill: f64, area: f64) -> Self {
        Self {
            cut,
            fill,
            net: cut - fill,
            area,
        }
    }
}

/// Region restricting a grid volume computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoundaryMask {
    /// Ring used as given, closed implicitly.
    Polygon(Vec<Point>),
    /// Scattered points replaced by their convex hull.
    PointSet(Vec<Point>),
}

impl BoundaryMask {
    pub fn points(&self) -> &[Point] {
        match self {
            BoundaryMask::Polygon(p) | BoundaryMask::PointSet(p) => p,
        }
    }

    /// Closed ring to test against, or `None` for masks with fewer than three
    /// points.
    pub fn region<G: GeometryBackend>(&self, backend: &G) -> Option<Vec<Point>> {
        if self.points().len() < MIN_POINTS {
            warn!(
                "Ignoring boundary with {} points; at least {} are required",
                self.points().len(),
                MIN_POINTS
            );
            return None;
        }
        match self {
            BoundaryMask::Polygon(ring) => Some(close_ring(ring)),
            BoundaryMask::PointSet(points) => Some(close_ring(&backend.convex_hull(points))),
        }
    }
}

#[derive(Default)]
struct Totals {
    cut: f64,
    fill: f64,
    area: f64,
}

impl Totals {
    fn add(&mut self, diff: f64, area: f64) {
        if diff > 0.0 {
            self.cut += diff * area;
        } else {
            self.fill += diff.abs() * area;
        }
        self.area += area;
    }

    fn finish(self) -> VolumeResult {
        VolumeResult::new(self.cut, self.fill, self.area)
    }
}

/// Computes earthwork volumes using a [`GeometryBackend`] for boundary tests.
#[derive(Debug, Clone, Default)]
pub struct VolumeEngine<G: GeometryBackend = PlanarGeometry> {
    backend: G,
}

impl VolumeEngine<PlanarGeometry> {
    pub fn new() -> Self {
        Self {
            backend: PlanarGeometry,
        }
    }
}

impl<G: GeometryBackend> VolumeEngine<G> {
    pub fn with_backend(backend: G) -> Self {
        Self { backend }
    }

    /// Sums every elevation cell against `base_elevation`.
    ///
    /// With a boundary, a cell counts when its world coordinate touches or
    /// lies inside the region. An all-nodata grid yields a zero result.
    pub fn calculate_grid(
        &self,
        grid: &RasterGrid,
        base_elevation: f64,
        boundary: Option<&BoundaryMask>,
    ) -> Result<VolumeResult> {
        check_base(base_elevation)?;
        let region = boundary.and_then(|b| b.region(&self.backend));
        let cell_area = grid.cell_area();

        let mut totals = Totals::default();
        let mut included = 0usize;
        for (row, col, elevation) in grid.valid_cells() {
            if let Some(ring) = &region {
                if !self.backend.intersects(grid.world_coord_of(row, col), ring) {
                    continue;
                }
            }
            totals.add(elevation as f64 - base_elevation, cell_area);
            included += 1;
        }
        let result = totals.finish();
        debug!(
            "Grid volume over {} of {} cells (cell area {})",
            included,
            grid.width() * grid.height(),
            cell_area
        );
        info!(
            "Grid volume: cut {:.3}, fill {:.3}, net {:.3}, area {:.3}",
            result.cut, result.fill, result.net, result.area
        );
        Ok(result)
    }

    /// Sums vertical prisms over TIN triangles against `base_elevation`.
    ///
    /// With a boundary, a triangle counts when its centroid touches or lies
    /// inside the polygon.
    pub fn calculate_tin(
        &self,
        tin: Option<&Tin>,
        base_elevation: f64,
        boundary: Option<&[Point]>,
    ) -> Result<VolumeResult> {
        let tin = match tin {
            Some(tin) if !tin.is_empty() => tin,
            _ => return Err(TerrainError::NoTinAvailable),
        };
        check_base(base_elevation)?;
        let ring = boundary.and_then(|b| BoundaryMask::Polygon(b.to_vec()).region(&self.backend));

        let mut totals = Totals::default();
        for i in 0..tin.triangle_count() {
            let Some([a, b, c]) = tin.triangle(i) else {
                warn!("Skipping triangle {} with out-of-range vertex index", i);
                continue;
            };
            if let Some(ring) = &ring {
                let centroid = Point::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);
                if !self.backend.intersects(centroid, ring) {
                    continue;
                }
            }
            let area = ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)).abs() / 2.0;
            let avg = (a.z + b.z + c.z) / 3.0;
            totals.add(avg - base_elevation, area);
        }
        let result = totals.finish();
        info!(
            "TIN volume: cut {:.3}, fill {:.3}, net {:.3}, area {:.3}",
            result.cut, result.fill, result.net, result.area
        );
        Ok(result)
    }
}

fn check_base(base_elevation: f64) -> Result<()> {
    if base_elevation.is_finite() {
        Ok(())
    } else {
        Err(TerrainError::InvalidParameter {
            name: "base elevation",
            value: base_elevation,
        })
    }
}
