//! Orchestrator owning the current terrain artifacts.
//!
//! [`EarthworkEngine`] holds at most one raster and one TIN and routes every
//! request to the matching stateless component. Failures are returned to the
//! caller and also kept as the last error message for display.

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::contour::{Contour, ContourExtractor};
use crate::dtm::{DelaunayTriangulator, Tin, TinConfig};
use crate::error::{Result, TerrainError};
use crate::geometry::{GeometryBackend, PlanarGeometry, Point};
use crate::interpolate::{GridInterpolator, IdwConfig};
use crate::io::RasterIo;
use crate::mesh::{Mesh, MeshBuilder};
use crate::raster::{GeoTransform, IdwRasterBackend, RasterBackend, RasterGrid, DEFAULT_NODATA};
use crate::validation::{validate_points, PointRecord};
use crate::volume::{BoundaryMask, VolumeEngine, VolumeResult};
use crate::Progress;

/// Settings for every component the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub idw: IdwConfig,
    pub tin: TinConfig,
    pub nodata: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idw: IdwConfig::default(),
            tin: TinConfig::default(),
            nodata: DEFAULT_NODATA,
        }
    }
}

/// Shape and range of the current raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DtmSummary {
    pub width: usize,
    pub height: usize,
    /// `None` when every cell is nodata.
    pub min_elev: Option<f32>,
    pub max_elev: Option<f32>,
    pub transform: GeoTransform,
    pub nodata: f32,
}

impl DtmSummary {
    pub fn of(grid: &RasterGrid) -> Self {
        let range = grid.scan_min_max().ok();
        Self {
            width: grid.width(),
            height: grid.height(),
            min_elev: range.map(|r| r.0),
            max_elev: range.map(|r| r.1),
            transform: *grid.transform(),
            nodata: grid.nodata(),
        }
    }
}

/// Runs the terrain pipeline and keeps its current raster and TIN.
pub struct EarthworkEngine<R = IdwRasterBackend, G = PlanarGeometry>
where
    R: RasterBackend,
    G: GeometryBackend,
{
    config: EngineConfig,
    rasters: R,
    triangulator: DelaunayTriangulator<G>,
    volumes: VolumeEngine<G>,
    meshes: MeshBuilder,
    dtm: Option<RasterGrid>,
    tin: Option<Tin>,
    last_error: Option<String>,
}

impl EarthworkEngine {
    pub fn new(config: EngineConfig) -> Self {
        let rasters = IdwRasterBackend {
            interpolator: GridInterpolator {
                config: config.idw,
                nodata: config.nodata,
            },
            extractor: ContourExtractor,
        };
        Self::with_backends(config, rasters, PlanarGeometry, PlanarGeometry)
    }
}

impl Default for EarthworkEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<R: RasterBackend, G: GeometryBackend> EarthworkEngine<R, G> {
    /// Builds an engine over custom backends. The two geometry backends feed
    /// the triangulator and the volume engine respectively.
    pub fn with_backends(
        config: EngineConfig,
        rasters: R,
        tin_geometry: G,
        volume_geometry: G,
    ) -> Self {
        Self {
            config,
            rasters,
            triangulator: DelaunayTriangulator::with_backend(config.tin, tin_geometry),
            volumes: VolumeEngine::with_backend(volume_geometry),
            meshes: MeshBuilder,
            dtm: None,
            tin: None,
            last_error: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Message of the most recent failure, kept until the next one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            error!("{}", e);
            self.last_error = Some(e.to_string());
        }
        result
    }

    /// Interpolates a new raster from `records`, replacing the current one.
    pub fn generate_dtm(
        &mut self,
        records: &[PointRecord],
        pixel_size: f64,
    ) -> Result<DtmSummary> {
        self.generate_dtm_with_progress(records, pixel_size, &mut |_| {})
    }

    pub fn generate_dtm_with_progress(
        &mut self,
        records: &[PointRecord],
        pixel_size: f64,
        progress: Progress<'_>,
    ) -> Result<DtmSummary> {
        let result = validate_points(records)
            .and_then(|points| self.rasters.from_points(&points, pixel_size, progress));
        let grid = self.track(result)?;
        let summary = DtmSummary::of(&grid);
        info!(
            "DTM generated: {}x{} cells from {} points",
            summary.width,
            summary.height,
            records.len()
        );
        self.dtm = Some(grid);
        Ok(summary)
    }

    /// Current raster, if one has been generated or loaded.
    pub fn dtm(&self) -> Option<&RasterGrid> {
        self.dtm.as_ref()
    }

    pub fn dtm_summary(&mut self) -> Result<DtmSummary> {
        let result = self
            .dtm
            .as_ref()
            .map(DtmSummary::of)
            .ok_or(TerrainError::NoDtmAvailable);
        self.track(result)
    }

    pub fn contours(&mut self, interval: f64) -> Result<Vec<Contour>> {
        let result = match &self.dtm {
            Some(grid) => self.rasters.trace_contours(grid, interval),
            None => Err(TerrainError::NoDtmAvailable),
        };
        self.track(result)
    }

    pub fn generate_mesh(&mut self, vertical_scale: f32) -> Result<Mesh> {
        let result = match &self.dtm {
            Some(grid) => self.meshes.build(grid, vertical_scale),
            None => Err(TerrainError::NoDtmAvailable),
        };
        self.track(result)
    }

    /// Writes the current raster as an OBJ mesh.
    pub fn export_obj(&mut self, path: &str, vertical_scale: f32) -> Result<Mesh> {
        let result = match &self.dtm {
            Some(grid) => self.meshes.export_obj(grid, vertical_scale, path),
            None => Err(TerrainError::NoDtmAvailable),
        };
        self.track(result)
    }

    /// Grid-method volume of the current raster against `base_elevation`.
    pub fn calculate_volume(
        &mut self,
        base_elevation: f64,
        boundary: Option<&BoundaryMask>,
    ) -> Result<VolumeResult> {
        let result = match &self.dtm {
            Some(grid) => self.volumes.calculate_grid(grid, base_elevation, boundary),
            None => Err(TerrainError::NoDtmAvailable),
        };
        self.track(result)
    }

    /// Triangulates `records` into a new TIN and returns its triangle count.
    pub fn generate_tin(&mut self, records: &[PointRecord]) -> Result<usize> {
        let result =
            validate_points(records).and_then(|points| self.triangulator.generate(&points));
        let tin = self.track(result)?;
        let count = tin.triangle_count();
        info!("TIN generated with {} triangles", count);
        self.tin = Some(tin);
        Ok(count)
    }

    pub fn tin(&self) -> Option<&Tin> {
        self.tin.as_ref()
    }

    /// Prism-method volume of the current TIN against `base_elevation`.
    pub fn calculate_volume_tin(
        &mut self,
        base_elevation: f64,
        boundary: Option<&[Point]>,
    ) -> Result<VolumeResult> {
        let result = self
            .volumes
            .calculate_tin(self.tin.as_ref(), base_elevation, boundary);
        self.track(result)
    }

    pub fn clear_tin(&mut self) {
        self.tin = None;
    }

    /// Stores the current raster through `io`.
    pub fn save_dtm<I: RasterIo>(&mut self, io: &I, path: &str) -> Result<()> {
        self.save_dtm_with_progress(io, path, &mut |_| {})
    }

    pub fn save_dtm_with_progress<I: RasterIo>(
        &mut self,
        io: &I,
        path: &str,
        progress: Progress<'_>,
    ) -> Result<()> {
        let result = match &self.dtm {
            Some(grid) => io.write_with_progress(grid, path, progress),
            None => Err(TerrainError::NoDtmAvailable),
        };
        self.track(result)?;
        info!("DTM saved to {}", path);
        Ok(())
    }

    /// Replaces the current raster with one read through `io`.
    pub fn load_dtm<I: RasterIo>(&mut self, io: &I, path: &str) -> Result<DtmSummary> {
        let result = io.read(path);
        let grid = self.track(result)?;
        let summary = DtmSummary::of(&grid);
        info!(
            "DTM loaded from {}: {}x{} cells",
            path, summary.width, summary.height
        );
        self.dtm = Some(grid);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(z: f64) -> Vec<PointRecord> {
        vec![
            PointRecord::new(0.0, 0.0, z),
            PointRecord::new(10.0, 0.0, z),
            PointRecord::new(10.0, 10.0, z),
            PointRecord::new(0.0, 10.0, z),
        ]
    }

    #[test]
    fn requests_before_generation_fail() {
        let mut engine = EarthworkEngine::new(EngineConfig::default());
        assert!(matches!(engine.contours(1.0), Err(TerrainError::NoDtmAvailable)));
        assert!(matches!(
            engine.calculate_volume_tin(0.0, None),
            Err(TerrainError::NoTinAvailable)
        ));
        assert_eq!(engine.last_error(), Some("TIN not generated"));
    }

    #[test]
    fn generate_dtm_replaces_current_raster() {
        let mut engine = EarthworkEngine::new(EngineConfig::default());
        let first = engine.generate_dtm(&square(1.0), 1.0).unwrap();
        assert_eq!((first.width, first.height), (20, 20));
        let second = engine.generate_dtm(&square(2.0), 2.0).unwrap();
        assert_eq!((second.width, second.height), (10, 10));
        assert_eq!(engine.dtm_summary().unwrap(), second);
        let max = second.max_elev.unwrap();
        assert!((max - 2.0).abs() < 1e-5);
    }

    #[test]
    fn failed_generation_keeps_previous_raster() {
        let mut engine = EarthworkEngine::new(EngineConfig::default());
        engine.generate_dtm(&square(1.0), 1.0).unwrap();
        let err = engine.generate_dtm(&square(1.0)[..2], 1.0).unwrap_err();
        assert!(matches!(err, TerrainError::InsufficientPoints { .. }));
        assert!(engine.dtm().is_some());
        assert_eq!(engine.last_error(), Some(err.to_string().as_str()));
    }

    #[test]
    fn tin_lifecycle() {
        let mut engine = EarthworkEngine::new(EngineConfig::default());
        assert_eq!(engine.generate_tin(&square(3.0)).unwrap(), 2);
        let r = engine.calculate_volume_tin(0.0, None).unwrap();
        assert!((r.cut - 300.0).abs() < 1e-9);
        engine.clear_tin();
        assert!(engine.tin().is_none());
        assert!(engine.calculate_volume_tin(0.0, None).is_err());
    }
}
