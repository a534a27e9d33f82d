//! Terrain products from survey point clouds: IDW elevation grids, contours,
//! TINs, cut/fill volumes and OBJ meshes.

pub mod contour;
pub mod dtm;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod interpolate;
pub mod io;
pub mod mesh;
pub mod raster;
pub mod validation;
pub mod volume;

pub use contour::{Contour, ContourExtractor};
pub use dtm::{DelaunayTriangulator, Tin, TinConfig};
pub use engine::{DtmSummary, EarthworkEngine, EngineConfig};
pub use error::{ErrorKind, Result, TerrainError};
pub use geometry::{GeometryBackend, PlanarGeometry, Point, Point3, Polyline};
pub use interpolate::{GridInterpolator, IdwConfig};
pub use mesh::{Mesh, MeshBuilder};
pub use raster::{GeoTransform, IdwRasterBackend, RasterBackend, RasterGrid, DEFAULT_NODATA};
pub use validation::{validate_points, PointRecord};
pub use volume::{BoundaryMask, VolumeEngine, VolumeResult};

/// Progress callback receiving a percentage at fixed milestones.
pub type Progress<'a> = &'a mut dyn FnMut(u8);
