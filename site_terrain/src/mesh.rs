//! Renderable surface mesh derived from a raster, with Wavefront OBJ output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, info};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::raster::RasterGrid;

/// Colour used for nodata cells and flat surfaces.
pub const NODATA_GRAY: [f32; 3] = [0.5, 0.5, 0.5];

/// Triangle mesh with one vertex per raster cell. All buffers are flattened.
///
/// Positions are Y-up: X follows columns, Z follows rows and Y carries the
/// scaled elevation. The grid is centred on the origin in X and Z.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    pub indices: Vec<u32>,
    pub width: usize,
    pub height: usize,
    pub min_elev: f32,
    pub max_elev: f32,
    pub vertical_scale: f32,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Writes the mesh as ASCII OBJ with per-vertex colours.
    ///
    /// Z is negated relative to the in-memory mesh and faces use 1-based
    /// indices.
    pub fn write_obj<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "# Wavefront OBJ file")?;
        writeln!(out, "# Generated by site_terrain")?;
        writeln!(out, "# Vertices: {}", self.vertex_count())?;
        writeln!(
            out,
            "# Elevation range: {}m - {}m",
            self.min_elev, self.max_elev
        )?;
        writeln!(out, "# Vertical scale: {}x", self.vertical_scale)?;
        writeln!(out)?;

        writeln!(out, "# Vertices")?;
        for (p, c) in self.vertices.chunks_exact(3).zip(self.colors.chunks_exact(3)) {
            writeln!(
                out,
                "v {:.3} {:.3} {:.3} {:.3} {:.3} {:.3}",
                p[0], p[1], -p[2], c[0], c[1], c[2]
            )?;
        }

        writeln!(out)?;
        writeln!(out, "# Faces")?;
        for f in self.indices.chunks_exact(3) {
            writeln!(out, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Four-band colour ramp, blue through cyan, green and yellow to red.
///
/// `None` marks nodata. A degenerate range gives [`NODATA_GRAY`].
pub fn elevation_color(elevation: Option<f32>, min_elev: f32, max_elev: f32) -> [f32; 3] {
    let Some(elevation) = elevation else {
        return NODATA_GRAY;
    };
    let range = max_elev - min_elev;
    if !(range > 0.0) {
        return NODATA_GRAY;
    }
    let n = ((elevation - min_elev) / range).clamp(0.0, 1.0);
    if n < 0.25 {
        [0.0, n * 4.0, 1.0]
    } else if n < 0.5 {
        [0.0, 1.0, 1.0 - (n - 0.25) * 4.0]
    } else if n < 0.75 {
        [(n - 0.5) * 4.0, 1.0, 0.0]
    } else {
        [1.0, 1.0 - (n - 0.75) * 4.0, 0.0]
    }
}

/// Builds [`Mesh`] values from rasters.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshBuilder;

impl MeshBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds a mesh with elevations multiplied by `vertical_scale`.
    pub fn build(&self, grid: &RasterGrid, vertical_scale: f32) -> Result<Mesh> {
        if !vertical_scale.is_finite() {
            return Err(TerrainError::InvalidParameter {
                name: "vertical scale",
                value: vertical_scale as f64,
            });
        }
        let (width, height) = (grid.width(), grid.height());
        if width == 0 || height == 0 || grid.cells().len() != width * height {
            return Err(TerrainError::InvalidInput(format!(
                "cannot build a mesh from a {width}x{height} raster"
            )));
        }
        if u32::try_from(width * height).is_err() {
            return Err(TerrainError::InvalidInput(format!(
                "{width}x{height} raster exceeds 32-bit mesh indices"
            )));
        }
        let (min_elev, max_elev) = grid.scan_min_max()?;
        debug!("Generating 3D mesh from DTM: {}x{}", width, height);

        let gt = grid.transform();
        let pixel_width = gt.pixel_width.abs();
        let pixel_height = gt.pixel_height.abs();
        let centre_x = (width - 1) as f64 * pixel_width / 2.0;
        let centre_z = (height - 1) as f64 * pixel_height / 2.0;

        let count = width * height;
        let mut vertices = Vec::with_capacity(count * 3);
        let mut colors = Vec::with_capacity(count * 3);
        for row in 0..height {
            for col in 0..width {
                let elevation = grid.elevation_at(row, col);
                let x = (col as f64 * pixel_width - centre_x) as f32;
                let z = (row as f64 * pixel_height - centre_z) as f32;
                let y = elevation.unwrap_or(min_elev) * vertical_scale;
                vertices.extend_from_slice(&[x, y, z]);
                colors.extend_from_slice(&elevation_color(elevation, min_elev, max_elev));
            }
        }

        let mut indices = Vec::with_capacity(6 * (width - 1) * (height - 1));
        for row in 0..height - 1 {
            for col in 0..width - 1 {
                let top_left = (row * width + col) as u32;
                let top_right = top_left + 1;
                let bottom_left = ((row + 1) * width + col) as u32;
                let bottom_right = bottom_left + 1;
                indices.extend_from_slice(&[top_left, bottom_left, top_right]);
                indices.extend_from_slice(&[top_right, bottom_left, bottom_right]);
            }
        }

        let normals = vertex_normals(&vertices, &indices);
        let mesh = Mesh {
            vertices,
            normals,
            colors,
            indices,
            width,
            height,
            min_elev,
            max_elev,
            vertical_scale,
        };
        debug!(
            "3D mesh generated: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    /// Builds the mesh for `grid` and writes it to `path` as OBJ.
    pub fn export_obj<P: AsRef<Path>>(
        &self,
        grid: &RasterGrid,
        vertical_scale: f32,
        path: P,
    ) -> Result<Mesh> {
        let mesh = self.build(grid, vertical_scale)?;
        let file = File::create(path.as_ref())?;
        mesh.write_obj(BufWriter::new(file))?;
        info!(
            "OBJ export successful: {} vertices, {} triangles to {}",
            mesh.vertex_count(),
            mesh.triangle_count(),
            path.as_ref().display()
        );
        Ok(mesh)
    }
}

/// Area-weighted vertex normals: unnormalised face normals are summed per
/// vertex, then normalised. Vertices with a zero sum keep a zero normal.
fn vertex_normals(vertices: &[f32], indices: &[u32]) -> Vec<f32> {
    let position = |i: u32| {
        let i = i as usize * 3;
        Vector3::new(vertices[i], vertices[i + 1], vertices[i + 2])
    };
    let mut acc = vec![Vector3::<f32>::zeros(); vertices.len() / 3];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (position(tri[0]), position(tri[1]), position(tri[2]));
        let face = (b - a).cross(&(c - a));
        for &i in tri {
            acc[i as usize] += face;
        }
    }
    acc.into_iter()
        .flat_map(|n| {
            let n = n
                .try_normalize(0.0)
                .filter(|n| n.iter().all(|v| v.is_finite()))
                .unwrap_or_else(Vector3::zeros);
            [n.x, n.y, n.z]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{GeoTransform, DEFAULT_NODATA};

    fn grid(width: usize, height: usize, cells: Vec<f32>) -> RasterGrid {
        RasterGrid::from_cells(
            width,
            height,
            GeoTransform::new(0.0, 0.0, 2.0, 2.0),
            DEFAULT_NODATA,
            cells,
        )
        .unwrap()
    }

    #[test]
    fn color_bands() {
        assert_eq!(elevation_color(Some(0.0), 0.0, 1.0), [0.0, 0.0, 1.0]);
        assert_eq!(elevation_color(Some(0.25), 0.0, 1.0), [0.0, 1.0, 1.0]);
        assert_eq!(elevation_color(Some(0.5), 0.0, 1.0), [0.0, 1.0, 0.0]);
        assert_eq!(elevation_color(Some(0.75), 0.0, 1.0), [1.0, 1.0, 0.0]);
        assert_eq!(elevation_color(Some(1.0), 0.0, 1.0), [1.0, 0.0, 0.0]);
        assert_eq!(elevation_color(None, 0.0, 1.0), NODATA_GRAY);
        assert_eq!(elevation_color(Some(3.0), 3.0, 3.0), NODATA_GRAY);
    }

    #[test]
    fn flat_grid_has_upward_normals() {
        let mesh = MeshBuilder.build(&grid(3, 3, vec![4.0; 9]), 1.0).unwrap();
        assert_eq!(mesh.vertex_count(), 9);
        assert_eq!(mesh.indices.len(), 6 * 2 * 2);
        for n in mesh.normals.chunks_exact(3) {
            assert!(n[0].abs() < 1e-6);
            assert!((n[1] - 1.0).abs() < 1e-6);
            assert!(n[2].abs() < 1e-6);
        }
        assert!(mesh.colors.iter().all(|&c| c == 0.5));
    }

    #[test]
    fn vertices_centred_and_scaled() {
        let mesh = MeshBuilder
            .build(&grid(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), 2.0)
            .unwrap();
        // extents 4 x 2 centred on the origin
        assert_eq!(&mesh.vertices[0..3], &[-2.0, 2.0, -1.0]);
        assert_eq!(&mesh.vertices[15..18], &[2.0, 12.0, 1.0]);
        assert_eq!(mesh.min_elev, 1.0);
        assert_eq!(mesh.max_elev, 6.0);
        assert_eq!(&mesh.indices[0..6], &[0, 3, 1, 1, 3, 4]);
    }

    #[test]
    fn nodata_sits_at_min_and_is_gray() {
        let mesh = MeshBuilder
            .build(&grid(2, 2, vec![DEFAULT_NODATA, 1.0, 2.0, 3.0]), 1.0)
            .unwrap();
        assert_eq!(mesh.vertices[1], 1.0);
        assert_eq!(&mesh.colors[0..3], &NODATA_GRAY);
    }

    #[test]
    fn normals_unit_or_zero() {
        let single_row = MeshBuilder.build(&grid(3, 1, vec![1.0, 5.0, 2.0]), 1.0).unwrap();
        assert!(single_row.indices.is_empty());
        assert!(single_row.normals.iter().all(|&v| v == 0.0));

        let rough = MeshBuilder
            .build(&grid(3, 3, vec![0.0, 3.0, 1.0, 7.0, 2.0, 9.0, 4.0, 4.0, 0.5]), 1.5)
            .unwrap();
        for n in rough.normals.chunks_exact(3) {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-5 || len == 0.0);
        }
    }

    #[test]
    fn obj_negates_z_and_uses_one_based_faces() {
        let mesh = MeshBuilder.build(&grid(2, 2, vec![0.0, 1.0, 2.0, 3.0]), 1.0).unwrap();
        let mut buf = Vec::new();
        mesh.write_obj(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("# Wavefront OBJ file\n"));
        assert!(text.contains("# Vertices: 4\n"));
        assert!(text.contains("v -1.000 0.000 1.000 0.000 0.000 1.000\n"));
        assert!(text.contains("f 1 3 2\nf 2 3 4\n"));
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 4);
    }

    #[test]
    fn all_nodata_rejected() {
        let err = MeshBuilder
            .build(&grid(2, 2, vec![DEFAULT_NODATA; 4]), 1.0)
            .unwrap_err();
        assert!(matches!(err, TerrainError::AllNodata));
    }

    #[test]
    fn non_finite_scale_rejected() {
        let g = grid(2, 2, vec![0.0, 1.0, 2.0, 3.0]);
        for scale in [f32::NAN, f32::INFINITY] {
            assert!(matches!(
                MeshBuilder.build(&g, scale),
                Err(TerrainError::InvalidParameter {
                    name: "vertical scale",
                    ..
                })
            ));
        }
    }

    #[test]
    fn overflowing_heights_give_zero_normals() {
        let mesh = MeshBuilder
            .build(&grid(2, 2, vec![0.0, 1.0, 2.0, 3.0e30]), 1.0e10)
            .unwrap();
        for n in mesh.normals.chunks_exact(3) {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!(n.iter().all(|v| v.is_finite()));
            assert!(len == 0.0 || (len - 1.0).abs() < 1e-5);
        }
    }
}
