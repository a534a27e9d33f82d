use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::geometry::{GeometryBackend, PlanarGeometry, Point, Point3};
use crate::validation::validate_point3;

/// Triangulated Irregular Network constructed from 3D points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tin {
    /// Vertices of the TIN, in the order the points were supplied.
    pub vertices: Vec<Point3>,
    /// Indices into `vertices` forming triangles.
    pub triangles: Vec<[usize; 3]>,
}

impl Tin {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Triangle indices as one flat list, three per triangle.
    pub fn flattened_indices(&self) -> Vec<usize> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Vertices of triangle `i`.
    pub fn triangle(&self, i: usize) -> Option<[Point3; 3]> {
        let t = self.triangles.get(i)?;
        Some([
            *self.vertices.get(t[0])?,
            *self.vertices.get(t[1])?,
            *self.vertices.get(t[2])?,
        ])
    }
}

/// TIN construction settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TinConfig {
    /// Maximum x and y offset when matching triangulated coordinates back to
    /// input points.
    pub tolerance: f64,
}

impl Default for TinConfig {
    fn default() -> Self {
        Self { tolerance: 1e-3 }
    }
}

/// Builds a [`Tin`] through a [`GeometryBackend`].
#[derive(Debug, Clone, Default)]
pub struct DelaunayTriangulator<G: GeometryBackend = PlanarGeometry> {
    pub config: TinConfig,
    backend: G,
}

impl DelaunayTriangulator<PlanarGeometry> {
    pub fn new(config: TinConfig) -> Self {
        Self {
            config,
            backend: PlanarGeometry,
        }
    }
}

impl<G: GeometryBackend> DelaunayTriangulator<G> {
    pub fn with_backend(config: TinConfig, backend: G) -> Self {
        Self { config, backend }
    }

    /// Triangulates `points` in plan and keeps their elevations.
    ///
    /// Triangles whose corners cannot be matched to an input point within the
    /// configured tolerance are dropped with a warning.
    pub fn generate(&self, points: &[Point3]) -> Result<Tin> {
        validate_point3(points)?;
        let plan: Vec<Point> = points.iter().map(|p| p.xy()).collect();
        let raw = self.backend.delaunay(&plan);
        debug!(
            "Delaunay backend returned {} triangles for {} points",
            raw.len(),
            points.len()
        );

        let mut triangles = Vec::with_capacity(raw.len());
        let mut dropped = 0usize;
        for corners in &raw {
            match self.reconcile(&plan, corners) {
                Some(tri) => triangles.push(tri),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(
                "Dropped {} of {} triangles that did not match input points within {}",
                dropped,
                raw.len(),
                self.config.tolerance
            );
        }
        if triangles.is_empty() {
            return Err(TerrainError::DegenerateInput(format!(
                "triangulation of {} points produced no triangles",
                points.len()
            )));
        }
        debug!("TIN generated with {} triangles", triangles.len());
        Ok(Tin {
            vertices: points.to_vec(),
            triangles,
        })
    }

    fn reconcile(&self, plan: &[Point], corners: &[Point; 3]) -> Option<[usize; 3]> {
        let mut tri = [0usize; 3];
        for (slot, corner) in tri.iter_mut().zip(corners) {
            *slot = match find_vertex(plan, *corner, self.config.tolerance) {
                Some(i) => i,
                None => {
                    warn!(
                        "No input point within {} of triangle corner ({}, {})",
                        self.config.tolerance, corner.x, corner.y
                    );
                    return None;
                }
            };
        }
        if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
            warn!(
                "Triangle corners collapsed onto vertices {:?} during matching",
                tri
            );
            return None;
        }
        Some(tri)
    }
}

/// First input point within `tol` of `p` in both x and y.
fn find_vertex(plan: &[Point], p: Point, tol: f64) -> Option<usize> {
    plan.iter()
        .position(|q| (q.x - p.x).abs() <= tol && (q.y - p.y).abs() <= tol)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_b() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(5.0, 10.0, 10.0),
        ]
    }

    /// Returns the real triangulation with corners reversed and nudged.
    struct Shuffled(f64);

    impl GeometryBackend for Shuffled {
        fn convex_hull(&self, points: &[Point]) -> Vec<Point> {
            PlanarGeometry.convex_hull(points)
        }

        fn delaunay(&self, points: &[Point]) -> Vec<[Point; 3]> {
            PlanarGeometry
                .delaunay(points)
                .into_iter()
                .rev()
                .map(|[a, b, c]| {
                    let nudge = |p: Point| Point::new(p.x + self.0, p.y - self.0);
                    [nudge(c), nudge(a), nudge(b)]
                })
                .collect()
        }

        fn intersects(&self, point: Point, polygon: &[Point]) -> bool {
            PlanarGeometry.intersects(point, polygon)
        }
    }

    #[test]
    fn single_triangle_keeps_all_vertices() {
        let tin = DelaunayTriangulator::new(TinConfig::default()).generate(&scenario_b()).unwrap();
        assert_eq!(tin.triangle_count(), 1);
        let mut idx = tin.triangles[0].to_vec();
        idx.sort();
        assert_eq!(idx, vec![0, 1, 2]);
        assert_eq!(tin.vertices, scenario_b());
    }

    #[test]
    fn square_has_two_triangles_and_valid_indices() {
        let pts = vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let tin = DelaunayTriangulator::new(TinConfig::default()).generate(&pts).unwrap();
        assert_eq!(tin.triangle_count(), 2);
        let flat = tin.flattened_indices();
        assert_eq!(flat.len(), tin.triangle_count() * 3);
        assert!(flat.iter().all(|&i| i < tin.vertices.len()));
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let pts: Vec<Point3> = (0..5)
            .map(|i| Point3::new(i as f64, 2.0 * i as f64, 1.0))
            .collect();
        let err = DelaunayTriangulator::new(TinConfig::default()).generate(&pts).unwrap_err();
        assert!(matches!(err, TerrainError::DegenerateInput(_)));
    }

    #[test]
    fn fewer_than_three_points_rejected() {
        let err = DelaunayTriangulator::new(TinConfig::default())
            .generate(&scenario_b()[..2])
            .unwrap_err();
        assert!(matches!(
            err,
            TerrainError::InsufficientPoints {
                count: 2,
                required: 3
            }
        ));
    }

    #[test]
    fn non_finite_coordinates_rejected() {
        let mut pts = scenario_b();
        pts.push(Point3::new(f64::NAN, 1.0, 1.0));
        let err = DelaunayTriangulator::new(TinConfig::default())
            .generate(&pts)
            .unwrap_err();
        assert!(matches!(err, TerrainError::NonFiniteCoordinate { index: 3 }));
    }

    #[test]
    fn reordered_backend_output_is_matched_within_tolerance() {
        let pts = vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(4.0, 0.0, 2.0),
            Point3::new(4.0, 3.0, 3.0),
            Point3::new(0.0, 3.0, 4.0),
            Point3::new(2.0, 1.0, 5.0),
        ];
        let plain = DelaunayTriangulator::new(TinConfig::default()).generate(&pts).unwrap();
        let tri = DelaunayTriangulator::with_backend(TinConfig::default(), Shuffled(5e-4));
        let shuffled = tri.generate(&pts).unwrap();
        assert_eq!(shuffled.triangle_count(), plain.triangle_count());
        let canon = |tin: &Tin| {
            let mut v: Vec<Vec<usize>> = tin
                .triangles
                .iter()
                .map(|t| {
                    let mut t = t.to_vec();
                    t.sort();
                    t
                })
                .collect();
            v.sort();
            v
        };
        assert_eq!(canon(&shuffled), canon(&plain));
    }

    #[test]
    fn corners_beyond_tolerance_are_dropped() {
        let tri = DelaunayTriangulator::with_backend(TinConfig::default(), Shuffled(0.01));
        let err = tri.generate(&scenario_b()).unwrap_err();
        assert!(matches!(err, TerrainError::DegenerateInput(_)));
    }

    #[test]
    fn closely_spaced_points_collapse_to_first_match() {
        // Two points 1e-4 apart: the second is shadowed by the first, so
        // every triangle using it collapses and is dropped.
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(5.0, 10.0, 10.0),
            Point3::new(5.0, 3.0, 1.0),
            Point3::new(5.0001, 3.0, 2.0),
        ];
        let tin = DelaunayTriangulator::new(TinConfig::default()).generate(&pts).unwrap();
        assert!(tin.triangles.iter().all(|t| !t.contains(&4)));
        for t in &tin.triangles {
            assert!(t[0] != t[1] && t[1] != t[2] && t[0] != t[2]);
        }
        let raw = PlanarGeometry.delaunay(&pts.iter().map(|p| p.xy()).collect::<Vec<_>>());
        assert!(tin.triangle_count() < raw.len());
    }
}
