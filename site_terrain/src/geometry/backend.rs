//! Geometry capability used by the TIN and volume code.
//!
//! The triangulator and volume engine only talk to [`GeometryBackend`], so
//! they can be exercised against deterministic stand-ins in tests.

use super::{polygon_intersects, Point};

/// Planar geometry operations required by the pipeline.
pub trait GeometryBackend {
    /// Convex hull of `points` as a counter-clockwise ring (not closed).
    fn convex_hull(&self, points: &[Point]) -> Vec<Point>;

    /// Delaunay triangulation of `points`. Triangles are returned as
    /// coordinates; callers map them back to their own indices.
    fn delaunay(&self, points: &[Point]) -> Vec<[Point; 3]>;

    /// `true` when `point` is inside or on the boundary of `polygon`.
    fn intersects(&self, point: Point, polygon: &[Point]) -> bool;
}

/// Default backend built on `delaunator`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanarGeometry;

fn to_delaunator(points: &[Point]) -> Vec<delaunator::Point> {
    points
        .iter()
        .map(|p| delaunator::Point { x: p.x, y: p.y })
        .collect()
}

impl GeometryBackend for PlanarGeometry {
    fn convex_hull(&self, points: &[Point]) -> Vec<Point> {
        if points.len() < 3 {
            return points.to_vec();
        }
        let triangulation = delaunator::triangulate(&to_delaunator(points));
        triangulation.hull.iter().map(|&i| points[i]).collect()
    }

    fn delaunay(&self, points: &[Point]) -> Vec<[Point; 3]> {
        if points.len() < 3 {
            return Vec::new();
        }
        let triangulation = delaunator::triangulate(&to_delaunator(points));
        triangulation
            .triangles
            .chunks_exact(3)
            .map(|c| [points[c[0]], points[c[1]], points[c[2]]])
            .collect()
    }

    fn intersects(&self, point: Point, polygon: &[Point]) -> bool {
        polygon_intersects(point, polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::polygon_area;

    #[test]
    fn hull_drops_interior_points() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
            Point::new(2.0, 2.0),
            Point::new(1.0, 3.0),
        ];
        let hull = PlanarGeometry.convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point::new(2.0, 2.0)));
        assert!((polygon_area(&hull) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn delaunay_single_triangle() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(5.0, 10.0),
        ];
        let tris = PlanarGeometry.delaunay(&pts);
        assert_eq!(tris.len(), 1);
        for p in &pts {
            assert!(tris[0].contains(p));
        }
    }

    #[test]
    fn delaunay_collinear_is_empty() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
        ];
        assert!(PlanarGeometry.delaunay(&pts).is_empty());
    }
}
