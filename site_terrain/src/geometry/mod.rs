//! Planar geometry primitives and predicates used by the terrain pipeline.

pub mod backend;
pub mod point;
pub mod point3;

pub use backend::{GeometryBackend, PlanarGeometry};
pub use point::Point;
pub use point3::Point3;

/// Calculates the Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Calculates the area of a simple polygon using the shoelace formula.
pub fn polygon_area(vertices: &[Point]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..vertices.len() {
        let j = (i + 1) % vertices.len();
        sum += vertices[i].x * vertices[j].y - vertices[j].x * vertices[i].y;
    }
    sum.abs() * 0.5
}

/// Returns `ring` with its first vertex repeated at the end unless it is
/// already closed.
pub fn close_ring(ring: &[Point]) -> Vec<Point> {
    let mut closed = ring.to_vec();
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if ring.len() > 1 && first != last {
            closed.push(*first);
        }
    }
    closed
}

/// Returns `true` if point `p` is inside the polygon defined by `poly` using
/// the ray casting algorithm. Points exactly on an edge may report either way;
/// use [`polygon_intersects`] for an inclusive test.
pub fn point_in_polygon(p: Point, poly: &[Point]) -> bool {
    let mut inside = false;
    if poly.is_empty() {
        return inside;
    }
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let pi = poly[i];
        let pj = poly[j];
        if ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Returns `true` when `p` lies on the segment `a`-`b` within `tol`.
pub fn point_on_segment(a: Point, b: Point, p: Point, tol: f64) -> bool {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len2 = abx * abx + aby * aby;
    if len2 <= f64::EPSILON {
        return distance(a, p) <= tol;
    }
    let t = ((p.x - a.x) * abx + (p.y - a.y) * aby) / len2;
    let t = t.clamp(0.0, 1.0);
    let closest = Point::new(a.x + t * abx, a.y + t * aby);
    distance(closest, p) <= tol
}

/// Inclusive point/polygon test: `true` when `p` is inside `poly` or touches
/// its boundary. The ring is treated as closed.
pub fn polygon_intersects(p: Point, poly: &[Point]) -> bool {
    if poly.is_empty() {
        return false;
    }
    let scale = poly
        .iter()
        .fold(1.0_f64, |m, v| m.max(v.x.abs()).max(v.y.abs()));
    let tol = scale * 1e-12;
    let n = poly.len();
    for i in 0..n {
        if point_on_segment(poly[i], poly[(i + 1) % n], p, tol) {
            return true;
        }
    }
    point_in_polygon(p, poly)
}

/// Representation of a series of connected line segments.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Polyline {
    pub vertices: Vec<Point>,
}

impl Polyline {
    /// Creates a new polyline from a list of vertices.
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Returns the total length of all segments in the polyline.
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|pair| distance(pair[0], pair[1]))
            .sum()
    }

    /// Returns `true` when the first and last vertex coincide.
    pub fn is_closed(&self) -> bool {
        self.vertices.len() > 2 && self.vertices.first() == self.vertices.last()
    }
}
