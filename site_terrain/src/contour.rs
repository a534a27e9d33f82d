//! Iso-elevation tracing over a raster using marching squares.
//!
//! Samples are taken at cell centres. A square whose four corners are all
//! elevations contributes at most two segments per level; squares touching a
//! nodata cell are skipped. Segment ends are keyed by the grid edge they lie
//! on, so neighbouring squares share vertices exactly and chains can be joined
//! without a distance tolerance.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::geometry::{Point, Polyline};
use crate::raster::RasterGrid;

/// Upper bound on the number of levels traced in one call.
pub const MAX_LEVELS: usize = 100_000;

/// A single iso-elevation line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    pub elevation: f64,
    /// Vertices in world coordinates. Closed rings repeat their first vertex.
    pub polyline: Polyline,
    pub closed: bool,
}

/// Grid edge between two neighbouring cell centres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EdgeKey {
    /// Between `(row, col)` and `(row, col + 1)`.
    Horizontal(usize, usize),
    /// Between `(row, col)` and `(row + 1, col)`.
    Vertical(usize, usize),
}

impl EdgeKey {
    fn ends(self) -> ((usize, usize), (usize, usize)) {
        match self {
            EdgeKey::Horizontal(r, c) => ((r, c), (r, c + 1)),
            EdgeKey::Vertical(r, c) => ((r, c), (r + 1, c)),
        }
    }
}

/// Extracts contours from a [`RasterGrid`].
#[derive(Debug, Default, Clone)]
pub struct ContourExtractor;

impl ContourExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Traces contours at every multiple of `interval` within the grid's
    /// elevation range. An empty result is valid.
    pub fn extract(&self, grid: &RasterGrid, interval: f64) -> Result<Vec<Contour>> {
        if !(interval > 0.0 && interval.is_finite()) {
            return Err(TerrainError::InvalidParameter {
                name: "contour interval",
                value: interval,
            });
        }
        let (min, max) = grid.scan_min_max()?;
        let (min, max) = (min as f64, max as f64);

        let first = (min / interval).ceil();
        let last = (max / interval).floor();
        let bad_interval = TerrainError::InvalidParameter {
            name: "contour interval",
            value: interval,
        };
        if !(first.is_finite() && last.is_finite()) {
            return Err(bad_interval);
        }
        if last - first >= MAX_LEVELS as f64 {
            return Err(bad_interval);
        }

        let mut contours = Vec::new();
        if last >= first {
            let count = (last - first) as usize;
            for i in 0..=count {
                let level = (first + i as f64) * interval;
                let segments = level_segments(grid, level);
                for (keys, closed) in join_segments(&segments) {
                    let vertices = keys
                        .into_iter()
                        .map(|key| edge_point(grid, key, level))
                        .collect();
                    contours.push(Contour {
                        elevation: level,
                        polyline: Polyline::new(vertices),
                        closed,
                    });
                }
            }
        }
        debug!(
            "Traced {} contours at interval {} over [{}, {}]",
            contours.len(),
            interval,
            min,
            max
        );
        Ok(contours)
    }
}

fn level_segments(grid: &RasterGrid, level: f64) -> Vec<(EdgeKey, EdgeKey)> {
    let mut segments = Vec::new();
    if grid.width() < 2 || grid.height() < 2 {
        return segments;
    }
    for r in 0..grid.height() - 1 {
        for c in 0..grid.width() - 1 {
            let corners = [
                grid.elevation_at(r, c),
                grid.elevation_at(r, c + 1),
                grid.elevation_at(r + 1, c + 1),
                grid.elevation_at(r + 1, c),
            ];
            let [Some(tl), Some(tr), Some(br), Some(bl)] = corners else {
                continue;
            };
            let (tl, tr, br, bl) = (tl as f64, tr as f64, br as f64, bl as f64);
            let case = (usize::from(tl >= level) << 3)
                | (usize::from(tr >= level) << 2)
                | (usize::from(br >= level) << 1)
                | usize::from(bl >= level);

            let top = EdgeKey::Horizontal(r, c);
            let right = EdgeKey::Vertical(r, c + 1);
            let bottom = EdgeKey::Horizontal(r + 1, c);
            let left = EdgeKey::Vertical(r, c);
            let centre_above = (tl + tr + br + bl) / 4.0 >= level;

            match case {
                0 | 15 => {}
                1 | 14 => segments.push((left, bottom)),
                2 | 13 => segments.push((bottom, right)),
                3 | 12 => segments.push((left, right)),
                4 | 11 => segments.push((top, right)),
                6 | 9 => segments.push((top, bottom)),
                7 | 8 => segments.push((left, top)),
                // tl and br above
                10 => {
                    if centre_above {
                        segments.push((top, right));
                        segments.push((bottom, left));
                    } else {
                        segments.push((left, top));
                        segments.push((right, bottom));
                    }
                }
                // tr and bl above
                5 => {
                    if centre_above {
                        segments.push((left, top));
                        segments.push((right, bottom));
                    } else {
                        segments.push((top, right));
                        segments.push((bottom, left));
                    }
                }
                _ => unreachable!("marching squares case is a 4-bit value"),
            }
        }
    }
    segments
}

/// Joins segments sharing an edge into chains. Open chains start from an
/// edge used only once; what remains forms closed rings.
fn join_segments(segments: &[(EdgeKey, EdgeKey)]) -> Vec<(Vec<EdgeKey>, bool)> {
    let mut by_edge: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
    for (i, (a, b)) in segments.iter().enumerate() {
        by_edge.entry(*a).or_default().push(i);
        by_edge.entry(*b).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut chains = Vec::new();
    for i in 0..segments.len() {
        for start in [segments[i].0, segments[i].1] {
            if !used[i] && by_edge.get(&start).map_or(0, Vec::len) == 1 {
                chains.push((walk(segments, &by_edge, &mut used, start, i), false));
            }
        }
    }
    for i in 0..segments.len() {
        if !used[i] {
            chains.push((walk(segments, &by_edge, &mut used, segments[i].0, i), true));
        }
    }
    chains
}

fn walk(
    segments: &[(EdgeKey, EdgeKey)],
    by_edge: &HashMap<EdgeKey, Vec<usize>>,
    used: &mut [bool],
    start: EdgeKey,
    first: usize,
) -> Vec<EdgeKey> {
    let mut chain = vec![start];
    let mut current = start;
    let mut next_segment = Some(first);
    while let Some(i) = next_segment {
        used[i] = true;
        let (a, b) = segments[i];
        current = if a == current { b } else { a };
        chain.push(current);
        next_segment = by_edge
            .get(&current)
            .and_then(|ids| ids.iter().copied().find(|&j| !used[j]));
    }
    chain
}

/// Linear crossing point of `level` along an edge, in world coordinates.
fn edge_point(grid: &RasterGrid, key: EdgeKey, level: f64) -> Point {
    let ((r0, c0), (r1, c1)) = key.ends();
    let v0 = grid.cell_at(r0, c0).unwrap_or_default() as f64;
    let v1 = grid.cell_at(r1, c1).unwrap_or_default() as f64;
    let t = if (v1 - v0).abs() > f64::EPSILON {
        ((level - v0) / (v1 - v0)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let col = c0 as f64 + t * (c1 as f64 - c0 as f64);
    let row = r0 as f64 + t * (r1 as f64 - r0 as f64);
    grid.transform().apply(col + 0.5, row + 0.5)
}
