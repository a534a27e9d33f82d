//! Point-list checks run before any terrain computation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::geometry::Point3;

/// Minimum number of points any surface operation accepts.
pub const MIN_POINTS: usize = 3;

/// Point record as received from a caller. Fields are optional so that
/// incomplete records can be reported instead of silently defaulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl PointRecord {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }
}

impl From<Point3> for PointRecord {
    fn from(p: Point3) -> Self {
        Self::new(p.x, p.y, p.z)
    }
}

/// Checks the shape of a point list without converting it.
pub fn check_count(count: usize) -> Result<()> {
    if count == 0 {
        return Err(TerrainError::EmptyInput);
    }
    if count < MIN_POINTS {
        return Err(TerrainError::InsufficientPoints {
            count,
            required: MIN_POINTS,
        });
    }
    Ok(())
}

/// Validates `records` and returns them as complete points in input order.
///
/// Fails with [`TerrainError::EmptyInput`], [`TerrainError::InsufficientPoints`]
/// or [`TerrainError::MissingField`] for the first offending record.
pub fn validate_points(records: &[PointRecord]) -> Result<Vec<Point3>> {
    check_count(records.len())?;
    records
        .iter()
        .enumerate()
        .map(|(index, r)| {
            let x = r.x.ok_or(TerrainError::MissingField { index, field: "x" })?;
            let y = r.y.ok_or(TerrainError::MissingField { index, field: "y" })?;
            let z = r.z.ok_or(TerrainError::MissingField { index, field: "z" })?;
            if !(x.is_finite() && y.is_finite() && z.is_finite()) {
                return Err(TerrainError::NonFiniteCoordinate { index });
            }
            Ok(Point3::new(x, y, z))
        })
        .collect()
}

/// Validates already-typed points: count and finiteness only.
pub fn validate_point3(points: &[Point3]) -> Result<()> {
    check_count(points.len())?;
    match points
        .iter()
        .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
    {
        Some(index) => Err(TerrainError::NonFiniteCoordinate { index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_short_lists() {
        assert!(matches!(validate_points(&[]), Err(TerrainError::EmptyInput)));
        let two = [PointRecord::new(0.0, 0.0, 0.0), PointRecord::new(1.0, 0.0, 0.0)];
        assert!(matches!(
            validate_points(&two),
            Err(TerrainError::InsufficientPoints {
                count: 2,
                required: 3
            })
        ));
    }

    #[test]
    fn reports_first_missing_field() {
        let recs = [
            PointRecord::new(0.0, 0.0, 0.0),
            PointRecord::new(1.0, 0.0, 0.0),
            PointRecord {
                x: Some(1.0),
                y: Some(1.0),
                z: None,
            },
        ];
        match validate_points(&recs) {
            Err(TerrainError::MissingField { index, field }) => {
                assert_eq!(index, 2);
                assert_eq!(field, "z");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let recs: Vec<PointRecord> =
            serde_json::from_str(r#"[{"x":1,"y":2,"z":3},{"x":1,"y":2}]"#).unwrap();
        assert_eq!(recs[0], PointRecord::new(1.0, 2.0, 3.0));
        assert_eq!(recs[1].z, None);
    }

    #[test]
    fn rejects_nan() {
        let recs = [
            PointRecord::new(0.0, 0.0, 0.0),
            PointRecord::new(1.0, f64::NAN, 0.0),
            PointRecord::new(1.0, 1.0, 0.0),
        ];
        assert!(matches!(
            validate_points(&recs),
            Err(TerrainError::NonFiniteCoordinate { index: 1 })
        ));
    }

    #[test]
    fn keeps_input_order() {
        let recs = [
            PointRecord::new(3.0, 0.0, 1.0),
            PointRecord::new(1.0, 0.0, 2.0),
            PointRecord::new(2.0, 5.0, 3.0),
        ];
        let pts = validate_points(&recs).unwrap();
        assert_eq!(pts[0], Point3::new(3.0, 0.0, 1.0));
        assert_eq!(pts[2], Point3::new(2.0, 5.0, 3.0));
        let back: Vec<PointRecord> = pts.into_iter().map(PointRecord::from).collect();
        assert_eq!(back, recs);
    }
}
