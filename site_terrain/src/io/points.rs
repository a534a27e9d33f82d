//! Survey point input. Records are returned unvalidated; pass them through
//! [`validate_points`](crate::validation::validate_points) before use.

use crate::error::{Result, TerrainError};
use crate::validation::PointRecord;

/// Reads a JSON array of `{"x": .., "y": .., "z": ..}` objects.
pub fn read_points_json(path: &str) -> Result<Vec<PointRecord>> {
    let contents = super::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Reads `x,y,z` lines from a CSV file.
pub fn read_points_csv(path: &str) -> Result<Vec<PointRecord>> {
    parse_points_csv(&super::read_to_string(path)?)
}

/// Parses `x,y,z` lines. Blank lines and `#` comments are skipped, as is a
/// leading header line. An empty field becomes a missing coordinate.
pub fn parse_points_csv(text: &str) -> Result<Vec<PointRecord>> {
    let mut records = Vec::new();
    let mut first = true;
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let parsed: Vec<Option<Option<f64>>> = fields.iter().map(|f| parse_field(f)).collect();
        let header = first && parsed.iter().any(Option::is_none);
        first = false;
        if header {
            continue;
        }
        if fields.len() < 3 {
            return Err(TerrainError::Format(format!(
                "line {}: expected x,y,z but found {} fields",
                line_no + 1,
                fields.len()
            )));
        }
        let mut coords = [None; 3];
        for (slot, value) in coords.iter_mut().zip(&parsed) {
            *slot = value.ok_or_else(|| {
                TerrainError::Format(format!("line {}: invalid number", line_no + 1))
            })?;
        }
        records.push(PointRecord {
            x: coords[0],
            y: coords[1],
            z: coords[2],
        });
    }
    Ok(records)
}

/// `None` when the field is not a number, `Some(None)` when it is empty.
fn parse_field(field: &str) -> Option<Option<f64>> {
    if field.is_empty() {
        Some(None)
    } else {
        field.parse().ok().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_points;
    use tempfile::NamedTempFile;

    #[test]
    fn csv_with_header_and_comments() {
        let text = "x,y,z\n# control\n1,2,3\n\n4.5, 5.5 ,6.5\n7,8,9\n";
        let recs = parse_points_csv(text).unwrap();
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[1], PointRecord::new(4.5, 5.5, 6.5));
    }

    #[test]
    fn empty_field_is_missing() {
        let recs = parse_points_csv("1,2,3\n4,5,\n7,8,9").unwrap();
        assert_eq!(recs[1].z, None);
        assert!(validate_points(&recs).is_err());
    }

    #[test]
    fn bad_number_reports_line() {
        let err = parse_points_csv("1,2,3\n4,abc,6\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn json_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        crate::io::write_string(path, r#"[{"x":0,"y":0,"z":1},{"x":3,"y":0,"z":2},{"x":0,"y":4}]"#)
            .unwrap();
        let recs = read_points_json(path).unwrap();
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[2].z, None);
    }
}
