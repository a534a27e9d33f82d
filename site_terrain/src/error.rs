//! Error type shared by every terrain operation.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TerrainError>;

/// Broad category of a [`TerrainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad point-list shape, count or missing fields.
    Validation,
    /// Non-positive pixel size, contour interval or similar.
    Parameter,
    /// The input was valid but the computation could not produce a result.
    Computation,
    /// Reading or writing an external resource failed.
    Resource,
}

/// Errors produced by the terrain pipeline.
#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("no points provided")]
    EmptyInput,

    #[error("insufficient points: {count} (minimum {required} required)")]
    InsufficientPoints { count: usize, required: usize },

    #[error("point {index} is missing its {field} coordinate")]
    MissingField { index: usize, field: &'static str },

    #[error("point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("interpolation failed: {0}")]
    InterpolationFailure(String),

    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("TIN not generated")]
    NoTinAvailable,

    #[error("DTM not generated")]
    NoDtmAvailable,

    #[error("raster contains only nodata cells")]
    AllNodata,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("format error: {0}")]
    Format(String),
}

impl TerrainError {
    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TerrainError::EmptyInput
            | TerrainError::InsufficientPoints { .. }
            | TerrainError::MissingField { .. }
            | TerrainError::NonFiniteCoordinate { .. }
            | TerrainError::InvalidInput(_) => ErrorKind::Validation,
            TerrainError::InvalidParameter { .. } => ErrorKind::Parameter,
            TerrainError::InterpolationFailure(_)
            | TerrainError::DegenerateInput(_)
            | TerrainError::NoTinAvailable
            | TerrainError::NoDtmAvailable
            | TerrainError::AllNodata => ErrorKind::Computation,
            TerrainError::Io(_) | TerrainError::Format(_) => ErrorKind::Resource,
        }
    }
}

impl From<serde_json::Error> for TerrainError {
    fn from(e: serde_json::Error) -> Self {
        TerrainError::Format(e.to_string())
    }
}
