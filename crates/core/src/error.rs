//! Error types for Canopy

use crate::raster::Mismatches;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Canopy operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("Cannot read {}: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    #[error("Band {requested} out of range for {} ({band_count} bands, 1-indexed)", .path.display())]
    BandIndex {
        path: PathBuf,
        requested: usize,
        band_count: usize,
    },

    #[error("Band {index} is incompatible with band 1: {mismatches}")]
    IncompatibleBands { index: usize, mismatches: Mismatches },

    #[error(
        "Label count mismatch: {labels} labels + {masked} no-data cells != {rows}x{cols} grid"
    )]
    ShapeMismatch {
        labels: usize,
        masked: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("GDAL error: {0}")]
    #[cfg(feature = "gdal")]
    Gdal(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`]
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::Format`]
    pub fn format(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Format {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

/// Result type alias for Canopy operations
pub type Result<T> = std::result::Result<T, Error>;
