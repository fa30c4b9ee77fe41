use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the REA pipeline.
///
/// Variants are grouped by how far a failure reaches: month-level problems are
/// recovered by the missing marker, model-level problems exclude one ensemble member
/// for one site, site-level problems skip the site.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReaError {
    #[error("{0}")]
    Error(String),
    #[error("Site '{site}' has no usable observed samples")]
    MissingObservations { site: String },
    #[error("Model '{model}' is incompatible with site '{site}': {reason}")]
    GridMismatch {
        site: String,
        model: String,
        reason: String,
    },
    #[error("Total reliability weight is zero for site '{site}', period {period}")]
    DegenerateWeight { site: String, period: usize },
    #[error("Non-finite intermediate value for site '{site}', period {period}")]
    NumericOverflow { site: String, period: usize },
    #[error("No ensemble members left for site '{site}'")]
    EmptyEnsemble { site: String },
    #[error("Unknown coordinate name '{name}'. Add it to the rename table or fix the source")]
    UnknownCoordinate { name: String },
    #[error("Point ({lat}, {lon}) lies outside the grid extent")]
    OutsideGrid { lat: f64, lon: f64 },
    #[error("Gridded field has no '{name}' coordinate")]
    MissingCoordinate { name: String },
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("Site '{name}' appears more than once in the site table")]
    DuplicateSite { name: String },
    #[error("Timeseries '{name}' already exists")]
    DuplicateSeries { name: String },
    #[error("Length mismatch. Expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for ReaError {
    fn from(e: toml::de::Error) -> Self {
        ReaError::Config(e.to_string())
    }
}

/// Convenience type for `Result<T, ReaError>`.
pub type ReaResult<T> = Result<T, ReaError>;
