//! Error types for chrun-explain.

use ndarray::ShapeError;
use thiserror::Error;

/// Result type alias for attribution operations.
pub type Result<T> = std::result::Result<T, ExplainError>;

/// Errors that can occur while preparing or computing an attribution.
#[derive(Error, Debug)]
pub enum ExplainError {
    /// A required feature column is missing from the input record, or a
    /// scaler received a column set different from the one it was fit with.
    #[error("Schema mismatch: missing columns {missing:?}, unexpected columns {unexpected:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    /// A tensor-packing invariant was violated. Usually an artifact/version
    /// mismatch between model, scaler, and background sample.
    #[error("Shape mismatch: expected {expected_shape}, got {actual_shape}")]
    ShapeMismatch {
        expected_shape: String,
        actual_shape: String,
    },
    /// Numerical failure during gradient estimation (e.g. a non-finite
    /// gradient). The query may be retried; no zero-filled result is
    /// produced in its place.
    #[error("Attribution failed: {0}")]
    AttributionFailure(String),
    /// Total attribution magnitude is zero, so normalized contributions are
    /// undefined for this query.
    #[error("Degenerate attribution: total attribution magnitude is zero")]
    DegenerateAttribution,
    /// Invalid parameter value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// An IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// A serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ExplainError {
    /// Schema mismatch listing only missing columns.
    pub fn missing_columns<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExplainError::SchemaMismatch {
            missing: missing.into_iter().map(Into::into).collect(),
            unexpected: Vec::new(),
        }
    }

    /// Shape mismatch from any two displayable shape descriptions.
    pub fn shape_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        ExplainError::ShapeMismatch {
            expected_shape: expected.to_string(),
            actual_shape: actual.to_string(),
        }
    }
}

impl From<ShapeError> for ExplainError {
    fn from(err: ShapeError) -> Self {
        ExplainError::ShapeMismatch {
            expected_shape: "unknown".to_string(),
            actual_shape: err.to_string(),
        }
    }
}
