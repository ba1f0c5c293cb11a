//! Artifact (de)serialization helpers.
//!
//! Scalers, model weights, and background samples are externally produced
//! and persisted as JSON documents. Matrices travel as `Vec<Vec<f64>>` row
//! lists and are shape-checked on the way into `ndarray`.

use ndarray::{Array2, ArrayView2};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::error::{ExplainError, Result};

/// Serialize a value to pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ExplainError::SerializationError(e.to_string()))
}

/// Deserialize a value from a JSON string.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| ExplainError::SerializationError(e.to_string()))
}

/// Write a value to a JSON file.
pub fn write_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let json = to_json(value)?;
    std::fs::write(path, json).map_err(|e| ExplainError::IoError(e.to_string()))
}

/// Read a value from a JSON file.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let json =
        std::fs::read_to_string(path).map_err(|e| ExplainError::IoError(e.to_string()))?;
    from_json(&json)
}

/// Convert a serialized row list into a matrix, rejecting ragged input.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let width = rows.first().map(|r| r.len()).unwrap_or(0);
    if let Some(bad) = rows.iter().find(|r| r.len() != width) {
        return Err(ExplainError::shape_mismatch(
            format!("rows of width {width}"),
            format!("row of width {}", bad.len()),
        ));
    }
    let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Ok(Array2::from_shape_vec((rows.len(), width), flat)?)
}

/// Convert a matrix into a serializable row list.
pub fn matrix_to_rows(matrix: &ArrayView2<f64>) -> Vec<Vec<f64>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}
