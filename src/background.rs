//! Background reference samples.
//!
//! A background sample is the attribution baseline: a fixed batch of
//! pre-scaled feature rows drawn from the training population. It is loaded
//! once per explainer and shared read-only by every subsequent call.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::artifacts;
use crate::error::{ExplainError, Result};
use crate::features::SEQ_LEN;

/// Immutable batch of pre-scaled reference rows.
#[derive(Debug, Clone)]
pub struct BackgroundSample {
    data: Array2<f64>,
}

impl BackgroundSample {
    /// Wrap a reference batch. At least one row is required.
    pub fn new(data: Array2<f64>) -> Result<Self> {
        if data.nrows() == 0 {
            return Err(ExplainError::InvalidParameter(
                "background sample needs at least one row".to_string(),
            ));
        }
        Ok(Self { data })
    }

    /// Seeded standard-normal reference set, for tests and demos.
    pub fn standard_normal(rows: usize, dim: usize, seed: u64) -> Result<Self> {
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ExplainError::InvalidParameter(e.to_string()))?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let data = Array2::from_shape_fn((rows, dim), |_| normal.sample(&mut rng));
        Self::new(data)
    }

    /// Number of reference rows.
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    /// Width of each row.
    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    /// One reference row.
    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }

    /// View of the whole batch.
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// Per-column mean over the reference rows.
    pub fn column_means(&self) -> Array1<f64> {
        self.data
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.dim()))
    }

    /// Load a flat (static-model) background from a JSON artifact file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_artifact(&BackgroundArtifact::from_json_file(path)?)
    }

    /// Build from a deserialized flat artifact.
    pub fn from_artifact(artifact: &BackgroundArtifact) -> Result<Self> {
        Self::new(artifacts::matrix_from_rows(&artifact.rows)?)
    }

    /// Load a sequence background from a JSON artifact file.
    pub fn from_sequence_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_sequence_artifact(&SequenceBackgroundArtifact::from_json_file(path)?)
    }

    /// Build from a deserialized (static, dynamic) artifact pair.
    ///
    /// Each dynamic window is flattened one day at a time, oldest day
    /// first, and appended to its static row. This matches the packed
    /// layout of [`crate::model::SequenceModelAdapter`].
    pub fn from_sequence_artifact(artifact: &SequenceBackgroundArtifact) -> Result<Self> {
        if artifact.static_rows.len() != artifact.dynamic_windows.len() {
            return Err(ExplainError::shape_mismatch(
                format!("{} dynamic windows", artifact.static_rows.len()),
                format!("{} dynamic windows", artifact.dynamic_windows.len()),
            ));
        }
        let static_block = artifacts::matrix_from_rows(&artifact.static_rows)?;
        let per_day = artifact
            .dynamic_windows
            .first()
            .and_then(|w| w.first())
            .map(|day| day.len())
            .unwrap_or(0);

        let mut data = Array2::zeros((
            static_block.nrows(),
            static_block.ncols() + SEQ_LEN * per_day,
        ));
        for (i, window) in artifact.dynamic_windows.iter().enumerate() {
            if window.len() != SEQ_LEN {
                return Err(ExplainError::shape_mismatch(
                    format!("windows of {SEQ_LEN} days"),
                    format!("window of {} days", window.len()),
                ));
            }
            for (j, value) in static_block.row(i).iter().enumerate() {
                data[[i, j]] = *value;
            }
            for (t, day) in window.iter().enumerate() {
                if day.len() != per_day {
                    return Err(ExplainError::shape_mismatch(
                        format!("days of width {per_day}"),
                        format!("day of width {}", day.len()),
                    ));
                }
                for (j, value) in day.iter().enumerate() {
                    data[[i, static_block.ncols() + t * per_day + j]] = *value;
                }
            }
        }
        Self::new(data)
    }
}

/// Persisted flat background rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundArtifact {
    /// Pre-scaled reference rows.
    pub rows: Vec<Vec<f64>>,
}

impl BackgroundArtifact {
    /// Export to JSON file.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        artifacts::write_json(self, path)
    }

    /// Load from JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        artifacts::read_json(path)
    }
}

/// Persisted (static, dynamic) background pair for the sequence model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceBackgroundArtifact {
    /// Pre-scaled static attribute rows, one per reference sample.
    pub static_rows: Vec<Vec<f64>>,
    /// Pre-scaled dynamic windows, one per reference sample: `SEQ_LEN`
    /// days, oldest first, each a row of per-day features.
    pub dynamic_windows: Vec<Vec<Vec<f64>>>,
}

impl SequenceBackgroundArtifact {
    /// Export to JSON file.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        artifacts::write_json(self, path)
    }

    /// Load from JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        artifacts::read_json(path)
    }
}
