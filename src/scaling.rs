//! Fitted affine feature scaling.
//!
//! Scalers are fit offline during model training and shipped as artifacts;
//! this module only applies them. A scaler is bound to the ordered column
//! list it was fit with and transforms any table carrying exactly that
//! column set, realigning by name. The same scaler instance serves every
//! lag block of the sequence pipeline through canonical renaming (see
//! [`crate::explainer::SequenceExplainer`]).

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::artifacts;
use crate::error::{ExplainError, Result};
use crate::frame::FeatureTable;

/// Per-column `(x - mean) / scale` transform with a fixed fitted layout.
#[derive(Debug, Clone)]
pub struct AffineScaler {
    columns: Vec<String>,
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl AffineScaler {
    /// Build from fitted parameters.
    ///
    /// `mean` and `scale` must each have one entry per column, and every
    /// scale must be nonzero.
    pub fn new(columns: Vec<String>, mean: Array1<f64>, scale: Array1<f64>) -> Result<Self> {
        if mean.len() != columns.len() || scale.len() != columns.len() {
            return Err(ExplainError::shape_mismatch(
                format!("{} fitted parameters", columns.len()),
                format!("{} means, {} scales", mean.len(), scale.len()),
            ));
        }
        if let Some(idx) = scale.iter().position(|s| *s == 0.0) {
            return Err(ExplainError::InvalidParameter(format!(
                "zero scale for column '{}'",
                columns[idx]
            )));
        }
        Ok(Self {
            columns,
            mean,
            scale,
        })
    }

    /// Fitted column order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of fitted columns.
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Forward transform: each column `c` maps by `(x - mean[c]) / scale[c]`.
    ///
    /// The input's column SET must equal the fitted set; order is realigned
    /// by name and the output keeps the input's order. Missing or unexpected
    /// columns are a `SchemaMismatch`; nothing is filled implicitly.
    pub fn transform(&self, table: &FeatureTable) -> Result<FeatureTable> {
        self.check_schema(table)?;
        self.map_columns(table, |x, mean, scale| (x - mean) / scale)
    }

    /// Inverse transform: each column `c` maps by `x * scale[c] + mean[c]`.
    pub fn inverse_transform(&self, table: &FeatureTable) -> Result<FeatureTable> {
        self.check_schema(table)?;
        self.map_columns(table, |x, mean, scale| x * scale + mean)
    }

    fn check_schema(&self, table: &FeatureTable) -> Result<()> {
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|name| table.column_index(name).is_none())
            .cloned()
            .collect();
        let unexpected: Vec<String> = table
            .columns()
            .iter()
            .filter(|name| !self.columns.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(ExplainError::SchemaMismatch {
                missing,
                unexpected,
            });
        }
        Ok(())
    }

    fn map_columns<F>(&self, table: &FeatureTable, map: F) -> Result<FeatureTable>
    where
        F: Fn(f64, f64, f64) -> f64,
    {
        let mut values = table.values().to_owned();
        for (j, name) in table.columns().iter().enumerate() {
            let fitted = self
                .columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| ExplainError::missing_columns([name.clone()]))?;
            let mean = self.mean[fitted];
            let scale = self.scale[fitted];
            values
                .column_mut(j)
                .mapv_inplace(|x| map(x, mean, scale));
        }
        FeatureTable::new(table.columns().to_vec(), values)
    }

    /// Load from a JSON artifact file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_artifact(&ScalerArtifact::from_json_file(path)?)
    }

    /// Build from a deserialized artifact.
    pub fn from_artifact(artifact: &ScalerArtifact) -> Result<Self> {
        Self::new(
            artifact.columns.clone(),
            Array1::from_vec(artifact.mean.clone()),
            Array1::from_vec(artifact.scale.clone()),
        )
    }

    /// Serializable form of the fitted parameters.
    pub fn to_artifact(&self) -> ScalerArtifact {
        ScalerArtifact {
            columns: self.columns.clone(),
            mean: self.mean.to_vec(),
            scale: self.scale.to_vec(),
        }
    }
}

/// Persisted scaler parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerArtifact {
    /// Fitted column order.
    pub columns: Vec<String>,
    /// Per-column mean.
    pub mean: Vec<f64>,
    /// Per-column scale.
    pub scale: Vec<f64>,
}

impl ScalerArtifact {
    /// Export to JSON file.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        artifacts::write_json(self, path)
    }

    /// Load from JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        artifacts::read_json(path)
    }
}
