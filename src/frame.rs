//! Named feature tables.
//!
//! A [`FeatureTable`] is a dense rows x columns matrix with a name per
//! column. Explainers assemble one per query, and the scalers operate on
//! named sub-tables of it: select a lag block, rename it to the canonical
//! fitted schema, transform, rename back, write the block back in place.

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::{ExplainError, Result};

/// Dense matrix with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl FeatureTable {
    /// Build from a column list and matching value matrix.
    pub fn new(columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if columns.len() != values.ncols() {
            return Err(ExplainError::shape_mismatch(
                format!("{} columns", columns.len()),
                format!("{} value columns", values.ncols()),
            ));
        }
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(ExplainError::InvalidParameter(format!(
                    "duplicate column name '{name}'"
                )));
            }
        }
        Ok(Self { columns, values })
    }

    /// Build a single-row table.
    pub fn from_row(columns: Vec<String>, row: Vec<f64>) -> Result<Self> {
        let width = row.len();
        let values = Array2::from_shape_vec((1, width), row)?;
        Self::new(columns, values)
    }

    /// Column names in row order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    /// View of the underlying matrix.
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Consume the table, keeping only the matrix.
    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    /// Position of a column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// View of one named column.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|i| self.values.column(i))
    }

    /// New table holding the given columns, in the given order.
    ///
    /// Fails with `SchemaMismatch` listing the names this table does not
    /// have.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let missing: Vec<String> = names
            .iter()
            .map(|n| n.as_ref())
            .filter(|n| self.column_index(n).is_none())
            .map(|n| n.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ExplainError::missing_columns(missing));
        }

        let mut values = Array2::zeros((self.n_rows(), names.len()));
        for (j, name) in names.iter().enumerate() {
            let idx = self.column_index(name.as_ref()).ok_or_else(|| {
                ExplainError::missing_columns([name.as_ref().to_string()])
            })?;
            values.column_mut(j).assign(&self.values.column(idx));
        }
        let columns = names.iter().map(|n| n.as_ref().to_string()).collect();
        Self::new(columns, values)
    }

    /// Same values under new column names.
    pub fn renamed(&self, columns: Vec<String>) -> Result<Self> {
        Self::new(columns, self.values.clone())
    }

    /// Append a column filled with one value.
    pub fn push_fill(&mut self, name: impl Into<String>, fill: f64) -> Result<()> {
        let name = name.into();
        if self.column_index(&name).is_some() {
            return Err(ExplainError::InvalidParameter(format!(
                "duplicate column name '{name}'"
            )));
        }
        let n_rows = self.n_rows();
        let mut values = Array2::zeros((n_rows, self.n_cols() + 1));
        values
            .slice_mut(ndarray::s![.., ..self.n_cols()])
            .assign(&self.values);
        values.column_mut(self.n_cols()).fill(fill);
        self.columns.push(name);
        self.values = values;
        Ok(())
    }

    /// Remove a column.
    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| ExplainError::missing_columns([name.to_string()]))?;
        let mut values = Array2::zeros((self.n_rows(), self.n_cols() - 1));
        let mut out = 0;
        for j in 0..self.n_cols() {
            if j == idx {
                continue;
            }
            values.column_mut(out).assign(&self.values.column(j));
            out += 1;
        }
        self.columns.remove(idx);
        self.values = values;
        Ok(())
    }

    /// Write another table's columns into this one by name.
    ///
    /// Every column of `other` must exist here, and row counts must match.
    pub fn assign(&mut self, other: &FeatureTable) -> Result<()> {
        if self.n_rows() != other.n_rows() {
            return Err(ExplainError::shape_mismatch(
                format!("{} rows", self.n_rows()),
                format!("{} rows", other.n_rows()),
            ));
        }
        let missing: Vec<String> = other
            .columns
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ExplainError::missing_columns(missing));
        }
        for (j, name) in other.columns.iter().enumerate() {
            let idx = self
                .column_index(name)
                .ok_or_else(|| ExplainError::missing_columns([name.clone()]))?;
            self.values.column_mut(idx).assign(&other.values.column(j));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample_table() -> FeatureTable {
        FeatureTable::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_select_reorders() {
        let table = sample_table();
        let sub = table.select(&["c", "a"]).unwrap();
        assert_eq!(sub.columns(), &["c".to_string(), "a".to_string()]);
        assert_eq!(sub.values(), array![[3.0, 1.0], [6.0, 4.0]].view());
    }

    #[test]
    fn test_select_missing_is_schema_mismatch() {
        let table = sample_table();
        let err = table.select(&["a", "z"]).unwrap_err();
        match err {
            ExplainError::SchemaMismatch { missing, .. } => {
                assert_eq!(missing, vec!["z".to_string()]);
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_push_fill_and_drop() {
        let mut table = sample_table();
        table.push_fill("Y", 0.0).unwrap();
        assert_eq!(table.n_cols(), 4);
        assert_eq!(table.column("Y").unwrap(), array![0.0, 0.0].view());

        table.drop_column("Y").unwrap();
        assert_eq!(table.columns(), &["a", "b", "c"]);
        assert_eq!(table.n_cols(), 3);
    }

    #[test]
    fn test_assign_by_name() {
        let mut table = sample_table();
        let block = FeatureTable::new(
            vec!["b".to_string()],
            array![[20.0], [50.0]],
        )
        .unwrap();
        table.assign(&block).unwrap();
        assert_eq!(table.column("b").unwrap(), array![20.0, 50.0].view());
        // untouched columns keep their values
        assert_eq!(table.column("a").unwrap(), array![1.0, 4.0].view());
    }

    #[test]
    fn test_renamed_round_trip() {
        let table = sample_table();
        let renamed = table
            .renamed(vec!["x".to_string(), "y".to_string(), "z".to_string()])
            .unwrap();
        assert_eq!(renamed.columns(), &["x", "y", "z"]);
        assert_eq!(renamed.values(), table.values());
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = FeatureTable::new(
            vec!["a".to_string(), "a".to_string()],
            array![[1.0, 2.0]],
        );
        assert!(matches!(result, Err(ExplainError::InvalidParameter(_))));
    }
}
