//! Explainers: orchestration from raw query record to contribution table.
//!
//! The two explainers share one pipeline shape: validate the record,
//! derive temporal features, scale with the fitted scalers, pack a flat
//! row, run the gradient estimator, and reduce the raw attributions into a
//! signed percentage table. They differ only in feature layout and model
//! family.

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::error::{ExplainError, Result};
use crate::scaling::AffineScaler;

mod rnn;
mod snn;

pub use rnn::SequenceExplainer;
pub use snn::StaticExplainer;

/// Total attribution magnitudes at or below this threshold are reported as
/// [`ExplainError::DegenerateAttribution`] instead of being normalized.
pub const DEGENERATE_TOTAL: f64 = 1e-12;

/// Signed percentage contributions, one per feature, ordered like the
/// model's input row. Absolute values sum to 100 for any table produced by
/// an explainer.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionTable {
    names: Vec<String>,
    values: Array1<f64>,
}

impl ContributionTable {
    /// Pair feature names with their signed contributions.
    pub fn new(names: Vec<String>, values: Array1<f64>) -> Result<Self> {
        if names.len() != values.len() {
            return Err(ExplainError::shape_mismatch(
                format!("{} contribution values", names.len()),
                format!("{} contribution values", values.len()),
            ));
        }
        Ok(Self { names, values })
    }

    /// Feature names in row order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Contributions in row order.
    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    /// Contribution for one feature.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True for a table with no features.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(name, contribution)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// `(name, contribution)` pairs ordered by descending magnitude, the
    /// order the dashboard tables display.
    pub fn sorted_by_magnitude(&self) -> Vec<(&str, f64)> {
        let mut pairs: Vec<(&str, f64)> = self.iter().collect();
        pairs.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        pairs
    }

    /// Sum of absolute contributions.
    pub fn total_magnitude(&self) -> f64 {
        self.values.iter().map(|v| v.abs()).sum()
    }
}

/// Reduce raw `N x D` attributions to signed percentages.
///
/// The batch axis is averaged with sign kept, then each feature receives
/// `sign(mean[f]) * |mean[f]| / total * 100` where `total` is the sum of
/// absolute means. The sign always comes from the signed mean, never from
/// a magnitude, so a feature pushing the prediction down keeps its minus
/// sign in the output.
pub(crate) fn normalize_signed(raw: &ArrayView2<f64>) -> Result<Array1<f64>> {
    let mean_signed = raw.mean_axis(Axis(0)).ok_or_else(|| {
        ExplainError::AttributionFailure("empty attribution batch".to_string())
    })?;
    let total: f64 = mean_signed.iter().map(|v| v.abs()).sum();
    if total <= DEGENERATE_TOTAL {
        return Err(ExplainError::DegenerateAttribution);
    }
    Ok(mean_signed.mapv(|v| v / total * 100.0))
}

/// Verify a fitted scaler covers exactly the expected column set.
pub(crate) fn check_scaler_layout(scaler: &AffineScaler, expected: &[String]) -> Result<()> {
    let missing: Vec<String> = expected
        .iter()
        .filter(|name| !scaler.columns().contains(name))
        .cloned()
        .collect();
    let unexpected: Vec<String> = scaler
        .columns()
        .iter()
        .filter(|name| !expected.contains(name))
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_normalize_preserves_sign_and_sums_to_100() {
        let raw = array![[3.0, -1.0, 0.0, 1.0]];
        let contributions = normalize_signed(&raw.view()).unwrap();

        assert_relative_eq!(contributions[0], 60.0, epsilon = 1e-9);
        assert_relative_eq!(contributions[1], -20.0, epsilon = 1e-9);
        assert_relative_eq!(contributions[2], 0.0, epsilon = 1e-9);
        assert_relative_eq!(contributions[3], 20.0, epsilon = 1e-9);

        let total: f64 = contributions.iter().map(|v| v.abs()).sum();
        assert_relative_eq!(total, 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_averages_batch_with_sign() {
        // +2 and -2 cancel in the signed mean
        let raw = array![[2.0, 4.0], [-2.0, 4.0]];
        let contributions = normalize_signed(&raw.view()).unwrap();
        assert_relative_eq!(contributions[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(contributions[1], 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normalize_degenerate() {
        let raw = array![[0.0, 0.0, 0.0]];
        assert!(matches!(
            normalize_signed(&raw.view()),
            Err(ExplainError::DegenerateAttribution)
        ));

        let tiny = array![[1e-15, -1e-15, 0.0]];
        assert!(matches!(
            normalize_signed(&tiny.view()),
            Err(ExplainError::DegenerateAttribution)
        ));
    }

    #[test]
    fn test_table_lookup_and_sorting() {
        let table = ContributionTable::new(
            vec!["P".to_string(), "T".to_string(), "slp".to_string()],
            array![25.0, -60.0, 15.0],
        )
        .unwrap();

        assert_eq!(table.get("T"), Some(-60.0));
        assert_eq!(table.get("nope"), None);
        assert_relative_eq!(table.total_magnitude(), 100.0);

        let sorted = table.sorted_by_magnitude();
        assert_eq!(sorted[0].0, "T");
        assert_eq!(sorted[1].0, "P");
        assert_eq!(sorted[2].0, "slp");
    }

    #[test]
    fn test_table_length_mismatch() {
        let result = ContributionTable::new(vec!["P".to_string()], array![1.0, 2.0]);
        assert!(matches!(result, Err(ExplainError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_explainers_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StaticExplainer>();
        assert_send_sync::<SequenceExplainer>();
    }
}
