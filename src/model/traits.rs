//! Model adapter trait definitions.

use ndarray::{Array1, Array2, ArrayView2};

use crate::error::{ExplainError, Result};

/// A frozen, differentiable prediction function over packed feature rows.
///
/// Implementations are inference-only: parameters never change after
/// construction, so one instance can be shared read-only across callers.
/// The gradient method is what the attribution estimator integrates over;
/// both methods take the same `N x input_dim` batch layout.
pub trait DifferentiableModel: std::fmt::Debug + Send + Sync {
    /// Width of one packed input row.
    fn input_dim(&self) -> usize;

    /// One scalar prediction per batch row.
    fn predict(&self, batch: &ArrayView2<f64>) -> Result<Array1<f64>>;

    /// Gradient of the prediction with respect to each input, per row.
    fn input_gradients(&self, batch: &ArrayView2<f64>) -> Result<Array2<f64>>;

    /// Reject batches whose width does not match [`input_dim`].
    ///
    /// [`input_dim`]: DifferentiableModel::input_dim
    fn check_batch(&self, batch: &ArrayView2<f64>) -> Result<()> {
        if batch.ncols() != self.input_dim() {
            return Err(ExplainError::shape_mismatch(
                format!("(N, {})", self.input_dim()),
                format!("({}, {})", batch.nrows(), batch.ncols()),
            ));
        }
        Ok(())
    }
}
