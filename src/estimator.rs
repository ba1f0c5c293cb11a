//! Expected-gradients attribution estimation.
//!
//! For one query row the estimator approximates the path integral of the
//! model gradient between the background population and the query: each
//! draw picks a background row and an interpolation ratio, evaluates the
//! model gradient at the interpolated point, and contributes
//! `gradient * (query - background)`. The average over all draws is the raw
//! per-feature attribution, later normalized by the explainers.

use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::background::BackgroundSample;
use crate::config::AttributionConfig;
use crate::error::{ExplainError, Result};
use crate::model::DifferentiableModel;

/// Stochastic path-integral gradient estimator over one (model, background)
/// pair.
#[derive(Debug, Clone, Copy)]
pub struct GradientEstimator<'a> {
    model: &'a dyn DifferentiableModel,
    background: &'a BackgroundSample,
}

impl<'a> GradientEstimator<'a> {
    /// Bind a model and its background sample.
    ///
    /// Their widths must agree; a mismatch means the artifacts were not
    /// produced together and the explainer holding them is unusable.
    pub fn new(
        model: &'a dyn DifferentiableModel,
        background: &'a BackgroundSample,
    ) -> Result<Self> {
        if background.dim() != model.input_dim() {
            return Err(ExplainError::shape_mismatch(
                format!("background of width {}", model.input_dim()),
                format!("background of width {}", background.dim()),
            ));
        }
        Ok(Self { model, background })
    }

    /// Raw per-feature attributions for a query batch, `N x D` in and out.
    ///
    /// All randomness (background draws and interpolation ratios) comes
    /// from one ChaCha8 stream seeded with `seed`, in a fixed draw order,
    /// so equal inputs give equal outputs. A single fixed-budget pass: no
    /// retries, no early stopping, and no zero-filling — any model failure
    /// or non-finite gradient during the pass aborts the whole call.
    pub fn estimate(
        &self,
        queries: &ArrayView2<f64>,
        num_samples: usize,
        seed: u64,
    ) -> Result<Array2<f64>> {
        if num_samples == 0 {
            return Err(ExplainError::InvalidParameter(
                "num_samples must be at least 1".to_string(),
            ));
        }
        self.model.check_batch(queries)?;

        let dim = self.model.input_dim();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut attributions = Array2::zeros((queries.nrows(), dim));

        for (qi, query) in queries.rows().into_iter().enumerate() {
            let mut points = Array2::zeros((num_samples, dim));
            let mut deltas = Array2::zeros((num_samples, dim));
            for k in 0..num_samples {
                let bg_row = self.background.row(rng.random_range(0..self.background.n_rows()));
                let ratio: f64 = rng.random();
                for j in 0..dim {
                    let delta = query[j] - bg_row[j];
                    deltas[[k, j]] = delta;
                    points[[k, j]] = bg_row[j] + ratio * delta;
                }
            }

            let grads = self
                .model
                .input_gradients(&points.view())
                .map_err(|e| ExplainError::AttributionFailure(e.to_string()))?;
            if grads.iter().any(|g| !g.is_finite()) {
                return Err(ExplainError::AttributionFailure(
                    "non-finite gradient in sampling pass".to_string(),
                ));
            }

            let contribution = (&grads * &deltas).mean_axis(Axis(0)).ok_or_else(|| {
                ExplainError::AttributionFailure("empty sampling pass".to_string())
            })?;
            attributions.row_mut(qi).assign(&contribution);
        }
        Ok(attributions)
    }

    /// [`estimate`] with the budget taken from a config.
    ///
    /// [`estimate`]: GradientEstimator::estimate
    pub fn estimate_with(
        &self,
        queries: &ArrayView2<f64>,
        config: &AttributionConfig,
    ) -> Result<Array2<f64>> {
        self.estimate(queries, config.num_samples, config.seed)
    }
}
