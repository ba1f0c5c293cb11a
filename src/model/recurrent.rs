//! Recurrent regressor for 7-day windows.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::artifacts;
use crate::error::{ExplainError, Result};
use crate::features::SEQ_LEN;
use crate::model::traits::DifferentiableModel;

/// Frozen tanh recurrent regressor.
///
/// The hidden state starts from an encoding of the static attributes and is
/// updated once per day of the window, oldest day first:
///
/// ```text
/// h_0 = tanh(w_static . s + b_static)
/// h_t = tanh(w_input . x_t + w_hidden . h_{t-1} + b_hidden)
/// y   = w_out . h_last + b_out
/// ```
#[derive(Debug, Clone)]
pub struct RecurrentNet {
    w_static: Array2<f64>,
    b_static: Array1<f64>,
    w_input: Array2<f64>,
    w_hidden: Array2<f64>,
    b_hidden: Array1<f64>,
    w_out: Array1<f64>,
    b_out: f64,
}

impl RecurrentNet {
    /// Build from weights. `w_static` is `hidden x static_dim`, `w_input`
    /// is `hidden x per_day_dim`, `w_hidden` is `hidden x hidden`; the
    /// remaining shapes must agree with the hidden width of `w_out`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        w_static: Array2<f64>,
        b_static: Array1<f64>,
        w_input: Array2<f64>,
        w_hidden: Array2<f64>,
        b_hidden: Array1<f64>,
        w_out: Array1<f64>,
        b_out: f64,
    ) -> Result<Self> {
        let hidden = w_out.len();
        let check = |name: &str, rows: usize| -> Result<()> {
            if rows != hidden {
                return Err(ExplainError::shape_mismatch(
                    format!("{name} with {hidden} rows"),
                    format!("{name} with {rows} rows"),
                ));
            }
            Ok(())
        };
        check("w_static", w_static.nrows())?;
        check("b_static", b_static.len())?;
        check("w_input", w_input.nrows())?;
        check("w_hidden", w_hidden.nrows())?;
        check("b_hidden", b_hidden.len())?;
        if w_hidden.ncols() != hidden {
            return Err(ExplainError::shape_mismatch(
                format!("w_hidden of shape ({hidden}, {hidden})"),
                format!("w_hidden of shape ({}, {})", w_hidden.nrows(), w_hidden.ncols()),
            ));
        }
        Ok(Self {
            w_static,
            b_static,
            w_input,
            w_hidden,
            b_hidden,
            w_out,
            b_out,
        })
    }

    /// Width of the static attribute block.
    pub fn static_dim(&self) -> usize {
        self.w_static.ncols()
    }

    /// Width of one day's dynamic input.
    pub fn per_day_dim(&self) -> usize {
        self.w_input.ncols()
    }

    /// Hidden state width.
    pub fn hidden_dim(&self) -> usize {
        self.w_out.len()
    }

    /// Prediction for one (static block, day window) pair. `dynamic` holds
    /// one row per day, oldest first.
    pub fn predict_window(
        &self,
        static_block: &ArrayView1<f64>,
        dynamic: &ArrayView2<f64>,
    ) -> Result<f64> {
        if static_block.len() != self.static_dim() || dynamic.ncols() != self.per_day_dim() {
            return Err(ExplainError::shape_mismatch(
                format!("({},) static and (steps, {}) dynamic", self.static_dim(), self.per_day_dim()),
                format!("({},) static and ({}, {}) dynamic", static_block.len(), dynamic.nrows(), dynamic.ncols()),
            ));
        }
        let (y, _) = self.forward_cached(static_block, dynamic);
        Ok(y)
    }

    /// Forward pass returning the prediction and every hidden state
    /// (`h_0` through `h_last`), which the backward pass reuses.
    fn forward_cached(
        &self,
        static_block: &ArrayView1<f64>,
        dynamic: &ArrayView2<f64>,
    ) -> (f64, Vec<Array1<f64>>) {
        let mut h = (self.w_static.dot(static_block) + &self.b_static).mapv(f64::tanh);
        let mut states = vec![h.clone()];
        for x_t in dynamic.rows() {
            h = (self.w_input.dot(&x_t) + self.w_hidden.dot(&h) + &self.b_hidden)
                .mapv(f64::tanh);
            states.push(h.clone());
        }
        let y = self.w_out.dot(&h) + self.b_out;
        (y, states)
    }

    /// Backprop through time: gradients of the prediction with respect to
    /// the static block and each day's input.
    fn gradient_window(
        &self,
        static_block: &ArrayView1<f64>,
        dynamic: &ArrayView2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let (_, states) = self.forward_cached(static_block, dynamic);
        let steps = dynamic.nrows();

        let mut d_dynamic = Array2::zeros((steps, self.per_day_dim()));
        let mut dh = self.w_out.clone();
        for t in (0..steps).rev() {
            let dpre = &dh * &states[t + 1].mapv(|v| 1.0 - v * v);
            d_dynamic.row_mut(t).assign(&self.w_input.t().dot(&dpre));
            dh = self.w_hidden.t().dot(&dpre);
        }
        let dpre = &dh * &states[0].mapv(|v| 1.0 - v * v);
        let d_static = self.w_static.t().dot(&dpre);
        (d_static, d_dynamic)
    }

    /// Load from a JSON artifact file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_artifact(&RecurrentArtifact::from_json_file(path)?)
    }

    /// Build from a deserialized artifact.
    pub fn from_artifact(artifact: &RecurrentArtifact) -> Result<Self> {
        Self::new(
            artifacts::matrix_from_rows(&artifact.w_static)?,
            Array1::from_vec(artifact.b_static.clone()),
            artifacts::matrix_from_rows(&artifact.w_input)?,
            artifacts::matrix_from_rows(&artifact.w_hidden)?,
            Array1::from_vec(artifact.b_hidden.clone()),
            Array1::from_vec(artifact.w_out.clone()),
            artifact.b_out,
        )
    }

    /// Serializable form of the weights.
    pub fn to_artifact(&self) -> RecurrentArtifact {
        RecurrentArtifact {
            w_static: artifacts::matrix_to_rows(&self.w_static.view()),
            b_static: self.b_static.to_vec(),
            w_input: artifacts::matrix_to_rows(&self.w_input.view()),
            w_hidden: artifacts::matrix_to_rows(&self.w_hidden.view()),
            b_hidden: self.b_hidden.to_vec(),
            w_out: self.w_out.to_vec(),
            b_out: self.b_out,
        }
    }
}

/// Flat-input adapter over a [`RecurrentNet`].
///
/// The estimator works on packed rows, so this adapter splits each row into
/// the static slice `[0, static_dim)` and the dynamic tail, reshapes the
/// tail to `(SEQ_LEN, per_day_dim)` (one row per lag, oldest first), and
/// forwards both to the underlying net. Gradients come back flattened in
/// the same layout.
#[derive(Debug, Clone)]
pub struct SequenceModelAdapter {
    net: RecurrentNet,
}

impl SequenceModelAdapter {
    /// Wrap a recurrent net.
    pub fn new(net: RecurrentNet) -> Self {
        Self { net }
    }

    /// Width of the static attribute block.
    pub fn static_dim(&self) -> usize {
        self.net.static_dim()
    }

    /// Width of one day's dynamic input.
    pub fn per_day_dim(&self) -> usize {
        self.net.per_day_dim()
    }

    fn split_row(&self, row: &ArrayView1<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
        let static_dim = self.static_dim();
        let per_day = self.per_day_dim();
        let tail = row.slice(s![static_dim..]);
        if tail.len() != SEQ_LEN * per_day {
            return Err(ExplainError::shape_mismatch(
                format!("dynamic tail of {} values", SEQ_LEN * per_day),
                format!("dynamic tail of {} values", tail.len()),
            ));
        }
        let static_block = row.slice(s![..static_dim]).to_owned();
        let dynamic = Array2::from_shape_vec((SEQ_LEN, per_day), tail.to_vec())?;
        Ok((static_block, dynamic))
    }
}

impl DifferentiableModel for SequenceModelAdapter {
    fn input_dim(&self) -> usize {
        self.static_dim() + SEQ_LEN * self.per_day_dim()
    }

    fn predict(&self, batch: &ArrayView2<f64>) -> Result<Array1<f64>> {
        self.check_batch(batch)?;
        let mut out = Array1::zeros(batch.nrows());
        for (i, row) in batch.rows().into_iter().enumerate() {
            let (static_block, dynamic) = self.split_row(&row)?;
            out[i] = self
                .net
                .predict_window(&static_block.view(), &dynamic.view())?;
        }
        Ok(out)
    }

    fn input_gradients(&self, batch: &ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_batch(batch)?;
        let static_dim = self.static_dim();
        let per_day = self.per_day_dim();
        let mut out = Array2::zeros((batch.nrows(), self.input_dim()));
        for (i, row) in batch.rows().into_iter().enumerate() {
            let (static_block, dynamic) = self.split_row(&row)?;
            let (d_static, d_dynamic) = self
                .net
                .gradient_window(&static_block.view(), &dynamic.view());
            out.slice_mut(s![i, ..static_dim]).assign(&d_static);
            for (t, grad_row) in d_dynamic.rows().into_iter().enumerate() {
                let start = static_dim + t * per_day;
                out.slice_mut(s![i, start..start + per_day]).assign(&grad_row);
            }
        }
        Ok(out)
    }
}

/// Persisted recurrent weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrentArtifact {
    /// Static encoder weight, `hidden` rows of `static_dim` values.
    pub w_static: Vec<Vec<f64>>,
    /// Static encoder bias.
    pub b_static: Vec<f64>,
    /// Input weight, `hidden` rows of `per_day_dim` values.
    pub w_input: Vec<Vec<f64>>,
    /// Recurrence weight, `hidden` rows of `hidden` values.
    pub w_hidden: Vec<Vec<f64>>,
    /// Recurrence bias.
    pub b_hidden: Vec<f64>,
    /// Output head weight.
    pub w_out: Vec<f64>,
    /// Output head bias.
    pub b_out: f64,
}

impl RecurrentArtifact {
    /// Export to JSON file.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        artifacts::write_json(self, path)
    }

    /// Load from JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        artifacts::read_json(path)
    }
}
