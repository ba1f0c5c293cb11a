//! Feedforward regressor for single-day queries.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::artifacts;
use crate::error::{ExplainError, Result};
use crate::model::traits::DifferentiableModel;

/// Layer activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// Identity (no transformation).
    Identity,
    /// Rectified linear unit.
    Relu,
    /// Hyperbolic tangent.
    Tanh,
}

impl Activation {
    /// Apply to a single pre-activation value.
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Identity => x,
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
        }
    }

    /// Derivative expressed in terms of the activation OUTPUT `y`.
    ///
    /// For tanh this is `1 - y^2`; for relu the output already tells whether
    /// the unit was active. Avoids caching pre-activations in the backward
    /// pass.
    pub fn grad_from_output(&self, y: f64) -> f64 {
        match self {
            Activation::Identity => 1.0,
            Activation::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Tanh => 1.0 - y * y,
        }
    }
}

/// One dense layer: `act(weight . x + bias)`.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    weight: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl DenseLayer {
    /// Build a layer; `weight` is `out_dim x in_dim` and `bias` has
    /// `out_dim` entries.
    pub fn new(weight: Array2<f64>, bias: Array1<f64>, activation: Activation) -> Result<Self> {
        if bias.len() != weight.nrows() {
            return Err(ExplainError::shape_mismatch(
                format!("bias of length {}", weight.nrows()),
                format!("bias of length {}", bias.len()),
            ));
        }
        Ok(Self {
            weight,
            bias,
            activation,
        })
    }

    fn in_dim(&self) -> usize {
        self.weight.ncols()
    }

    fn out_dim(&self) -> usize {
        self.weight.nrows()
    }

    fn forward(&self, input: &ArrayView2<f64>) -> Array2<f64> {
        let z = input.dot(&self.weight.t()) + &self.bias;
        z.mapv(|v| self.activation.apply(v))
    }
}

/// Frozen dense regressor with a scalar output.
#[derive(Debug, Clone)]
pub struct FeedForwardNet {
    layers: Vec<DenseLayer>,
}

impl FeedForwardNet {
    /// Build from a layer stack. Layer widths must chain, and the final
    /// layer must produce exactly one output.
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self> {
        let last = layers.last().ok_or_else(|| {
            ExplainError::InvalidParameter("model needs at least one layer".to_string())
        })?;
        if last.out_dim() != 1 {
            return Err(ExplainError::shape_mismatch(
                "final layer with 1 output",
                format!("final layer with {} outputs", last.out_dim()),
            ));
        }
        for pair in layers.windows(2) {
            if pair[1].in_dim() != pair[0].out_dim() {
                return Err(ExplainError::shape_mismatch(
                    format!("layer input of width {}", pair[0].out_dim()),
                    format!("layer input of width {}", pair[1].in_dim()),
                ));
            }
        }
        Ok(Self { layers })
    }

    /// Single-layer linear regressor `y = coefficients . x + bias`.
    pub fn linear(coefficients: Array1<f64>, bias: f64) -> Result<Self> {
        let weight = coefficients.insert_axis(Axis(0));
        let layer = DenseLayer::new(weight, Array1::from_vec(vec![bias]), Activation::Identity)?;
        Self::new(vec![layer])
    }

    /// Activations per layer for one batch, in forward order.
    fn forward_cached(&self, batch: &ArrayView2<f64>) -> Vec<Array2<f64>> {
        let mut activations = Vec::with_capacity(self.layers.len());
        let mut current = self.layers[0].forward(batch);
        activations.push(current.clone());
        for layer in &self.layers[1..] {
            current = layer.forward(&current.view());
            activations.push(current.clone());
        }
        activations
    }

    /// Load from a JSON artifact file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_artifact(&FeedForwardArtifact::from_json_file(path)?)
    }

    /// Build from a deserialized artifact.
    pub fn from_artifact(artifact: &FeedForwardArtifact) -> Result<Self> {
        let layers = artifact
            .layers
            .iter()
            .map(|layer| {
                DenseLayer::new(
                    artifacts::matrix_from_rows(&layer.weight)?,
                    Array1::from_vec(layer.bias.clone()),
                    layer.activation,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(layers)
    }

    /// Serializable form of the weights.
    pub fn to_artifact(&self) -> FeedForwardArtifact {
        FeedForwardArtifact {
            layers: self
                .layers
                .iter()
                .map(|layer| LayerArtifact {
                    weight: artifacts::matrix_to_rows(&layer.weight.view()),
                    bias: layer.bias.to_vec(),
                    activation: layer.activation,
                })
                .collect(),
        }
    }
}

impl DifferentiableModel for FeedForwardNet {
    fn input_dim(&self) -> usize {
        self.layers[0].in_dim()
    }

    fn predict(&self, batch: &ArrayView2<f64>) -> Result<Array1<f64>> {
        self.check_batch(batch)?;
        let activations = self.forward_cached(batch);
        let output = activations.last().ok_or_else(|| {
            ExplainError::InvalidParameter("model needs at least one layer".to_string())
        })?;
        Ok(output.column(0).to_owned())
    }

    fn input_gradients(&self, batch: &ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_batch(batch)?;
        let activations = self.forward_cached(batch);

        // d y / d a_last is 1 for a scalar head; chain backwards through
        // each layer's activation derivative and weight matrix.
        let mut grad = Array2::ones((batch.nrows(), 1));
        for (layer, output) in self.layers.iter().zip(activations.iter()).rev() {
            let deriv = output.mapv(|y| layer.activation.grad_from_output(y));
            grad = (&grad * &deriv).dot(&layer.weight);
        }
        Ok(grad)
    }
}

/// Persisted feedforward weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedForwardArtifact {
    /// Layers in forward order.
    pub layers: Vec<LayerArtifact>,
}

/// One persisted dense layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerArtifact {
    /// Weight matrix, `out_dim` rows of `in_dim` values.
    pub weight: Vec<Vec<f64>>,
    /// Bias, one value per output.
    pub bias: Vec<f64>,
    /// Activation applied after the affine map.
    pub activation: Activation,
}

impl FeedForwardArtifact {
    /// Export to JSON file.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        artifacts::write_json(self, path)
    }

    /// Load from JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        artifacts::read_json(path)
    }
}
