//! Frozen differentiable runoff models.
//!
//! This module provides the uniform "vector in, scalar out, differentiable"
//! interface the attribution estimator consumes, through the
//! `DifferentiableModel` trait, plus the two concrete model families the
//! dashboard ships: a feedforward regressor for single-day queries and a
//! recurrent regressor for 7-day windows.

mod feedforward;
mod recurrent;
mod traits;

pub use feedforward::{Activation, DenseLayer, FeedForwardArtifact, FeedForwardNet, LayerArtifact};
pub use recurrent::{RecurrentArtifact, RecurrentNet, SequenceModelAdapter};
pub use traits::DifferentiableModel;
