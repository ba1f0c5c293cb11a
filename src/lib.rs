//! # chrun-explain
//!
//! Gradient-SHAP sensitivity analysis for the frozen CHRUN runoff models.
//!
//! The dashboard answers "which input drove this prediction?" for two model
//! families: a feed-forward net over aggregated drivers plus catchment
//! attributes, and a recurrent net over 7-day windows. Both explainers take
//! a raw query record, rebuild the exact preprocessing the models were
//! trained with (temporal feature derivation and fitted scaling), estimate
//! expected-gradient attributions against a background set, and report
//! signed percentage contributions whose absolute values sum to 100.
//!
//! ## Example
//!
//! ```ignore
//! use chrun_explain::prelude::*;
//! use chrono::NaiveDate;
//!
//! let explainer = StaticExplainer::from_json_files(
//!     "artifacts/scaler_snn.json",
//!     "artifacts/model_snn.json",
//!     "artifacts/background_snn.json",
//! )?;
//!
//! let mut record = QueryRecord::new()
//!     .with_value("P", 12.5)
//!     .with_value("T", 3.1)
//!     .with_date("time", NaiveDate::from_ymd_opt(2021, 6, 1).unwrap());
//! // ... plus the static catchment attributes ...
//!
//! let contributions = explainer.analyze(&record)?;
//! for (name, value) in contributions.sorted_by_magnitude() {
//!     println!("{name}: {value:+.2}%");
//! }
//! ```

pub mod aggregate;
pub mod artifacts;
pub mod background;
pub mod config;
pub mod error;
pub mod estimator;
pub mod explainer;
pub mod features;
pub mod frame;
pub mod model;
pub mod record;
pub mod scaling;

pub mod prelude {
    //! Convenient re-exports of commonly used types.
    pub use crate::aggregate::AggMethod;
    pub use crate::background::BackgroundSample;
    pub use crate::config::AttributionConfig;
    pub use crate::error::{ExplainError, Result};
    pub use crate::estimator::GradientEstimator;
    pub use crate::explainer::{ContributionTable, SequenceExplainer, StaticExplainer};
    pub use crate::frame::FeatureTable;
    pub use crate::model::{
        DifferentiableModel, FeedForwardNet, RecurrentNet, SequenceModelAdapter,
    };
    pub use crate::record::QueryRecord;
    pub use crate::scaling::AffineScaler;
}
