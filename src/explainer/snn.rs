//! Static explainer: attributions for the feed-forward runoff model.

use chrono::Datelike;
use std::path::Path;

use crate::background::BackgroundSample;
use crate::config::AttributionConfig;
use crate::error::{ExplainError, Result};
use crate::estimator::GradientEstimator;
use crate::explainer::{check_scaler_layout, normalize_signed, ContributionTable};
use crate::features::{
    self, DAY_OF_YEAR_FEATURE, DYNAMIC_FEATURES, STATIC_FEATURES, TARGET_FEATURE, TIME_FEATURE,
    YEAR_FEATURE,
};
use crate::frame::FeatureTable;
use crate::model::{DifferentiableModel, FeedForwardNet};
use crate::record::QueryRecord;
use crate::scaling::AffineScaler;

/// Attribution pipeline for the static feed-forward model.
///
/// Holds the frozen model together with its fitted scaler and background
/// set; one instance serves any number of [`analyze`](Self::analyze) calls
/// and is safe to share across threads.
#[derive(Debug, Clone)]
pub struct StaticExplainer {
    scaler: AffineScaler,
    model: FeedForwardNet,
    background: BackgroundSample,
    config: AttributionConfig,
    columns: Vec<String>,
}

impl StaticExplainer {
    /// Bind a scaler, model and background set together.
    ///
    /// The three artifacts must agree: the scaler's fitted columns must be
    /// the model columns plus the placeholder target, and model width and
    /// background width must both match the canonical row layout. Mismatches
    /// fail here rather than on the first query.
    pub fn new(
        scaler: AffineScaler,
        model: FeedForwardNet,
        background: BackgroundSample,
    ) -> Result<Self> {
        let columns = features::static_model_columns();
        check_scaler_layout(&scaler, &features::static_scaler_columns())?;
        if model.input_dim() != columns.len() {
            return Err(ExplainError::shape_mismatch(
                format!("model over {} input features", columns.len()),
                format!("model over {} input features", model.input_dim()),
            ));
        }
        GradientEstimator::new(&model, &background)?;
        Ok(Self {
            scaler,
            model,
            background,
            config: AttributionConfig::default(),
            columns,
        })
    }

    /// Load all three artifacts from JSON files.
    pub fn from_json_files(
        scaler_path: impl AsRef<Path>,
        model_path: impl AsRef<Path>,
        background_path: impl AsRef<Path>,
    ) -> Result<Self> {
        Self::new(
            AffineScaler::from_json_file(scaler_path)?,
            FeedForwardNet::from_json_file(model_path)?,
            BackgroundSample::from_json_file(background_path)?,
        )
    }

    /// Replace the sampling configuration (builder form).
    pub fn with_config(mut self, config: AttributionConfig) -> Self {
        self.config = config;
        self
    }

    /// Current sampling configuration.
    pub fn config(&self) -> AttributionConfig {
        self.config
    }

    /// Feature names of the produced contribution table, in row order.
    pub fn feature_names(&self) -> &[String] {
        &self.columns
    }

    /// Explain one query.
    ///
    /// The record must carry `P`, `T`, every static attribute, and the
    /// `time` date; `year` and `day_of_year` are derived from the date, the
    /// row is forward-scaled through the fitted scaler (with the placeholder
    /// target appended for the transform and dropped after), and the scaled
    /// row is attributed against the background set. Validation happens
    /// before any computation, and a record missing required columns fails
    /// with every absent name listed.
    pub fn analyze(&self, record: &QueryRecord) -> Result<ContributionTable> {
        let mut missing = record.missing_values(
            DYNAMIC_FEATURES
                .iter()
                .copied()
                .chain(STATIC_FEATURES.iter().copied()),
        );
        missing.extend(record.missing_dates([TIME_FEATURE]));
        if !missing.is_empty() {
            return Err(ExplainError::missing_columns(missing));
        }

        let date = record
            .date(TIME_FEATURE)
            .ok_or_else(|| ExplainError::missing_columns([TIME_FEATURE.to_string()]))?;
        let mut row = Vec::with_capacity(self.columns.len());
        for name in &self.columns {
            let value = if name == YEAR_FEATURE {
                f64::from(date.year())
            } else if name == DAY_OF_YEAR_FEATURE {
                f64::from(date.ordinal())
            } else {
                record
                    .value(name)
                    .ok_or_else(|| ExplainError::missing_columns([name.clone()]))?
            };
            row.push(value);
        }

        let mut table = FeatureTable::from_row(self.columns.clone(), row)?;
        table.push_fill(TARGET_FEATURE, 0.0)?;
        let mut scaled = self.scaler.transform(&table)?;
        scaled.drop_column(TARGET_FEATURE)?;

        let estimator = GradientEstimator::new(&self.model, &self.background)?;
        let raw = estimator.estimate_with(&scaled.values(), &self.config)?;
        let contributions = normalize_signed(&raw.view())?;
        ContributionTable::new(scaled.columns().to_vec(), contributions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ndarray::{Array1, Array2};

    fn identity_scaler() -> AffineScaler {
        let columns = features::static_scaler_columns();
        let n = columns.len();
        AffineScaler::new(columns, Array1::zeros(n), Array1::ones(n)).unwrap()
    }

    /// Linear model reading only the named columns, zero background row.
    fn linear_model(weights: &[(&str, f64)]) -> FeedForwardNet {
        let columns = features::static_model_columns();
        let mut coefficients = Array1::zeros(columns.len());
        for (name, w) in weights {
            let idx = columns.iter().position(|c| c == name).unwrap();
            coefficients[idx] = *w;
        }
        FeedForwardNet::linear(coefficients, 0.0).unwrap()
    }

    fn zero_background() -> BackgroundSample {
        let dim = features::static_model_columns().len();
        BackgroundSample::new(Array2::zeros((1, dim))).unwrap()
    }

    fn full_record() -> QueryRecord {
        let mut record = QueryRecord::new()
            .with_value("P", 10.0)
            .with_value("T", 2.0)
            .with_date("time", NaiveDate::from_ymd_opt(2021, 2, 1).unwrap());
        for name in STATIC_FEATURES {
            record.insert(name, 0.0);
        }
        record
    }

    #[test]
    fn test_single_driver_takes_all_contribution() {
        let explainer = StaticExplainer::new(
            identity_scaler(),
            linear_model(&[("P", 1.0)]),
            zero_background(),
        )
        .unwrap();

        let table = explainer.analyze(&full_record()).unwrap();
        assert_eq!(table.len(), features::static_model_columns().len());
        assert_relative_eq!(table.get("P").unwrap(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(table.get("T").unwrap(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(table.total_magnitude(), 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_negative_driver_keeps_its_sign() {
        // T pushes the prediction down for this query
        let explainer = StaticExplainer::new(
            identity_scaler(),
            linear_model(&[("P", 1.0), ("T", -2.0)]),
            zero_background(),
        )
        .unwrap();

        let table = explainer.analyze(&full_record()).unwrap();
        // raw means: P -> 10, T -> -4, so 10/14 and -4/14 of the budget
        assert_relative_eq!(table.get("P").unwrap(), 1000.0 / 14.0, epsilon = 1e-9);
        assert_relative_eq!(table.get("T").unwrap(), -400.0 / 14.0, epsilon = 1e-9);
        assert_relative_eq!(table.total_magnitude(), 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_forward_scaling_direction() {
        // P is standardized with mean 10 and scale 4; the query's raw value 2
        // lands at -2 in model space, so against a zero background its
        // contribution must come out negative. The inverse mapping would give
        // 2 * 4 + 10 = 18 and a positive sign instead.
        let columns = features::static_scaler_columns();
        let n = columns.len();
        let p_idx = columns.iter().position(|c| c == "P").unwrap();
        let mut mean = Array1::zeros(n);
        mean[p_idx] = 10.0;
        let mut scale = Array1::ones(n);
        scale[p_idx] = 4.0;
        let scaler = AffineScaler::new(columns, mean, scale).unwrap();

        let explainer =
            StaticExplainer::new(scaler, linear_model(&[("P", 1.0)]), zero_background()).unwrap();
        let mut record = full_record();
        record.insert("P", 2.0);

        let table = explainer.analyze(&record).unwrap();
        assert_relative_eq!(table.get("P").unwrap(), -100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_columns_listed() {
        let explainer = StaticExplainer::new(
            identity_scaler(),
            linear_model(&[("P", 1.0)]),
            zero_background(),
        )
        .unwrap();

        // record with neither T nor the date
        let mut partial = QueryRecord::new().with_value("P", 1.0);
        for name in STATIC_FEATURES {
            partial.insert(name, 0.0);
        }

        match explainer.analyze(&partial).unwrap_err() {
            ExplainError::SchemaMismatch { missing, .. } => {
                assert!(missing.contains(&"T".to_string()));
                assert!(missing.contains(&"time".to_string()));
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_degenerate_query_at_background() {
        let explainer = StaticExplainer::new(
            identity_scaler(),
            linear_model(&[("P", 1.0)]),
            zero_background(),
        )
        .unwrap();

        // every value sits exactly on the single background row, except the
        // derived temporal pair, which the model ignores; all raw
        // attributions vanish
        let mut record = full_record();
        record.insert("P", 0.0);
        record.insert("T", 0.0);
        let err = explainer.analyze(&record).unwrap_err();
        assert!(matches!(err, ExplainError::DegenerateAttribution));
    }

    #[test]
    fn test_mismatched_scaler_rejected_at_construction() {
        let columns = vec!["P".to_string(), "T".to_string()];
        let scaler =
            AffineScaler::new(columns, Array1::zeros(2), Array1::ones(2)).unwrap();
        let result = StaticExplainer::new(scaler, linear_model(&[("P", 1.0)]), zero_background());
        assert!(matches!(result, Err(ExplainError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_mismatched_background_rejected_at_construction() {
        let background = BackgroundSample::new(Array2::zeros((1, 5))).unwrap();
        let result =
            StaticExplainer::new(identity_scaler(), linear_model(&[("P", 1.0)]), background);
        assert!(matches!(result, Err(ExplainError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_repeat_analyze_is_deterministic() {
        let explainer = StaticExplainer::new(
            identity_scaler(),
            linear_model(&[("P", 1.0), ("T", -0.5)]),
            zero_background(),
        )
        .unwrap();
        let record = full_record();

        let a = explainer.analyze(&record).unwrap();
        let b = explainer.analyze(&record).unwrap();
        for (x, y) in a.values().iter().zip(b.values().iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-9);
        }
    }
}
