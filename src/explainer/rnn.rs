//! Sequence explainer: attributions for the recurrent runoff model.

use chrono::Datelike;
use std::path::Path;

use crate::background::BackgroundSample;
use crate::config::AttributionConfig;
use crate::error::{ExplainError, Result};
use crate::estimator::GradientEstimator;
use crate::explainer::{check_scaler_layout, normalize_signed, ContributionTable};
use crate::features::{
    self, DYNAMIC_FEATURES, PER_DAY_DIM, STATIC_FEATURES, TARGET_FEATURE, TIME_FEATURE,
};
use crate::frame::FeatureTable;
use crate::model::{RecurrentNet, SequenceModelAdapter};
use crate::record::QueryRecord;
use crate::scaling::AffineScaler;

/// Attribution pipeline for the recurrent model over 7-day windows.
///
/// Queries carry lag-suffixed columns (`P_6` .. `P_0`, `T_6` .. `T_0`,
/// `time_6` .. `time_0`): lag 0 is the prediction day and lag `k` is `k`
/// days earlier. Two fitted scalers are involved. The static scaler covers
/// the catchment attributes; the single dynamic scaler was fit on one day's
/// canonical schema and is reused for every lag by renaming the lag block
/// to that schema, transforming, and renaming back.
#[derive(Debug, Clone)]
pub struct SequenceExplainer {
    static_scaler: AffineScaler,
    dynamic_scaler: AffineScaler,
    adapter: SequenceModelAdapter,
    background: BackgroundSample,
    config: AttributionConfig,
    columns: Vec<String>,
}

impl SequenceExplainer {
    /// Bind the scalers, model and background set together.
    ///
    /// The model's split widths must match the canonical layout (all static
    /// attributes, four features per day), each scaler's fitted columns must
    /// match its schema, and the background width must equal the packed row
    /// width. Mismatches fail here rather than on the first query.
    pub fn new(
        static_scaler: AffineScaler,
        dynamic_scaler: AffineScaler,
        net: RecurrentNet,
        background: BackgroundSample,
    ) -> Result<Self> {
        let adapter = SequenceModelAdapter::new(net);
        if adapter.static_dim() != STATIC_FEATURES.len() {
            return Err(ExplainError::shape_mismatch(
                format!("model over {} static attributes", STATIC_FEATURES.len()),
                format!("model over {} static attributes", adapter.static_dim()),
            ));
        }
        if adapter.per_day_dim() != PER_DAY_DIM {
            return Err(ExplainError::shape_mismatch(
                format!("model over {PER_DAY_DIM} features per day"),
                format!("model over {} features per day", adapter.per_day_dim()),
            ));
        }
        let static_names: Vec<String> = STATIC_FEATURES.iter().map(|s| s.to_string()).collect();
        check_scaler_layout(&static_scaler, &static_names)?;
        check_scaler_layout(&dynamic_scaler, &features::dynamic_scaler_columns())?;
        GradientEstimator::new(&adapter, &background)?;
        Ok(Self {
            static_scaler,
            dynamic_scaler,
            adapter,
            background,
            config: AttributionConfig::default(),
            columns: features::sequence_model_columns(),
        })
    }

    /// Load all four artifacts from JSON files.
    pub fn from_json_files(
        static_scaler_path: impl AsRef<Path>,
        dynamic_scaler_path: impl AsRef<Path>,
        model_path: impl AsRef<Path>,
        background_path: impl AsRef<Path>,
    ) -> Result<Self> {
        Self::new(
            AffineScaler::from_json_file(static_scaler_path)?,
            AffineScaler::from_json_file(dynamic_scaler_path)?,
            RecurrentNet::from_json_file(model_path)?,
            BackgroundSample::from_sequence_json_file(background_path)?,
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

    /// Feature names of the produced contribution table, in row order:
    /// static attributes first, then one `[P, T, year, day_of_year]` block
    /// per lag, oldest lag first.
    pub fn feature_names(&self) -> &[String] {
        &self.columns
    }

    /// Explain one query window.
    ///
    /// The record must carry every static attribute plus `P_k`, `T_k` and
    /// the `time_k` date for each lag `k` in `0..7`. Each lag's
    /// `[P, T, year, day_of_year]` block is forward-scaled through the
    /// shared dynamic scaler, the statics through theirs, and the packed
    /// row is attributed against the background set. Validation happens
    /// before any computation, and a record missing required columns fails
    /// with every absent name listed.
    pub fn analyze(&self, record: &QueryRecord) -> Result<ContributionTable> {
        let mut missing = record.missing_values(STATIC_FEATURES.iter().copied());
        for lag in features::lags_oldest_first() {
            for base in DYNAMIC_FEATURES {
                let name = features::lagged(base, lag);
                if record.value(&name).is_none() {
                    missing.push(name);
                }
            }
            let time_name = features::lagged(TIME_FEATURE, lag);
            if record.date(&time_name).is_none() {
                missing.push(time_name);
            }
        }
        if !missing.is_empty() {
            return Err(ExplainError::missing_columns(missing));
        }

        let mut row = Vec::with_capacity(self.columns.len());
        for name in STATIC_FEATURES {
            row.push(
                record
                    .value(name)
                    .ok_or_else(|| ExplainError::missing_columns([name.to_string()]))?,
            );
        }
        for lag in features::lags_oldest_first() {
            let time_name = features::lagged(TIME_FEATURE, lag);
            let date = record
                .date(&time_name)
                .ok_or_else(|| ExplainError::missing_columns([time_name]))?;
            for base in DYNAMIC_FEATURES {
                let name = features::lagged(base, lag);
                row.push(
                    record
                        .value(&name)
                        .ok_or_else(|| ExplainError::missing_columns([name]))?,
                );
            }
            row.push(f64::from(date.year()));
            row.push(f64::from(date.ordinal()));
        }
        let mut table = FeatureTable::from_row(self.columns.clone(), row)?;

        // one shared dynamic scaler, applied lag by lag under canonical names
        let canonical = features::dynamic_scaler_columns();
        for lag in features::lags_oldest_first() {
            let block_names = features::lag_block_columns(lag);
            let block = table.select(&block_names)?;
            let mut renamed = block.renamed(canonical[..PER_DAY_DIM].to_vec())?;
            renamed.push_fill(TARGET_FEATURE, 0.0)?;
            let mut scaled = self.dynamic_scaler.transform(&renamed)?;
            scaled.drop_column(TARGET_FEATURE)?;
            table.assign(&scaled.renamed(block_names)?)?;
        }

        let static_names: Vec<String> = STATIC_FEATURES.iter().map(|s| s.to_string()).collect();
        let static_block = table.select(&static_names)?;
        table.assign(&self.static_scaler.transform(&static_block)?)?;

        let estimator = GradientEstimator::new(&self.adapter, &self.background)?;
        let raw = estimator.estimate_with(&table.values(), &self.config)?;
        let contributions = normalize_signed(&raw.view())?;
        ContributionTable::new(table.columns().to_vec(), contributions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ndarray::{array, Array1, Array2};

    fn identity_static_scaler() -> AffineScaler {
        let columns: Vec<String> = STATIC_FEATURES.iter().map(|s| s.to_string()).collect();
        let n = columns.len();
        AffineScaler::new(columns, Array1::zeros(n), Array1::ones(n)).unwrap()
    }

    fn identity_dynamic_scaler() -> AffineScaler {
        let columns = features::dynamic_scaler_columns();
        let n = columns.len();
        AffineScaler::new(columns, Array1::zeros(n), Array1::ones(n)).unwrap()
    }

    /// Net reading only the most recent day's precipitation; no recurrence,
    /// no static coupling.
    fn last_day_precipitation_net(gain: f64) -> RecurrentNet {
        let hidden = 1;
        let static_dim = STATIC_FEATURES.len();
        RecurrentNet::new(
            Array2::zeros((hidden, static_dim)),
            Array1::zeros(hidden),
            {
                let mut w = Array2::zeros((hidden, PER_DAY_DIM));
                w[[0, 0]] = gain;
                w
            },
            Array2::zeros((hidden, hidden)),
            Array1::zeros(hidden),
            array![1.0],
            0.0,
        )
        .unwrap()
    }

    fn zero_background() -> BackgroundSample {
        let dim = STATIC_FEATURES.len() + features::SEQ_LEN * PER_DAY_DIM;
        BackgroundSample::new(Array2::zeros((1, dim))).unwrap()
    }

    /// Window of zeros ending on 2021-02-01, with `P_0` set.
    fn window_record(p_today: f64) -> QueryRecord {
        let mut record = QueryRecord::new();
        for name in STATIC_FEATURES {
            record.insert(name, 0.0);
        }
        let end = NaiveDate::from_ymd_opt(2021, 2, 1).unwrap();
        for lag in features::lags_oldest_first() {
            record.insert(features::lagged("P", lag), 0.0);
            record.insert(features::lagged("T", lag), 0.0);
            record.insert_date(
                features::lagged("time", lag),
                end - chrono::Days::new(lag as u64),
            );
        }
        record.insert("P_0", p_today);
        record
    }

    fn explainer() -> SequenceExplainer {
        SequenceExplainer::new(
            identity_static_scaler(),
            identity_dynamic_scaler(),
            last_day_precipitation_net(0.05),
            zero_background(),
        )
        .unwrap()
    }

    #[test]
    fn test_feature_names_follow_lag_layout() {
        let explainer = explainer();
        assert_eq!(explainer.feature_names(), features::sequence_model_columns());
    }

    #[test]
    fn test_recent_precipitation_dominates() {
        let explainer = explainer();
        let table = explainer.analyze(&window_record(1.0)).unwrap();

        assert_relative_eq!(table.total_magnitude(), 100.0, epsilon = 1e-6);
        // the net only reads P_0, so the whole budget lands there
        assert!(table.get("P_0").unwrap() > 99.0);
        for lag in 1..features::SEQ_LEN {
            let name = features::lagged("P", lag);
            assert_relative_eq!(table.get(&name).unwrap(), 0.0, epsilon = 1e-9);
        }
        assert_relative_eq!(table.get("T_0").unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_dynamic_scaler_shared_across_lags() {
        // dynamic P mean is 5: a query at exactly 5 lands on the zero
        // background and degenerates, one unit above it does not
        let columns = features::dynamic_scaler_columns();
        let n = columns.len();
        let mut mean = Array1::zeros(n);
        mean[0] = 5.0;
        let dynamic_scaler = AffineScaler::new(columns, mean, Array1::ones(n)).unwrap();

        let explainer = SequenceExplainer::new(
            identity_static_scaler(),
            dynamic_scaler,
            last_day_precipitation_net(0.05),
            zero_background(),
        )
        .unwrap();

        let at_mean = explainer.analyze(&window_record(5.0)).unwrap_err();
        assert!(matches!(at_mean, ExplainError::DegenerateAttribution));

        let above_mean = explainer.analyze(&window_record(6.0)).unwrap();
        assert!(above_mean.get("P_0").unwrap() > 99.0);
    }

    #[test]
    fn test_missing_lagged_columns_listed() {
        let explainer = explainer();
        // window with neither T_3 nor time_5
        let date = NaiveDate::from_ymd_opt(2021, 2, 1).unwrap();
        let mut partial = QueryRecord::new();
        for name in STATIC_FEATURES {
            partial.insert(name, 0.0);
        }
        for lag in features::lags_oldest_first() {
            partial.insert(features::lagged("P", lag), 0.0);
            if lag != 3 {
                partial.insert(features::lagged("T", lag), 0.0);
            }
            if lag != 5 {
                partial.insert_date(features::lagged("time", lag), date);
            }
        }

        match explainer.analyze(&partial).unwrap_err() {
            ExplainError::SchemaMismatch { missing, .. } => {
                assert!(missing.contains(&"T_3".to_string()));
                assert!(missing.contains(&"time_5".to_string()));
                assert_eq!(missing.len(), 2);
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_mismatched_model_rejected_at_construction() {
        // static encoder fit for 3 attributes instead of the full catalog
        let net = RecurrentNet::new(
            Array2::zeros((1, 3)),
            Array1::zeros(1),
            Array2::zeros((1, PER_DAY_DIM)),
            Array2::zeros((1, 1)),
            Array1::zeros(1),
            array![1.0],
            0.0,
        )
        .unwrap();
        let result = SequenceExplainer::new(
            identity_static_scaler(),
            identity_dynamic_scaler(),
            net,
            zero_background(),
        );
        assert!(matches!(result, Err(ExplainError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_repeat_analyze_is_deterministic() {
        // nonzero recurrence so every lag contributes and sampling matters
        let static_dim = STATIC_FEATURES.len();
        let net = RecurrentNet::new(
            Array2::from_elem((2, static_dim), 0.01),
            Array1::zeros(2),
            array![[0.3, -0.1, 0.0, 0.0], [0.1, 0.2, 0.0, 0.0]],
            array![[0.2, 0.1], [-0.1, 0.3]],
            Array1::zeros(2),
            array![0.8, -0.5],
            0.0,
        )
        .unwrap();
        let background = BackgroundSample::standard_normal(
            8,
            STATIC_FEATURES.len() + features::SEQ_LEN * PER_DAY_DIM,
            7,
        )
        .unwrap();
        let explainer = SequenceExplainer::new(
            identity_static_scaler(),
            identity_dynamic_scaler(),
            net,
            background,
        )
        .unwrap();

        let mut record = window_record(1.0);
        record.insert("T_2", -3.0);
        let a = explainer.analyze(&record).unwrap();
        let b = explainer.analyze(&record).unwrap();
        for (x, y) in a.values().iter().zip(b.values().iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-9);
        }
        assert_relative_eq!(a.total_magnitude(), 100.0, epsilon = 1e-6);
    }
}
