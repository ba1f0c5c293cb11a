//! Feature catalog for the CHRUN runoff models.
//!
//! Column names follow the dataset variables the models were trained on:
//! per-catchment static attributes (terrain and land-cover fractions), the
//! daily dynamic drivers `P` (precipitation) and `T` (temperature), and the
//! temporal features derived from the query date. The fitted scalers carry a
//! placeholder target column `Y` in their layout, so it appears here too.

/// Per-catchment attributes constant over time.
pub const STATIC_FEATURES: [&str; 28] = [
    "abb",
    "area",
    "atb",
    "btk",
    "dhm",
    "glm",
    "kwt",
    "pfc",
    "frac_water",
    "frac_urban_areas",
    "frac_coniferous_forests",
    "frac_deciduous_forests",
    "frac_mixed_forests",
    "frac_cereals",
    "frac_pasture",
    "frac_bush",
    "frac_unknown",
    "frac_firn",
    "frac_bare_ice",
    "frac_rock",
    "frac_vegetables",
    "frac_alpine_vegetation",
    "frac_wetlands",
    "frac_sub_Alpine_meadow",
    "frac_alpine_meadow",
    "frac_bare_soil_vegetation",
    "frac_grapes",
    "slp",
];

/// Per-day dynamic drivers.
pub const DYNAMIC_FEATURES: [&str; 2] = ["P", "T"];

/// Date column on a query record; replaced by [`YEAR_FEATURE`] and
/// [`DAY_OF_YEAR_FEATURE`] during assembly.
pub const TIME_FEATURE: &str = "time";

/// Placeholder target column present in the fitted scaler layouts.
pub const TARGET_FEATURE: &str = "Y";

/// Derived from the query date.
pub const YEAR_FEATURE: &str = "year";
pub const DAY_OF_YEAR_FEATURE: &str = "day_of_year";

/// Length of the historical window feeding the sequence model, in days.
pub const SEQ_LEN: usize = 7;

/// Scaled features per lag block: `P`, `T`, `year`, `day_of_year`.
pub const PER_DAY_DIM: usize = 4;

/// Lag-qualified column name, e.g. `lagged("P", 3)` is `"P_3"`.
pub fn lagged(name: &str, lag: usize) -> String {
    format!("{name}_{lag}")
}

/// Lag indices in sequence-model row order: oldest day first.
pub fn lags_oldest_first() -> impl Iterator<Item = usize> {
    (0..SEQ_LEN).rev()
}

/// Model input columns for the static explainer, in row order:
/// dynamic drivers, static attributes, then the derived temporal pair.
pub fn static_model_columns() -> Vec<String> {
    let mut columns: Vec<String> = DYNAMIC_FEATURES.iter().map(|s| s.to_string()).collect();
    columns.extend(STATIC_FEATURES.iter().map(|s| s.to_string()));
    columns.push(YEAR_FEATURE.to_string());
    columns.push(DAY_OF_YEAR_FEATURE.to_string());
    columns
}

/// Fitted layout of the static explainer's scaler: the model columns plus
/// the trailing placeholder target.
pub fn static_scaler_columns() -> Vec<String> {
    let mut columns = static_model_columns();
    columns.push(TARGET_FEATURE.to_string());
    columns
}

/// Canonical per-day layout the dynamic scaler was fit with. Every lag
/// block is renamed to this schema before scaling.
pub fn dynamic_scaler_columns() -> Vec<String> {
    vec![
        DYNAMIC_FEATURES[0].to_string(),
        DYNAMIC_FEATURES[1].to_string(),
        YEAR_FEATURE.to_string(),
        DAY_OF_YEAR_FEATURE.to_string(),
        TARGET_FEATURE.to_string(),
    ]
}

/// One scaled lag block in row order, without the placeholder.
pub fn lag_block_columns(lag: usize) -> Vec<String> {
    vec![
        lagged(DYNAMIC_FEATURES[0], lag),
        lagged(DYNAMIC_FEATURES[1], lag),
        lagged(YEAR_FEATURE, lag),
        lagged(DAY_OF_YEAR_FEATURE, lag),
    ]
}

/// Model input columns for the sequence explainer, in row order: static
/// attributes, then one contiguous block per lag, oldest lag first. Row `t`
/// of the model's `(SEQ_LEN, PER_DAY_DIM)` dynamic tensor is exactly the
/// block for lag `SEQ_LEN - 1 - t`.
pub fn sequence_model_columns() -> Vec<String> {
    let mut columns: Vec<String> = STATIC_FEATURES.iter().map(|s| s.to_string()).collect();
    for lag in lags_oldest_first() {
        columns.extend(lag_block_columns(lag));
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_model_columns_layout() {
        let columns = static_model_columns();
        assert_eq!(columns.len(), 2 + STATIC_FEATURES.len() + 2);
        assert_eq!(columns[0], "P");
        assert_eq!(columns[1], "T");
        assert_eq!(columns[2], "abb");
        assert_eq!(columns[columns.len() - 2], "year");
        assert_eq!(columns[columns.len() - 1], "day_of_year");
    }

    #[test]
    fn test_static_scaler_appends_target() {
        let columns = static_scaler_columns();
        assert_eq!(columns.last().map(String::as_str), Some("Y"));
        assert_eq!(columns.len(), static_model_columns().len() + 1);
    }

    #[test]
    fn test_sequence_columns_lag_order() {
        let columns = sequence_model_columns();
        assert_eq!(columns.len(), STATIC_FEATURES.len() + SEQ_LEN * PER_DAY_DIM);
        // static attrs first
        assert_eq!(columns[0], "abb");
        assert_eq!(columns[STATIC_FEATURES.len() - 1], "slp");
        // oldest lag block directly after
        assert_eq!(columns[STATIC_FEATURES.len()], "P_6");
        assert_eq!(columns[STATIC_FEATURES.len() + 3], "day_of_year_6");
        // most recent lag block last
        assert_eq!(columns.last().map(String::as_str), Some("day_of_year_0"));
        assert_eq!(columns[columns.len() - PER_DAY_DIM], "P_0");
    }

    #[test]
    fn test_dynamic_scaler_schema() {
        assert_eq!(
            dynamic_scaler_columns(),
            vec!["P", "T", "year", "day_of_year", "Y"]
        );
    }

    #[test]
    fn test_lagged_names() {
        assert_eq!(lagged("P", 3), "P_3");
        assert_eq!(lagged("day_of_year", 0), "day_of_year_0");
        let lags: Vec<usize> = lags_oldest_first().collect();
        assert_eq!(lags, vec![6, 5, 4, 3, 2, 1, 0]);
    }
}
