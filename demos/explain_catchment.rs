//! Walkthrough of both sensitivity pipelines on synthetic artifacts.
//!
//! The example builds a frozen feed-forward model, a frozen recurrent model,
//! their fitted scalers and background sets, then explains one week of
//! weather over an alpine catchment:
//!
//! 1. Aggregate the daily drivers into the static model's inputs
//! 2. Export the static artifacts to JSON and reload them, the way the
//!    dashboard ships them
//! 3. Run both explainers and print the ranked signed contributions

use chrono::NaiveDate;
use chrun_explain::background::BackgroundArtifact;
use chrun_explain::features::{self, lagged, PER_DAY_DIM, STATIC_FEATURES};
use chrun_explain::model::{Activation, DenseLayer};
use chrun_explain::prelude::*;
use ndarray::{array, Array1, Array2};

/// Plausible attribute values for a mid-elevation catchment.
fn catchment_attributes() -> Vec<(&'static str, f64)> {
    vec![
        ("abb", 0.6),
        ("area", 39.2),
        ("atb", 7.8),
        ("btk", 0.9),
        ("dhm", 1620.0),
        ("glm", 0.02),
        ("kwt", 1.4),
        ("pfc", 0.35),
        ("frac_water", 0.01),
        ("frac_urban_areas", 0.02),
        ("frac_coniferous_forests", 0.22),
        ("frac_deciduous_forests", 0.08),
        ("frac_mixed_forests", 0.12),
        ("frac_cereals", 0.03),
        ("frac_pasture", 0.18),
        ("frac_bush", 0.04),
        ("frac_unknown", 0.0),
        ("frac_firn", 0.0),
        ("frac_bare_ice", 0.0),
        ("frac_rock", 0.07),
        ("frac_vegetables", 0.01),
        ("frac_alpine_vegetation", 0.09),
        ("frac_wetlands", 0.01),
        ("frac_sub_Alpine_meadow", 0.06),
        ("frac_alpine_meadow", 0.05),
        ("frac_bare_soil_vegetation", 0.02),
        ("frac_grapes", 0.0),
        ("slp", 21.3),
    ]
}

/// Fitted-style standardization for one static column.
fn static_column_params(name: &str) -> (f64, f64) {
    match name {
        "P" => (12.0, 9.0),
        "T" => (4.5, 7.5),
        "year" => (2010.0, 8.0),
        "day_of_year" => (180.0, 105.0),
        "area" => (45.0, 30.0),
        "dhm" => (1300.0, 500.0),
        "slp" => (18.0, 8.0),
        name if name.starts_with("frac_") => (0.05, 0.1),
        "Y" => (0.0, 1.0),
        _ => (1.0, 0.8),
    }
}

fn static_scaler() -> Result<AffineScaler> {
    let columns = features::static_scaler_columns();
    let params: Vec<(f64, f64)> = columns.iter().map(|c| static_column_params(c)).collect();
    let mean = Array1::from_iter(params.iter().map(|p| p.0));
    let scale = Array1::from_iter(params.iter().map(|p| p.1));
    AffineScaler::new(columns, mean, scale)
}

fn static_net() -> Result<FeedForwardNet> {
    let dim = features::static_model_columns().len();
    let hidden = 4;
    let w1 = Array2::from_shape_fn((hidden, dim), |(i, j)| {
        0.05 * ((((i * 13 + j * 5) % 9) as f64) - 4.0) / 4.0
    });
    let w2 = array![[0.8, -0.3, 0.6, 0.4]];
    FeedForwardNet::new(vec![
        DenseLayer::new(w1, Array1::zeros(hidden), Activation::Tanh)?,
        DenseLayer::new(w2, array![0.2], Activation::Identity)?,
    ])
}

fn sequence_net() -> Result<RecurrentNet> {
    let hidden = 3;
    let w_static = Array2::from_shape_fn((hidden, STATIC_FEATURES.len()), |(i, j)| {
        0.01 * ((((i + 2) * (j + 3)) % 7) as f64) - 0.02
    });
    let w_input = Array2::from_shape_fn((hidden, PER_DAY_DIM), |(i, j)| match j {
        0 => 0.25 + 0.05 * i as f64,
        1 => -0.1,
        _ => 0.02,
    });
    let w_hidden =
        Array2::from_shape_fn((hidden, hidden), |(i, j)| if i == j { 0.3 } else { 0.05 });
    RecurrentNet::new(
        w_static,
        Array1::zeros(hidden),
        w_input,
        w_hidden,
        Array1::zeros(hidden),
        array![0.6, -0.4, 0.5],
        0.1,
    )
}

fn dynamic_scaler() -> Result<AffineScaler> {
    AffineScaler::new(
        features::dynamic_scaler_columns(),
        array![3.2, 4.8, 2010.0, 180.0, 0.0],
        array![5.1, 7.9, 8.0, 105.0, 1.0],
    )
}

fn attribute_scaler() -> Result<AffineScaler> {
    let columns: Vec<String> = STATIC_FEATURES.iter().map(|s| s.to_string()).collect();
    let params: Vec<(f64, f64)> = columns.iter().map(|c| static_column_params(c)).collect();
    let mean = Array1::from_iter(params.iter().map(|p| p.0));
    let scale = Array1::from_iter(params.iter().map(|p| p.1));
    AffineScaler::new(columns, mean, scale)
}

fn print_top(table: &ContributionTable, count: usize) {
    for (name, value) in table.sorted_by_magnitude().into_iter().take(count) {
        println!("  {name:>26}: {value:+7.2}%");
    }
}

fn main() -> Result<()> {
    println!("CHRUN Sensitivity Analysis Example");
    println!("==================================\n");

    // one week of weather ending on the prediction day, oldest day first;
    // a storm passed through four days before the query
    let end = NaiveDate::from_ymd_opt(2021, 2, 1).unwrap();
    let daily_p = array![0.0, 2.5, 24.0, 6.0, 0.0, 0.0, 1.5];
    let daily_t = array![-2.0, -1.0, 0.5, 3.0, 4.5, 5.0, 4.0];

    // ---- static pipeline ----------------------------------------------

    let p_total = AggMethod::from_name("sum").apply(&daily_p.view());
    let t_mean = AggMethod::from_name("mean").apply(&daily_t.view());
    println!("Aggregated drivers for the window:");
    println!("  P (sum):  {p_total:5.1} mm");
    println!("  T (mean): {t_mean:5.1} C\n");

    let mut record = QueryRecord::new()
        .with_value("P", p_total)
        .with_value("T", t_mean)
        .with_date("time", end);
    for (name, value) in catchment_attributes() {
        record.insert(name, value);
    }

    // export the frozen artifacts and load the explainer back from disk
    let scaler = static_scaler()?;
    let model = static_net()?;
    let background =
        BackgroundSample::standard_normal(32, features::static_model_columns().len(), 42)?;

    scaler.to_artifact().to_json_file("scaler_snn.json")?;
    model.to_artifact().to_json_file("model_snn.json")?;
    let rows: Vec<Vec<f64>> = background
        .view()
        .rows()
        .into_iter()
        .map(|row| row.to_vec())
        .collect();
    BackgroundArtifact { rows }.to_json_file("background_snn.json")?;
    println!("Static artifacts written: scaler_snn.json, model_snn.json, background_snn.json");

    let static_explainer =
        StaticExplainer::from_json_files("scaler_snn.json", "model_snn.json", "background_snn.json")?;
    let config = static_explainer.config();
    println!(
        "Sampling: {} draws, seed {}\n",
        config.num_samples, config.seed
    );

    let static_table = static_explainer.analyze(&record)?;
    println!("Static model, top contributions:");
    print_top(&static_table, 8);
    println!(
        "  (absolute contributions sum to {:.4})\n",
        static_table.total_magnitude()
    );

    // ---- sequence pipeline --------------------------------------------

    let mut window = QueryRecord::new();
    for (name, value) in catchment_attributes() {
        window.insert(name, value);
    }
    for (offset, lag) in features::lags_oldest_first().enumerate() {
        window.insert(lagged("P", lag), daily_p[offset]);
        window.insert(lagged("T", lag), daily_t[offset]);
        window.insert_date(lagged("time", lag), end - chrono::Days::new(lag as u64));
    }

    let sequence_dim = STATIC_FEATURES.len() + features::SEQ_LEN * PER_DAY_DIM;
    let sequence_explainer = SequenceExplainer::new(
        attribute_scaler()?,
        dynamic_scaler()?,
        sequence_net()?,
        BackgroundSample::standard_normal(32, sequence_dim, 43)?,
    )?;

    let sequence_table = sequence_explainer.analyze(&window)?;
    println!("Sequence model, top contributions over the 7-day window:");
    print_top(&sequence_table, 10);
    println!(
        "  (absolute contributions sum to {:.4})\n",
        sequence_table.total_magnitude()
    );

    println!("Example completed successfully!");
    Ok(())
}
