//! Window aggregation for daily driver series.
//!
//! The static model takes one value per driver, so the dashboard reduces
//! each daily series over the query window before building the record:
//! precipitation is typically summed, temperature averaged. The method is
//! selected by name from the host configuration; unknown names fall back
//! to [`AggMethod::Sum`] rather than failing the request.

use ndarray::ArrayView1;

/// Reduction applied to one driver's daily series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggMethod {
    #[default]
    Sum,
    Mean,
    Max,
    Min,
}

impl AggMethod {
    /// Select by configuration name. Unknown names select [`Self::Sum`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "sum" => Self::Sum,
            "mean" => Self::Mean,
            "max" => Self::Max,
            "min" => Self::Min,
            _ => Self::Sum,
        }
    }

    /// Configuration name of this method.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Max => "max",
            Self::Min => "min",
        }
    }

    /// Reduce a series to one value. An empty series reduces to `0.0`.
    pub fn apply(&self, values: &ArrayView1<f64>) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            Self::Sum => values.sum(),
            Self::Mean => values.sum() / values.len() as f64,
            Self::Max => values.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v)),
            Self::Min => values.fold(f64::INFINITY, |acc, &v| acc.min(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_reductions() {
        let series = array![2.0, -1.0, 5.0, 0.0];
        assert_relative_eq!(AggMethod::Sum.apply(&series.view()), 6.0);
        assert_relative_eq!(AggMethod::Mean.apply(&series.view()), 1.5);
        assert_relative_eq!(AggMethod::Max.apply(&series.view()), 5.0);
        assert_relative_eq!(AggMethod::Min.apply(&series.view()), -1.0);
    }

    #[test]
    fn test_empty_series() {
        let series = ndarray::Array1::<f64>::zeros(0);
        assert_relative_eq!(AggMethod::Max.apply(&series.view()), 0.0);
        assert_relative_eq!(AggMethod::Sum.apply(&series.view()), 0.0);
    }

    #[test]
    fn test_name_round_trip_and_fallback() {
        assert_eq!(AggMethod::from_name("mean"), AggMethod::Mean);
        assert_eq!(AggMethod::from_name("min"), AggMethod::Min);
        assert_eq!(AggMethod::from_name("median"), AggMethod::Sum);
        assert_eq!(AggMethod::from_name(""), AggMethod::Sum);
        for method in [AggMethod::Sum, AggMethod::Mean, AggMethod::Max, AggMethod::Min] {
            assert_eq!(AggMethod::from_name(method.name()), method);
        }
    }
}
