//! Attribution run configuration.

/// Sampling configuration for gradient attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributionConfig {
    /// Number of (background row, interpolation ratio) draws per query.
    /// Trades estimation variance for compute cost.
    pub num_samples: usize,
    /// Random seed. Every stochastic choice the estimator makes derives
    /// from this value, so equal inputs give equal outputs.
    pub seed: u64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            seed: 42,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget() {
        let config = AttributionConfig::default();
        assert_eq!(config.num_samples, 1000);
        assert_eq!(config.seed, 42);
    }
}
