//! Fairness statistics over per-pair loss samples.

use std::fmt;

use super::path::LossRate;

/// Mean and population standard deviation of pair loss rates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FairnessStats {
    mean: f64,
    std_dev: f64,
}

impl FairnessStats {
    /// Compute statistics from one sample per node pair. Empty input yields zeros.
    #[must_use]
    pub fn from_samples(samples: &[LossRate]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let count = samples.len() as f64;
        let mean = samples.iter().map(|&s| f64::from(s)).sum::<f64>() / count;
        let variance = samples
            .iter()
            .map(|&s| {
                let delta = f64::from(s) - mean;
                delta * delta
            })
            .sum::<f64>()
            / count;
        Self {
            mean,
            std_dev: variance.sqrt(),
        }
    }

    /// Mean loss rate.
    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation.
    #[must_use]
    pub const fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Comfortably under-congested: strictly below `mean - std_dev`.
    #[must_use]
    pub fn is_rich(&self, sample: LossRate) -> bool {
        f64::from(sample) < self.mean - self.std_dev
    }

    /// Unduly congested: strictly above `mean + std_dev`.
    #[must_use]
    pub fn is_poor(&self, sample: LossRate) -> bool {
        f64::from(sample) > self.mean + self.std_dev
    }
}

impl fmt::Display for FairnessStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean={:.2}% sd={:.2}%",
            self.mean / 100.0,
            self.std_dev / 100.0
        )
    }
}
