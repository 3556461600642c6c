//! Summary statistics over measurement sequences.
//!
//! Variance is the population variance: `sum((v - mean)^2) / n`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Elapsed time substituted for a zero-length interval when converting to a
/// rate, in milliseconds.
pub const ZERO_ELAPSED_SUBSTITUTE_MS: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

/// Compute mean, min, max and population standard deviation.
pub fn summarize(values: &[f64]) -> Result<Summary> {
    let Some(&first) = values.first() else {
        return Err(Error::invalid_input(
            "cannot summarize an empty value sequence",
        ));
    };

    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mut sum = 0.0;
    let mut min = first;
    let mut max = first;
    for &v in values {
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    // Rounding can push the mean a hair outside [min, max] for near-equal
    // inputs.
    let mean = (sum / n).clamp(min, max);

    let power = values
        .iter()
        .map(|v| {
            let delta = v - mean;
            delta * delta
        })
        .sum::<f64>()
        / n;

    Ok(Summary {
        mean,
        min,
        max,
        stddev: power.sqrt(),
    })
}

/// Rate per second for `change` observed over `elapsed_ms`.
#[must_use]
pub fn rate_per_sec(change: f64, elapsed_ms: f64) -> f64 {
    let elapsed_ms = if elapsed_ms == 0.0 {
        ZERO_ELAPSED_SUBSTITUTE_MS
    } else {
        elapsed_ms
    };
    change * 1000.0 / elapsed_ms
}

/// Per-element form of [`rate_per_sec`].
#[must_use]
pub fn rate_per_sec_each(change: f64, elapsed_ms: &[f64]) -> Vec<f64> {
    elapsed_ms
        .iter()
        .map(|&elapsed| rate_per_sec(change, elapsed))
        .collect()
}

/// Incremental accumulator for values that arrive one at a time.
#[derive(Debug, Clone, Default)]
pub struct RunningStat {
    values: Vec<f64>,
    sum: f64,
    sum_abs: f64,
    max_abs: f64,
}

impl RunningStat {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: Vec::new(),
            sum: 0.0,
            sum_abs: 0.0,
            max_abs: 0.0,
        }
    }

    pub fn add(&mut self, value: f64) {
        self.values.push(value);
        self.sum += value;
        self.sum_abs += value.abs();
        self.max_abs = self.max_abs.max(value.abs());
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean of the added values; zero when nothing was added.
    #[must_use]
    pub fn average(&self) -> f64 {
        self.mean_of(self.sum)
    }

    #[must_use]
    pub fn average_abs(&self) -> f64 {
        self.mean_of(self.sum_abs)
    }

    #[must_use]
    pub const fn max_abs(&self) -> f64 {
        self.max_abs
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn summary(&self) -> Result<Summary> {
        summarize(&self.values)
    }

    fn mean_of(&self, total: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.values.len() as f64;
        total / n
    }
}
