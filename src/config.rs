//! Configuration types for bitsketch.
//!
//! [`SketchConfig`] gathers every knob that shapes the index and its
//! calibration. It round-trips through serde so a deployment can keep it
//! next to the persisted buckets.

use crate::error::{Result, SketchError};
use crate::types::MAX_BITS;
use serde::{Deserialize, Serialize};

/// Main configuration for a sketch index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    /// Sketch width in bits (one pivot pair per bit), 1..=64.
    pub bits: u32,

    /// Number of database objects used as synthetic calibration queries.
    pub sample_size: usize,

    /// The k values that get a calibrated bucket budget.
    pub target_ks: Vec<usize>,

    /// Multiplier on the standard deviation when estimating a budget.
    pub confidence_alpha: f64,

    /// Approximation error ceiling the calibration aims for, in [0, 1].
    pub target_error: f64,

    /// Seed for calibration sampling and random pivot selection.
    pub seed: Option<u64>,

    /// Majority fraction above which a sketch bit is reported as skewed.
    pub skew_threshold: f64,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            bits: 32,
            sample_size: 100,
            target_ks: vec![1, 10, 100],
            confidence_alpha: 1.0,
            target_error: 0.01,
            seed: None,
            skew_threshold: 0.95,
        }
    }
}

impl SketchConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sketch width.
    pub fn with_bits(mut self, bits: u32) -> Self {
        self.bits = bits;
        self
    }

    /// Set the calibration sample size.
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Set the k values to calibrate.
    pub fn with_target_ks(mut self, ks: Vec<usize>) -> Self {
        self.target_ks = ks;
        self
    }

    /// Set the confidence multiplier.
    pub fn with_confidence_alpha(mut self, alpha: f64) -> Self {
        self.confidence_alpha = alpha;
        self
    }

    /// Set the target approximation error.
    pub fn with_target_error(mut self, target_error: f64) -> Self {
        self.target_error = target_error;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the skew reporting threshold.
    pub fn with_skew_threshold(mut self, threshold: f64) -> Self {
        self.skew_threshold = threshold;
        self
    }

    /// Check every field, naming the first invalid one.
    pub fn validate(&self) -> Result<()> {
        if self.bits == 0 || self.bits > MAX_BITS {
            return Err(SketchError::invalid_argument(format!(
                "bits must be in 1..={}, got {}",
                MAX_BITS, self.bits
            )));
        }
        if self.sample_size == 0 {
            return Err(SketchError::invalid_argument("sample_size must be positive"));
        }
        if self.target_ks.iter().any(|&k| k == 0) {
            return Err(SketchError::invalid_argument("target_ks must not contain 0"));
        }
        if !(self.confidence_alpha >= 0.0) || !self.confidence_alpha.is_finite() {
            return Err(SketchError::invalid_argument(format!(
                "confidence_alpha must be a finite value >= 0, got {}",
                self.confidence_alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.target_error) {
            return Err(SketchError::invalid_argument(format!(
                "target_error must be in [0, 1], got {}",
                self.target_error
            )));
        }
        if !(self.skew_threshold > 0.5 && self.skew_threshold <= 1.0) {
            return Err(SketchError::invalid_argument(format!(
                "skew_threshold must be in (0.5, 1], got {}",
                self.skew_threshold
            )));
        }
        Ok(())
    }

    /// Target ks sorted and deduplicated.
    pub fn normalized_ks(&self) -> Vec<usize> {
        let mut ks = self.target_ks.clone();
        ks.sort_unstable();
        ks.dedup();
        ks
    }
}
