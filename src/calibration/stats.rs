//! Running statistics and per-k budget tables.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Streaming count, mean and variance (Welford's update).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    /// Create empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observation.
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Number of observations.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sample mean; 0 when empty.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Unbiased sample variance; 0 with fewer than two observations.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).max(0.0)
        }
    }

    /// Sample standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Calibrated bucket budgets keyed by k.
///
/// Read-only at query time. Serializable so a table can be stored alongside
/// the buckets and reloaded with the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorTable {
    /// Multiplier on the standard deviation.
    confidence_alpha: f64,

    /// EP ceiling the samples were measured against.
    target_error: f64,

    /// Distinct codes in the index at calibration time.
    total_buckets: usize,

    /// Buckets-needed statistics per calibrated k.
    entries: BTreeMap<usize, RunningStats>,
}

impl EstimatorTable {
    /// Create an empty table.
    pub fn new(confidence_alpha: f64, target_error: f64, total_buckets: usize) -> Self {
        Self {
            confidence_alpha,
            target_error,
            total_buckets,
            entries: BTreeMap::new(),
        }
    }

    /// Record the buckets one sample query needed for `k`.
    pub fn record(&mut self, k: usize, buckets: usize) {
        self.entries.entry(k).or_default().push(buckets as f64);
    }

    /// Statistics for exactly `k`.
    pub fn entry(&self, k: usize) -> Option<&RunningStats> {
        self.entries.get(&k)
    }

    /// Calibrated k values, ascending.
    pub fn calibrated_ks(&self) -> Vec<usize> {
        self.entries.keys().copied().collect()
    }

    /// Confidence multiplier.
    pub fn confidence_alpha(&self) -> f64 {
        self.confidence_alpha
    }

    /// Target approximation error.
    pub fn target_error(&self) -> f64 {
        self.target_error
    }

    /// Distinct codes at calibration time.
    pub fn total_buckets(&self) -> usize {
        self.total_buckets
    }

    /// Change the confidence multiplier without recalibrating.
    pub fn with_confidence_alpha(mut self, alpha: f64) -> Self {
        self.confidence_alpha = alpha;
        self
    }

    /// Upper-confidence number of buckets to read for `k`.
    ///
    /// `round(mean + alpha * std_dev)` of the smallest calibrated k' >= k,
    /// at least 1. `None` when `k` exceeds every calibrated value.
    ///
    /// Tables fitted with alpha = 0 give budgets that never grow as the
    /// target error loosens. With alpha > 0 the standard deviation term can
    /// move either way, so that ordering is not guaranteed.
    pub fn estimate_bucket_budget(&self, k: usize) -> Option<usize> {
        let (_, stats) = self.entries.range(k..).next()?;
        if stats.count() == 0 {
            return None;
        }
        let estimate = stats.mean() + self.confidence_alpha * stats.std_dev();
        Some((estimate.round().max(1.0)) as usize)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::new();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.push(x);
        }
        assert_eq!(stats.count(), 8);
        assert!((stats.mean() - 5.0).abs() < 1e-12);
        // population variance 4, sample variance 32 / 7
        assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_running_stats_degenerate() {
        let mut stats = RunningStats::new();
        assert_eq!(stats.variance(), 0.0);
        stats.push(3.0);
        assert_eq!(stats.mean(), 3.0);
        assert_eq!(stats.std_dev(), 0.0);
    }

    #[test]
    fn test_budget_estimate() {
        let mut table = EstimatorTable::new(1.0, 0.1, 100);
        for b in [4, 6] {
            table.record(10, b);
        }
        // mean 5, sample std dev sqrt(2)
        assert_eq!(table.estimate_bucket_budget(10), Some(6));
        assert_eq!(table.clone().with_confidence_alpha(0.0).estimate_bucket_budget(10), Some(5));
        assert_eq!(table.clone().with_confidence_alpha(3.0).estimate_bucket_budget(10), Some(9));
    }

    #[test]
    fn test_budget_uses_next_calibrated_k() {
        let mut table = EstimatorTable::new(0.0, 0.1, 100);
        table.record(1, 2);
        table.record(10, 8);

        assert_eq!(table.estimate_bucket_budget(1), Some(2));
        assert_eq!(table.estimate_bucket_budget(5), Some(8));
        assert_eq!(table.estimate_bucket_budget(11), None);
        assert_eq!(table.calibrated_ks(), vec![1, 10]);
    }

    #[test]
    fn test_budget_is_at_least_one() {
        let mut table = EstimatorTable::new(0.0, 1.0, 4);
        table.record(3, 0);
        assert_eq!(table.estimate_bucket_budget(3), Some(1));
    }

    #[test]
    fn test_table_json_roundtrip() {
        let mut table = EstimatorTable::new(1.5, 0.25, 42);
        table.record(1, 3);
        table.record(1, 5);
        table.record(100, 30);

        let json = table.to_json().unwrap();
        let restored = EstimatorTable::from_json(&json).unwrap();
        assert_eq!(restored, table);
        assert!(EstimatorTable::from_json("{not json").is_err());
    }
}
