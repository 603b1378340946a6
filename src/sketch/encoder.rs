//! Sketch encoder.
//!
//! Turns an object into an m-bit code against a fixed [`PivotSet`].

use crate::error::Result;
use crate::metric::Metric;
use crate::sketch::pivots::PivotSet;
use crate::types::{Code, DistanceValue};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Per-bit counts of produced ones, used to spot badly discriminating pivots.
///
/// Counters are atomic so encoding stays `&self` and can run from several
/// query threads at once.
#[derive(Debug)]
pub struct BitBalance {
    ones: Vec<AtomicU64>,
    total: AtomicU64,
}

impl BitBalance {
    /// Create zeroed counters for `bits` bits.
    pub fn new(bits: u32) -> Self {
        Self {
            ones: (0..bits).map(|_| AtomicU64::new(0)).collect(),
            total: AtomicU64::new(0),
        }
    }

    /// Count one encoded code.
    #[inline]
    pub fn record(&self, code: Code) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let mut rest = code;
        while rest != 0 {
            let bit = rest.trailing_zeros() as usize;
            if let Some(counter) = self.ones.get(bit) {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            rest &= rest - 1;
        }
    }

    /// Number of codes counted.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// `(zeros, ones)` produced for `bit`.
    pub fn counts(&self, bit: u32) -> Option<(u64, u64)> {
        let ones = self.ones.get(bit as usize)?.load(Ordering::Relaxed);
        let total = self.total();
        Some((total.saturating_sub(ones), ones))
    }

    /// Bits whose majority value exceeds `threshold` of all codes.
    pub fn skewed_bits(&self, threshold: f64) -> Vec<u32> {
        let total = self.total();
        if total == 0 {
            return Vec::new();
        }
        (0..self.ones.len() as u32)
            .filter(|&bit| {
                let (zeros, ones) = self.counts(bit).unwrap_or((0, 0));
                zeros.max(ones) as f64 / total as f64 > threshold
            })
            .collect()
    }
}

/// Encodes objects into pivot-pair sketches.
pub struct SketchEncoder<O, M> {
    /// Immutable pivot pairs; pair i decides bit i.
    pivots: PivotSet<O>,

    /// Distance function shared with the rest of the engine.
    metric: M,

    /// Diagnostic bit statistics.
    balance: BitBalance,
}

impl<O, M: Metric<O>> SketchEncoder<O, M> {
    /// Create an encoder for a pivot set.
    pub fn new(pivots: PivotSet<O>, metric: M) -> Self {
        let balance = BitBalance::new(pivots.bits());
        Self {
            pivots,
            metric,
            balance,
        }
    }

    /// Encode an object.
    ///
    /// Bit i is 1 when the object is strictly farther from pair i's `a` than
    /// from its `b`. Deterministic for a fixed pivot set.
    pub fn encode(&self, object: &O) -> Result<Code> {
        let code = self.encode_quiet(object)?;
        self.balance.record(code);
        Ok(code)
    }

    /// Encode without touching the bit statistics.
    pub fn encode_quiet(&self, object: &O) -> Result<Code> {
        let mut code: Code = 0;
        for (i, pair) in self.pivots.iter().enumerate() {
            let to_a = self.metric.distance(object, &pair.a)?;
            let to_b = self.metric.distance(object, &pair.b)?;
            if to_a.cmp_distance(&to_b) == std::cmp::Ordering::Greater {
                code |= 1 << i;
            }
        }
        Ok(code)
    }

    /// Sketch width in bits.
    pub fn bits(&self) -> u32 {
        self.pivots.bits()
    }

    /// The pivot set.
    pub fn pivots(&self) -> &PivotSet<O> {
        &self.pivots
    }

    /// The distance function.
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Bit statistics gathered so far.
    pub fn balance(&self) -> &BitBalance {
        &self.balance
    }

    /// Log and return bits whose majority fraction exceeds `threshold`.
    pub fn report_skew(&self, threshold: f64) -> Vec<u32> {
        let skewed = self.balance.skewed_bits(threshold);
        for &bit in &skewed {
            if let Some((zeros, ones)) = self.balance.counts(bit) {
                warn!(bit, zeros, ones, threshold, "pivot pair barely discriminates");
            }
        }
        skewed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::pivots::PivotPair;

    struct LineMetric;

    impl Metric<f64> for LineMetric {
        type Distance = f64;

        fn distance(&self, a: &f64, b: &f64) -> Result<f64> {
            Ok((a - b).abs())
        }
    }

    fn encoder() -> SketchEncoder<f64, LineMetric> {
        let pivots = PivotSet::new(vec![
            PivotPair::new(0.0, 10.0),
            PivotPair::new(10.0, 0.0),
            PivotPair::new(4.0, 6.0),
        ])
        .unwrap();
        SketchEncoder::new(pivots, LineMetric)
    }

    #[test]
    fn test_encode_bits() {
        let encoder = encoder();

        // 1.0: closer to 0 (bit0 = 0), closer to 0 than 10 (bit1 = 1), closer to 4 (bit2 = 0)
        assert_eq!(encoder.encode(&1.0).unwrap(), 0b010);
        // 9.0: bit0 = 1, bit1 = 0, bit2 = 1
        assert_eq!(encoder.encode(&9.0).unwrap(), 0b101);
        // equidistant counts as 0
        assert_eq!(encoder.encode(&5.0).unwrap(), 0b000);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let encoder = encoder();
        for x in [0.5, 3.3, 7.9] {
            assert_eq!(encoder.encode(&x).unwrap(), encoder.encode(&x).unwrap());
        }
    }

    #[test]
    fn test_bit_balance() {
        let encoder = encoder();
        for x in [1.0, 2.0, 3.0, 9.0] {
            encoder.encode(&x).unwrap();
        }

        let balance = encoder.balance();
        assert_eq!(balance.total(), 4);
        assert_eq!(balance.counts(0), Some((3, 1)));
        assert_eq!(balance.counts(1), Some((1, 3)));
        assert_eq!(balance.counts(5), None);

        // bit 2 is 1 only for 9.0
        assert_eq!(encoder.report_skew(0.7), vec![0, 1, 2]);
        assert!(balance.skewed_bits(0.8).is_empty());

        encoder.encode_quiet(&9.0).unwrap();
        assert_eq!(balance.total(), 4);
    }
}
