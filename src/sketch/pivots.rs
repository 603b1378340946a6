//! Pivot pairs and their sources.

use crate::error::{Result, SketchError};
use crate::metric::ObjectStore;
use crate::types::{ObjectId, MAX_BITS};
use crate::utils::RandomSampler;
use std::collections::HashSet;
use std::marker::PhantomData;

/// Two reference objects deciding one sketch bit.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotPair<O> {
    /// Bit is 0 when the object is at least as close to `a` as to `b`.
    pub a: O,
    /// Bit is 1 when the object is strictly closer to `b`.
    pub b: O,
}

impl<O> PivotPair<O> {
    /// Create a pair.
    pub fn new(a: O, b: O) -> Self {
        Self { a, b }
    }
}

/// The immutable, ordered set of m pivot pairs; pair i decides bit i.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotSet<O> {
    pairs: Vec<PivotPair<O>>,
}

impl<O> PivotSet<O> {
    /// Create a pivot set of 1..=64 pairs.
    pub fn new(pairs: Vec<PivotPair<O>>) -> Result<Self> {
        if pairs.is_empty() || pairs.len() > MAX_BITS as usize {
            return Err(SketchError::invalid_argument(format!(
                "a pivot set needs 1..={} pairs, got {}",
                MAX_BITS,
                pairs.len()
            )));
        }
        Ok(Self { pairs })
    }

    /// Sketch width in bits.
    pub fn bits(&self) -> u32 {
        self.pairs.len() as u32
    }

    /// Pair deciding bit `i`.
    pub fn pair(&self, i: usize) -> Option<&PivotPair<O>> {
        self.pairs.get(i)
    }

    /// Iterate pairs in bit order.
    pub fn iter(&self) -> impl Iterator<Item = &PivotPair<O>> {
        self.pairs.iter()
    }
}

/// Supplies the pivot set for a given sketch width.
pub trait PivotSource<O> {
    /// Produce exactly `bits` pivot pairs.
    fn pivots(&self, bits: u32) -> Result<PivotSet<O>>;
}

impl<O: Clone> PivotSource<O> for PivotSet<O> {
    fn pivots(&self, bits: u32) -> Result<PivotSet<O>> {
        if self.bits() != bits {
            return Err(SketchError::pivot_unavailable(format!(
                "fixed pivot set has {} pairs, {} requested",
                self.bits(),
                bits
            )));
        }
        Ok(self.clone())
    }
}

/// Draws distinct random object pairs from a store.
pub struct RandomPivotSource<'a, O, S> {
    store: &'a S,
    seed: Option<u64>,
    _phantom: PhantomData<fn() -> O>,
}

impl<'a, O, S: ObjectStore<O>> RandomPivotSource<'a, O, S> {
    /// Create a source over `store`; seeded sources are deterministic.
    pub fn new(store: &'a S, seed: Option<u64>) -> Self {
        Self {
            store,
            seed,
            _phantom: PhantomData,
        }
    }

    fn choose_pairs(&self, ids: &[ObjectId], bits: usize) -> Vec<(ObjectId, ObjectId)> {
        let n = ids.len();
        let mut sampler = RandomSampler::from_option(self.seed);
        let max_pairs = n * (n - 1) / 2;

        if max_pairs <= 4 * bits {
            // Small databases: enumerate every pair and sample from the list
            let mut all = Vec::with_capacity(max_pairs);
            for i in 0..n {
                for j in (i + 1)..n {
                    all.push((ids[i], ids[j]));
                }
            }
            return sampler
                .sample_indices(all.len(), bits)
                .into_iter()
                .map(|i| all[i])
                .collect();
        }

        let mut seen = HashSet::with_capacity(bits);
        let mut pairs = Vec::with_capacity(bits);
        while pairs.len() < bits {
            let i = sampler.index(n);
            let j = sampler.index(n);
            if i == j {
                continue;
            }
            let key = (i.min(j), i.max(j));
            if seen.insert(key) {
                pairs.push((ids[i], ids[j]));
            }
        }
        pairs
    }
}

impl<'a, O, S: ObjectStore<O>> PivotSource<O> for RandomPivotSource<'a, O, S> {
    fn pivots(&self, bits: u32) -> Result<PivotSet<O>> {
        if bits == 0 || bits > MAX_BITS {
            return Err(SketchError::invalid_argument(format!(
                "bits must be in 1..={}, got {}",
                MAX_BITS, bits
            )));
        }
        let ids = self.store.ids()?;
        let n = ids.len();
        if n < 2 || n * (n - 1) / 2 < bits as usize {
            return Err(SketchError::pivot_unavailable(format!(
                "{} objects cannot supply {} distinct pivot pairs",
                n, bits
            )));
        }

        let pairs = self
            .choose_pairs(&ids, bits as usize)
            .into_iter()
            .map(|(a, b)| Ok(PivotPair::new(self.store.require(a)?, self.store.require(b)?)))
            .collect::<Result<Vec<_>>>()?;
        PivotSet::new(pairs)
    }
}
