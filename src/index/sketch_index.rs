//! Present-code set with a one-way freeze.

use crate::brute_force::BoundedTopK;
use crate::error::{Result, SketchError};
use crate::index::cursor::HammingCursor;
use crate::types::{code_mask, Code, MAX_BITS};
use crate::utils::hamming_distance;
use std::collections::HashSet;
use tracing::{debug, info};

/// Set of distinct codes present in the database.
///
/// Built by single-writer inserts, then frozen; after [`SketchIndex::freeze`]
/// it is read-only and can be shared between query threads.
#[derive(Debug, Clone)]
pub struct SketchIndex {
    /// Sketch width.
    bits: u32,

    /// O(1) membership for mask enumeration.
    present: HashSet<Code>,

    /// Ascending snapshot taken at freeze, used for dense radius scans.
    sorted: Vec<Code>,

    /// Whether the build phase has ended.
    frozen: bool,
}

impl SketchIndex {
    /// Create an empty index for `bits`-bit codes.
    pub fn new(bits: u32) -> Result<Self> {
        if bits == 0 || bits > MAX_BITS {
            return Err(SketchError::invalid_argument(format!(
                "bits must be in 1..={}, got {}",
                MAX_BITS, bits
            )));
        }
        Ok(Self {
            bits,
            present: HashSet::new(),
            sorted: Vec::new(),
            frozen: false,
        })
    }

    /// Build a frozen index from codes.
    pub fn from_codes(bits: u32, codes: impl IntoIterator<Item = Code>) -> Result<Self> {
        let mut index = Self::new(bits)?;
        for code in codes {
            index.insert(code)?;
        }
        index.freeze();
        Ok(index)
    }

    /// Sketch width.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of distinct codes.
    pub fn size(&self) -> usize {
        self.present.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Whether the index has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether a code is present.
    #[inline]
    pub fn contains(&self, code: Code) -> bool {
        self.present.contains(&code)
    }

    /// Ascending present codes; empty until frozen.
    pub fn codes(&self) -> &[Code] {
        &self.sorted
    }

    fn check_width(&self, code: Code) -> Result<()> {
        if code & !code_mask(self.bits) != 0 {
            return Err(SketchError::invalid_argument(format!(
                "code {:#x} does not fit in {} bits",
                code, self.bits
            )));
        }
        Ok(())
    }

    /// Add a code. Returns true if it was not present yet.
    pub fn insert(&mut self, code: Code) -> Result<bool> {
        if self.frozen {
            return Err(SketchError::already_frozen(
                "cannot insert into a frozen sketch index",
            ));
        }
        self.check_width(code)?;
        let added = self.present.insert(code);
        if added {
            debug!(code, distinct = self.present.len(), "new sketch code");
        }
        Ok(added)
    }

    /// End the build phase. Idempotent; there is no way back.
    pub fn freeze(&mut self) {
        if self.frozen {
            return;
        }
        let mut sorted: Vec<Code> = self.present.iter().copied().collect();
        sorted.sort_unstable();
        self.sorted = sorted;
        self.frozen = true;
        info!(bits = self.bits, distinct_codes = self.sorted.len(), "sketch index frozen");
    }

    fn check_query(&self, query: Code) -> Result<()> {
        if !self.frozen {
            return Err(SketchError::not_frozen(
                "sketch index must be frozen before it is searched",
            ));
        }
        self.check_width(query)
    }

    /// Lazily enumerate present codes by increasing Hamming distance.
    pub fn cursor(&self, query: Code) -> Result<HammingCursor<'_>> {
        self.check_query(query)?;
        Ok(HammingCursor::new(self, query))
    }

    /// Up to `limit` present codes nearest to `query` in Hamming distance.
    ///
    /// Distances are non-decreasing, ties in ascending code order, and no code
    /// appears twice.
    pub fn search(&self, query: Code, limit: usize) -> Result<Vec<Code>> {
        self.check_query(query)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        Ok(HammingCursor::new(self, query).take(limit).collect())
    }

    /// Same contract as [`SketchIndex::search`], computed by a full scan.
    ///
    /// O(size) per call; useful as a reference and when `limit` is close to
    /// the number of present codes.
    pub fn scan_nearest(&self, query: Code, limit: usize) -> Result<Vec<Code>> {
        self.check_query(query)?;
        let mut top_k: BoundedTopK<u32> = BoundedTopK::new(limit);
        // ascending scan keeps the smaller code on equal distance
        for &code in &self.sorted {
            let distance = hamming_distance(query, code);
            if top_k.is_candidate(distance) {
                top_k.add(code, distance, ());
            }
        }
        Ok(top_k.into_sorted_vec().into_iter().map(|e| e.id).collect())
    }
}
