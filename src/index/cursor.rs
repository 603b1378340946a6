//! Ordered Hamming enumeration.
//!
//! The cursor walks radius r = 0, 1, 2, ... around the query code. For each
//! radius it collects every present code at exactly that distance, sorts
//! them, and hands them out before moving on. Two strategies produce the same
//! radius shell:
//!
//! - flip masks: XOR the query with each of the C(m, r) weight-r masks and
//!   probe the present set, used while C(m, r) stays below the number of
//!   present codes;
//! - shell scan: filter the sorted present codes by distance, used once the
//!   mask count would exceed it.
//!
//! Work therefore scales with the number of present codes, not with 2^m.

use crate::index::sketch_index::SketchIndex;
use crate::types::Code;
use crate::utils::{binomial, hamming_distance, SameWeightMasks};

/// Lazy, ordered enumeration of present codes around a query.
///
/// Yields each present code exactly once, at non-decreasing Hamming distance,
/// ties in ascending code order.
#[derive(Debug)]
pub struct HammingCursor<'a> {
    index: &'a SketchIndex,
    query: Code,

    /// Next radius to expand.
    radius: u32,

    /// Codes of the shell currently being handed out.
    shell: Vec<Code>,
    shell_pos: usize,
    shell_radius: u32,

    /// Codes handed out so far.
    emitted: usize,
}

impl<'a> HammingCursor<'a> {
    pub(crate) fn new(index: &'a SketchIndex, query: Code) -> Self {
        Self {
            index,
            query,
            radius: 0,
            shell: Vec::new(),
            shell_pos: 0,
            shell_radius: 0,
            emitted: 0,
        }
    }

    /// The query code.
    pub fn query(&self) -> Code {
        self.query
    }

    /// Number of codes yielded so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Hamming distance of the most recently yielded code.
    pub fn current_radius(&self) -> u32 {
        self.shell_radius
    }

    /// Whether every present code has been yielded.
    pub fn is_exhausted(&self) -> bool {
        self.emitted >= self.index.size()
    }

    /// Yield the next code together with its Hamming distance.
    pub fn next_with_distance(&mut self) -> Option<(Code, u32)> {
        self.next().map(|code| (code, self.shell_radius))
    }

    fn fill_shell(&mut self, radius: u32) {
        self.shell.clear();
        self.shell_pos = 0;
        self.shell_radius = radius;

        let bits = self.index.bits();
        let present = self.index.size() as u64;
        if binomial(bits, radius) <= present {
            for mask in SameWeightMasks::new(bits, radius) {
                let candidate = self.query ^ mask;
                if self.index.contains(candidate) {
                    self.shell.push(candidate);
                }
            }
            self.shell.sort_unstable();
        } else {
            // sorted input keeps the shell sorted
            let query = self.query;
            self.shell.extend(
                self.index
                    .codes()
                    .iter()
                    .copied()
                    .filter(|&code| hamming_distance(query, code) == radius),
            );
        }
    }
}

impl<'a> Iterator for HammingCursor<'a> {
    type Item = Code;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(&code) = self.shell.get(self.shell_pos) {
                self.shell_pos += 1;
                self.emitted += 1;
                return Some(code);
            }
            if self.is_exhausted() || self.radius > self.index.bits() {
                return None;
            }
            let radius = self.radius;
            self.radius += 1;
            self.fill_shell(radius);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.index.size().saturating_sub(self.emitted);
        (0, Some(remaining))
    }
}
