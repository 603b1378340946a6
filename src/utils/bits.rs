//! Bit manipulation utilities.

use crate::types::{code_mask, Code};

/// Compute Hamming distance between two codes.
#[inline]
pub fn hamming_distance(a: Code, b: Code) -> u32 {
    (a ^ b).count_ones()
}

/// Smallest mask of the given Hamming weight (`weight` low bits set).
#[inline]
pub fn first_mask(weight: u32) -> Code {
    code_mask(weight)
}

/// Next larger mask with the same number of set bits, restricted to `bits` bits.
///
/// Walks the weight-r masks in increasing numeric order, which is also the
/// lexicographic order over bit positions read from the top. Returns `None`
/// once the successor would need a bit at or above `bits`. Arithmetic runs in
/// `u128` so 64-bit codes cannot overflow.
pub fn next_same_weight(mask: Code, bits: u32) -> Option<Code> {
    if mask == 0 {
        return None;
    }
    let x = mask as u128;
    let lowest = x & x.wrapping_neg();
    let ripple = x + lowest;
    let ones = ((ripple ^ x) >> 2) / lowest;
    let next = ripple | ones;
    if next >> bits != 0 {
        None
    } else {
        Some(next as Code)
    }
}

/// Iterator over all masks of a given weight within `bits` bits, ascending.
pub struct SameWeightMasks {
    next: Option<Code>,
    bits: u32,
}

impl SameWeightMasks {
    /// Create the iterator; yields nothing when `weight > bits`.
    pub fn new(bits: u32, weight: u32) -> Self {
        let next = if weight > bits {
            None
        } else {
            Some(first_mask(weight))
        };
        Self { next, bits }
    }
}

impl Iterator for SameWeightMasks {
    type Item = Code;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        // weight 0 has exactly one mask
        self.next = if current == 0 {
            None
        } else {
            next_same_weight(current, self.bits)
        };
        Some(current)
    }
}

/// Binomial coefficient C(n, r), saturating at `u64::MAX`.
pub fn binomial(n: u32, r: u32) -> u64 {
    if r > n {
        return 0;
    }
    let r = r.min(n - r) as u128;
    let n = n as u128;
    let mut acc: u128 = 1;
    for i in 0..r {
        // exact at every step: acc * (n - i) is divisible by (i + 1)
        acc = acc * (n - i) / (i + 1);
        if acc > u64::MAX as u128 {
            return u64::MAX;
        }
    }
    acc as u64
}

/// Number of bytes in a fixed-width key for a `bits`-bit code.
#[inline]
pub const fn code_key_len(bits: u32) -> usize {
    ((bits + 7) / 8) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance(0b1010, 0b0101), 4);
        assert_eq!(hamming_distance(7, 7), 0);
        assert_eq!(hamming_distance(0, u64::MAX), 64);
    }

    #[test]
    fn test_same_weight_masks_small() {
        let masks: Vec<Code> = SameWeightMasks::new(4, 2).collect();
        assert_eq!(masks, vec![0b0011, 0b0101, 0b0110, 0b1001, 0b1010, 0b1100]);
    }

    #[test]
    fn test_same_weight_edge_weights() {
        assert_eq!(SameWeightMasks::new(5, 0).collect::<Vec<_>>(), vec![0]);
        assert_eq!(SameWeightMasks::new(3, 3).collect::<Vec<_>>(), vec![0b111]);
        assert!(SameWeightMasks::new(3, 4).next().is_none());
    }

    #[test]
    fn test_same_weight_full_width() {
        let masks: Vec<Code> = SameWeightMasks::new(64, 1).collect();
        assert_eq!(masks.len(), 64);
        assert_eq!(*masks.last().unwrap(), 1u64 << 63);
        assert_eq!(SameWeightMasks::new(64, 64).count(), 1);
        assert_eq!(SameWeightMasks::new(64, 63).count(), 64);
    }

    #[test]
    fn test_mask_count_matches_binomial() {
        for bits in 1..=10 {
            for weight in 0..=bits {
                let count = SameWeightMasks::new(bits, weight).count() as u64;
                assert_eq!(count, binomial(bits, weight), "C({}, {})", bits, weight);
            }
        }
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(64, 32), 1_832_624_140_942_590_534);
        assert_eq!(binomial(3, 5), 0);
        assert_eq!(binomial(0, 0), 1);
    }

    #[test]
    fn test_code_key_len() {
        assert_eq!(code_key_len(1), 1);
        assert_eq!(code_key_len(8), 1);
        assert_eq!(code_key_len(9), 2);
        assert_eq!(code_key_len(64), 8);
    }
}
