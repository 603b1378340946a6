//! Rank-displacement approximation error (EP).

use crate::brute_force::ExactRanking;
use crate::types::{DistanceValue, ObjectId};

/// Normalized rank displacement of an approximate top-k against ground truth.
///
/// `approximate` is best-first. Slot i holding an object of true rank r costs
/// `|r - i|`, where objects tied at one distance may take any rank of their
/// tie group. An empty slot i (fewer than k results) costs `n - i`, an id
/// missing from the ranking costs as if ranked n, and slots at or beyond n
/// cost nothing. The sum is divided by `k * n`, where n is the ranking size,
/// giving a value in [0, 1] that is 0 exactly when the result reproduces the
/// true top-k in order.
pub fn approximation_error<D: DistanceValue>(
    approximate: &[ObjectId],
    truth: &ExactRanking<D>,
    k: usize,
) -> f64 {
    let n = truth.len();
    if n == 0 || k == 0 {
        return 0.0;
    }

    let mut displacement: u128 = 0;
    for slot in 0..k {
        let cost = match approximate.get(slot) {
            Some(&id) => match truth.rank_span(id) {
                Some((first, _)) if slot < first => first - slot,
                Some((_, last)) if slot > last => slot - last,
                Some(_) => 0,
                None => n.abs_diff(slot),
            }
            .min(n),
            None => n.saturating_sub(slot),
        };
        displacement += cost as u128;
    }

    displacement as f64 / (k as f64 * n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Neighbor;

    fn ranking(n: u64) -> ExactRanking<u32> {
        // id i has rank i
        ExactRanking::from_unsorted((0..n).map(|i| Neighbor::new(i, i as u32)).collect())
    }

    #[test]
    fn test_exact_result_has_zero_error() {
        let truth = ranking(10);
        assert_eq!(approximation_error(&[0, 1, 2], &truth, 3), 0.0);
    }

    #[test]
    fn test_order_matters() {
        let truth = ranking(10);
        let ep = approximation_error(&[1, 0, 2], &truth, 3);
        assert!((ep - 2.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_distant_ranks_cost_more() {
        let truth = ranking(100);
        let near = approximation_error(&[0, 1, 5], &truth, 3);
        let far = approximation_error(&[0, 1, 95], &truth, 3);
        assert!(near > 0.0);
        assert!(far > near);
        assert!(far < 1.0);
    }

    #[test]
    fn test_tied_objects_are_interchangeable() {
        // ids 1 and 2 tie at distance 5
        let truth = ExactRanking::from_unsorted(vec![
            Neighbor::new(0, 1u32),
            Neighbor::new(1, 5),
            Neighbor::new(2, 5),
            Neighbor::new(3, 9),
        ]);
        assert_eq!(approximation_error(&[0, 2], &truth, 2), 0.0);
        assert_eq!(approximation_error(&[0, 2, 1], &truth, 3), 0.0);
        // tie group spans ranks 1..=2, slot 0 is one away
        let ep = approximation_error(&[2, 0], &truth, 2);
        assert!((ep - 2.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_id_counts_as_last() {
        let truth = ranking(4);
        let ep = approximation_error(&[0, 99], &truth, 2);
        assert!((ep - 3.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_slots() {
        let truth = ranking(4);
        // nothing found: (4 + 3) / (2 * 4)
        let ep = approximation_error(&[], &truth, 2);
        assert!((ep - 7.0 / 8.0).abs() < 1e-12);
        assert!(approximation_error(&[], &truth, 1) <= 1.0);
    }

    #[test]
    fn test_k_beyond_database() {
        let truth = ranking(3);
        assert_eq!(approximation_error(&[0, 1, 2], &truth, 5), 0.0);
    }

    #[test]
    fn test_empty_inputs() {
        let truth = ranking(0);
        assert_eq!(approximation_error(&[], &truth, 3), 0.0);
        assert_eq!(approximation_error(&[], &ranking(5), 0), 0.0);
    }
}
