//! Bounded top-k collection.
//!
//! [`BoundedTopK`] keeps the k best entries seen so far in a binary heap
//! whose root is the worst retained entry, so admission and eviction are
//! O(log k) and the current cut-off is O(1).

use crate::types::{DistanceValue, Neighbor, ObjectId};
use std::cmp::Ordering;

/// Which end of the distance scale counts as "best".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smaller distances are better (nearest neighbor search).
    #[default]
    Ascending,
    /// Larger distances are better (farthest neighbor search).
    Descending,
}

impl SortOrder {
    /// Orders `a` before `b` when `a` is better.
    #[inline]
    pub fn compare<D: DistanceValue>(self, a: &D, b: &D) -> Ordering {
        match self {
            SortOrder::Ascending => a.cmp_distance(b),
            SortOrder::Descending => b.cmp_distance(a),
        }
    }
}

/// A retained candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct TopKEntry<D, P> {
    /// Object identifier.
    pub id: ObjectId,
    /// Distance to the query.
    pub distance: D,
    /// Caller payload, typically the object itself.
    pub payload: P,
}

/// Fixed-capacity best-k collector ordered by distance.
///
/// Admission is by distance alone: a full collector accepts a candidate only
/// if it is strictly better than the worst retained one. Among entries tied
/// at the worst distance, the one with the larger id is evicted first.
/// Ids are not de-duplicated; adding the same id twice within one query
/// can retain it twice.
#[derive(Debug, Clone)]
pub struct BoundedTopK<D, P = ()> {
    /// Max-heap of entries by "worseness": the worst retained entry at index 0.
    heap: Vec<TopKEntry<D, P>>,

    /// Maximum capacity.
    k: usize,

    /// Ranking direction.
    order: SortOrder,
}

impl<D: DistanceValue, P> BoundedTopK<D, P> {
    /// Create a nearest-first collector.
    pub fn new(k: usize) -> Self {
        Self::with_order(k, SortOrder::Ascending)
    }

    /// Create a collector with an explicit ranking direction.
    pub fn with_order(k: usize, order: SortOrder) -> Self {
        Self {
            heap: Vec::with_capacity(k.min(4096)),
            k,
            order,
        }
    }

    /// Get the current size.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Get the capacity (k).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.k
    }

    /// Whether k entries are held.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// Ranking direction.
    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// `a` ranks strictly worse than `b`.
    #[inline]
    fn worse(&self, a: &D, b: &D) -> bool {
        self.order.compare(a, b) == Ordering::Greater
    }

    /// Heap order: by distance, then the larger id counts as worse.
    #[inline]
    fn worse_entry(&self, a: &TopKEntry<D, P>, b: &TopKEntry<D, P>) -> bool {
        self.order
            .compare(&a.distance, &b.distance)
            .then_with(|| a.id.cmp(&b.id))
            == Ordering::Greater
    }

    /// Offer a candidate. Returns true if it was retained.
    pub fn add(&mut self, id: ObjectId, distance: D, payload: P) -> bool {
        if self.k == 0 {
            return false;
        }
        let entry = TopKEntry {
            id,
            distance,
            payload,
        };
        if self.heap.len() < self.k {
            self.heap.push(entry);
            let pos = self.heap.len() - 1;
            self.sift_up(pos);
            true
        } else if self.worse(&self.heap[0].distance, &distance) {
            // Replace the worst element
            self.heap[0] = entry;
            self.sift_down(0);
            true
        } else {
            false
        }
    }

    /// Whether a candidate at `distance` would be retained.
    #[inline]
    pub fn is_candidate(&self, distance: D) -> bool {
        if self.heap.len() < self.k {
            return true;
        }
        match self.heap.first() {
            Some(worst) => self.worse(&worst.distance, &distance),
            None => false,
        }
    }

    /// Worst retained distance, or `None` until the collector is full.
    #[inline]
    pub fn worst_distance(&self) -> Option<D> {
        if self.k > 0 && self.is_full() {
            self.heap.first().map(|e| e.distance)
        } else {
            None
        }
    }

    /// Tighten a search radius with the current cut-off.
    ///
    /// Never loosens: the result is `current_range` or something better
    /// ranked (smaller for ascending order, larger for descending).
    pub fn update_range(&self, current_range: D) -> D {
        match self.worst_distance() {
            Some(worst) if self.worse(&current_range, &worst) => worst,
            _ => current_range,
        }
    }

    /// Clear the collector.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Iterate retained entries in heap order.
    pub fn iter(&self) -> impl Iterator<Item = &TopKEntry<D, P>> {
        self.heap.iter()
    }

    /// Consume the collector, returning entries best-first.
    ///
    /// Ties are broken by ascending id so the output is deterministic.
    pub fn into_sorted_vec(self) -> Vec<TopKEntry<D, P>> {
        let order = self.order;
        let mut entries = self.heap;
        entries.sort_by(|a, b| {
            order
                .compare(&a.distance, &b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        entries
    }

    /// Retained `(id, distance)` pairs best-first, leaving the collector intact.
    pub fn neighbors(&self) -> Vec<Neighbor<D>> {
        let mut results: Vec<Neighbor<D>> = self
            .heap
            .iter()
            .map(|e| Neighbor::new(e.id, e.distance))
            .collect();
        results.sort_by(|a, b| {
            self.order
                .compare(&a.distance, &b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        results
    }

    /// Sift up to maintain the heap property.
    #[inline]
    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.worse_entry(&self.heap[pos], &self.heap[parent]) {
                self.heap.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    /// Sift down to maintain the heap property.
    #[inline]
    fn sift_down(&mut self, mut pos: usize) {
        let size = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = 2 * pos + 2;
            let mut largest = pos;

            if left < size && self.worse_entry(&self.heap[left], &self.heap[largest]) {
                largest = left;
            }
            if right < size && self.worse_entry(&self.heap[right], &self.heap[largest]) {
                largest = right;
            }

            if largest != pos {
                self.heap.swap(pos, largest);
                pos = largest;
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_basic() {
        let mut top_k: BoundedTopK<f32> = BoundedTopK::new(3);

        assert!(top_k.add(0, 5.0, ()));
        assert!(top_k.add(1, 3.0, ()));
        assert!(top_k.add(2, 7.0, ()));

        assert_eq!(top_k.len(), 3);
        assert_eq!(top_k.worst_distance(), Some(7.0));

        // This should replace 7.0
        assert!(top_k.add(3, 4.0, ()));
        assert_eq!(top_k.worst_distance(), Some(5.0));

        // This should not be added
        assert!(!top_k.add(4, 6.0, ()));

        let results = top_k.neighbors();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, 1); // distance 3.0
        assert_eq!(results[1].id, 3); // distance 4.0
        assert_eq!(results[2].id, 0); // distance 5.0
    }

    #[test]
    fn test_equal_to_worst_is_discarded() {
        let mut top_k: BoundedTopK<u32> = BoundedTopK::new(2);
        top_k.add(0, 1, ());
        top_k.add(1, 4, ());

        assert!(!top_k.is_candidate(4));
        assert!(!top_k.add(2, 4, ()));
        assert!(top_k.is_candidate(3));
    }

    #[test]
    fn test_top_k_empty() {
        let top_k: BoundedTopK<f32> = BoundedTopK::new(5);
        assert!(top_k.is_empty());
        assert_eq!(top_k.worst_distance(), None);
        assert!(top_k.is_candidate(f32::MAX));
    }

    #[test]
    fn test_zero_capacity_retains_nothing() {
        let mut top_k: BoundedTopK<f32> = BoundedTopK::new(0);
        assert!(!top_k.is_candidate(0.0));
        assert!(!top_k.add(0, 0.0, ()));
        assert_eq!(top_k.worst_distance(), None);
        assert_eq!(top_k.update_range(3.0), 3.0);
    }

    #[test]
    fn test_update_range_only_shrinks() {
        let mut top_k: BoundedTopK<f64> = BoundedTopK::new(2);
        top_k.add(0, 2.0, ());
        // not full yet
        assert_eq!(top_k.update_range(10.0), 10.0);

        top_k.add(1, 6.0, ());
        assert_eq!(top_k.update_range(10.0), 6.0);
        assert_eq!(top_k.update_range(1.0), 1.0);
    }

    #[test]
    fn test_descending_order() {
        let mut top_k: BoundedTopK<i32> = BoundedTopK::with_order(2, SortOrder::Descending);
        for (id, d) in [(0, 5), (1, 9), (2, 1), (3, 7)] {
            top_k.add(id, d, ());
        }

        assert_eq!(top_k.worst_distance(), Some(7));
        assert!(top_k.is_candidate(8));
        assert!(!top_k.is_candidate(6));
        assert_eq!(top_k.update_range(3), 7);

        let ids: Vec<ObjectId> = top_k.into_sorted_vec().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_payload_is_kept() {
        let mut top_k: BoundedTopK<f32, &str> = BoundedTopK::new(2);
        top_k.add(0, 3.0, "far");
        top_k.add(1, 1.0, "near");
        top_k.add(2, 2.0, "middle");

        let entries = top_k.into_sorted_vec();
        let payloads: Vec<&str> = entries.iter().map(|e| e.payload).collect();
        assert_eq!(payloads, vec!["near", "middle"]);
    }

    #[test]
    fn test_duplicate_ids_are_not_merged() {
        let mut top_k: BoundedTopK<f32> = BoundedTopK::new(3);
        top_k.add(7, 1.0, ());
        top_k.add(7, 1.0, ());

        assert_eq!(top_k.len(), 2);
        assert!(top_k.iter().all(|e| e.id == 7));
    }

    #[test]
    fn test_top_k_stress() {
        let mut top_k: BoundedTopK<f32> = BoundedTopK::new(10);

        // Push 100 scrambled values
        for i in 0..100u64 {
            let dist = ((i * 7) % 100) as f32;
            top_k.add(i, dist, ());
            assert!(top_k.len() <= 10);
        }

        let results = top_k.neighbors();
        assert_eq!(results.len(), 10);

        // Verify sorted order
        for i in 1..results.len() {
            assert!(results[i - 1].distance <= results[i].distance);
        }

        // Verify we have the 10 smallest
        let distances: Vec<f32> = results.iter().map(|r| r.distance).collect();
        assert_eq!(distances, (0..10).map(|d| d as f32).collect::<Vec<_>>());
    }
}
