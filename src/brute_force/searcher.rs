//! Brute-force searcher implementation.
//!
//! This module computes exact distances from a query to every stored object.

use crate::brute_force::top_k::BoundedTopK;
use crate::error::Result;
use crate::metric::{Metric, ObjectStore};
use crate::types::{DistanceValue, Neighbor, ObjectId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::marker::PhantomData;

/// Exhaustive nearest neighbor searcher.
///
/// Computes the exact distance to every object in the store; used for
/// ground truth and for validating approximate results.
pub struct BruteForceSearcher<'a, O, M, S> {
    /// The objects to search.
    store: &'a S,

    /// Distance function.
    metric: &'a M,

    _phantom: PhantomData<fn() -> O>,
}

impl<'a, O, M, S> BruteForceSearcher<'a, O, M, S>
where
    M: Metric<O>,
    S: ObjectStore<O>,
{
    /// Create a new brute-force searcher.
    pub fn new(store: &'a S, metric: &'a M) -> Self {
        Self {
            store,
            metric,
            _phantom: PhantomData,
        }
    }

    /// Search for the k nearest neighbors.
    pub fn search(&self, query: &O, k: usize) -> Result<Vec<Neighbor<M::Distance>>> {
        let mut top_k = BoundedTopK::new(k);
        for id in self.store.ids()? {
            let object = self.store.require(id)?;
            let distance = self.metric.distance(query, &object)?;
            top_k.add(id, distance, ());
        }
        Ok(top_k.neighbors())
    }

    /// Search for all objects within `radius` of the query, nearest first.
    pub fn search_radius(
        &self,
        query: &O,
        radius: M::Distance,
    ) -> Result<Vec<Neighbor<M::Distance>>> {
        let mut ranking = self.rank(query)?;
        ranking
            .order
            .retain(|n| n.distance.cmp_distance(&radius) != Ordering::Greater);
        Ok(ranking.order)
    }

    /// Rank every stored object by distance to the query.
    pub fn rank(&self, query: &O) -> Result<ExactRanking<M::Distance>> {
        let ids = self.store.ids()?;
        let mut order = Vec::with_capacity(ids.len());
        for id in ids {
            let object = self.store.require(id)?;
            let distance = self.metric.distance(query, &object)?;
            order.push(Neighbor::new(id, distance));
        }
        Ok(ExactRanking::from_unsorted(order))
    }
}

/// Complete ranking of the database for one query.
///
/// Ordered by ascending distance, ties broken by ascending id.
#[derive(Debug, Clone)]
pub struct ExactRanking<D> {
    order: Vec<Neighbor<D>>,
    positions: HashMap<ObjectId, usize>,

    /// For each rank, the first and last rank sharing its distance.
    tie_spans: Vec<(usize, usize)>,
}

impl<D: DistanceValue> ExactRanking<D> {
    /// Sort neighbors into a ranking.
    pub fn from_unsorted(mut order: Vec<Neighbor<D>>) -> Self {
        order.sort_by(|a, b| {
            a.distance
                .cmp_distance(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        let positions = order
            .iter()
            .enumerate()
            .map(|(rank, n)| (n.id, rank))
            .collect();

        let mut tie_spans = Vec::with_capacity(order.len());
        let mut start = 0;
        for i in 1..=order.len() {
            let group_ends = i == order.len()
                || order[i].distance.cmp_distance(&order[start].distance) != Ordering::Equal;
            if group_ends {
                tie_spans.extend(std::iter::repeat((start, i - 1)).take(i - start));
                start = i;
            }
        }

        Self {
            order,
            positions,
            tie_spans,
        }
    }

    /// Zero-based rank of an object, `None` if it was not ranked.
    #[inline]
    pub fn rank_of(&self, id: ObjectId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Ranks `(first, last)` of every object at the same distance as `id`.
    ///
    /// Any of these ranks is a correct position for `id`.
    pub fn rank_span(&self, id: ObjectId) -> Option<(usize, usize)> {
        self.rank_of(id).map(|rank| self.tie_spans[rank])
    }

    /// Exact distance of a ranked object.
    #[inline]
    pub fn distance_of(&self, id: ObjectId) -> Option<D> {
        self.rank_of(id).map(|rank| self.order[rank].distance)
    }

    /// The true k nearest neighbors.
    pub fn top(&self, k: usize) -> &[Neighbor<D>] {
        &self.order[..k.min(self.order.len())]
    }

    /// Number of ranked objects.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
