//! Object and distance collaborators.
//!
//! The sketch engine never inspects objects itself. It reaches them through
//! an [`ObjectStore`] and compares them through a [`Metric`], which must be a
//! true metric (non-negative, symmetric, triangle inequality) for the pivot
//! sketches to be locality sensitive.

use crate::error::{Result, SketchError};
use crate::types::{DistanceValue, ObjectId};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// A distance function over objects of type `O`.
pub trait Metric<O: ?Sized>: Send + Sync {
    /// Numeric type of the produced distances.
    type Distance: DistanceValue;

    /// Compute the distance between two objects.
    fn distance(&self, a: &O, b: &O) -> Result<Self::Distance>;
}

/// Resolves object ids to objects.
pub trait ObjectStore<O> {
    /// Fetch an object; `Ok(None)` when the id is unknown.
    fn get(&self, id: ObjectId) -> Result<Option<O>>;

    /// All ids held by the store, in ascending order.
    fn ids(&self) -> Result<Vec<ObjectId>>;

    /// Number of stored objects.
    fn len(&self) -> Result<usize> {
        Ok(self.ids()?.len())
    }

    /// Fetch an object that must exist.
    fn require(&self, id: ObjectId) -> Result<O> {
        self.get(id)?.ok_or_else(|| {
            SketchError::corrupt_index(format!("object {} cannot be resolved", id))
        })
    }
}

/// Metric backed by an infallible closure.
pub struct FnMetric<O: ?Sized, D, F> {
    func: F,
    _phantom: PhantomData<fn(&O) -> D>,
}

impl<O: ?Sized, D, F> FnMetric<O, D, F>
where
    D: DistanceValue,
    F: Fn(&O, &O) -> D + Send + Sync,
{
    /// Wrap a distance closure.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

impl<O: ?Sized, D, F> Metric<O> for FnMetric<O, D, F>
where
    D: DistanceValue,
    F: Fn(&O, &O) -> D + Send + Sync,
{
    type Distance = D;

    #[inline]
    fn distance(&self, a: &O, b: &O) -> Result<D> {
        Ok((self.func)(a, b))
    }
}

/// Metrics over dense `f32` vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VectorMetric {
    /// L1 (Manhattan) distance: sum of absolute differences.
    L1,

    /// L2 (Euclidean) distance.
    #[default]
    L2,

    /// L-infinity (Chebyshev) distance: largest absolute difference.
    Chebyshev,
}

impl VectorMetric {
    fn check_dims(a: &[f32], b: &[f32]) -> Result<()> {
        if a.len() != b.len() {
            return Err(SketchError::metric(format!(
                "dimensionality mismatch: {} vs {}",
                a.len(),
                b.len()
            )));
        }
        Ok(())
    }
}

impl Metric<[f32]> for VectorMetric {
    type Distance = f32;

    fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        Self::check_dims(a, b)?;
        let pairs = a.iter().zip(b.iter());
        Ok(match self {
            VectorMetric::L1 => pairs.map(|(x, y)| (x - y).abs()).sum(),
            VectorMetric::L2 => pairs.map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt(),
            VectorMetric::Chebyshev => pairs.map(|(x, y)| (x - y).abs()).fold(0.0, f32::max),
        })
    }
}

impl Metric<Vec<f32>> for VectorMetric {
    type Distance = f32;

    #[inline]
    fn distance(&self, a: &Vec<f32>, b: &Vec<f32>) -> Result<f32> {
        <Self as Metric<[f32]>>::distance(self, a.as_slice(), b.as_slice())
    }
}

/// In-memory object store; ids are positions in the backing vector.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjects<O> {
    objects: Vec<O>,
}

impl<O: Clone> InMemoryObjects<O> {
    /// Create a store from objects; object `i` gets id `i`.
    pub fn new(objects: Vec<O>) -> Self {
        Self { objects }
    }

    /// Append an object, returning its id.
    pub fn push(&mut self, object: O) -> ObjectId {
        self.objects.push(object);
        (self.objects.len() - 1) as ObjectId
    }

    /// Borrow an object without cloning.
    pub fn object(&self, id: ObjectId) -> Option<&O> {
        usize::try_from(id).ok().and_then(|i| self.objects.get(i))
    }

    /// Iterate `(id, object)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &O)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (i as ObjectId, o))
    }

    /// Number of objects.
    pub fn size(&self) -> usize {
        self.objects.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl<O: Clone> ObjectStore<O> for InMemoryObjects<O> {
    fn get(&self, id: ObjectId) -> Result<Option<O>> {
        Ok(self.object(id).cloned())
    }

    fn ids(&self) -> Result<Vec<ObjectId>> {
        Ok((0..self.objects.len() as ObjectId).collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.objects.len())
    }
}
