//! Core type definitions for bitsketch.
//!
//! This module contains the fundamental type aliases and traits used throughout the library.

use num_traits::{NumCast, Zero};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Debug;

/// An m-bit sketch code, one bit per pivot pair (m <= 64).
pub type Code = u64;

/// Opaque identifier of an object held by the external object store.
pub type ObjectId = u64;

/// Maximum supported sketch width in bits.
pub const MAX_BITS: u32 = 64;

/// Trait for numeric types that can be produced by a distance function.
///
/// Distances must be totally ordered for ranking; floating-point values are
/// compared through [`OrderedFloat`], so a NaN sorts after every real distance.
pub trait DistanceValue:
    Copy + Debug + PartialOrd + Zero + NumCast + Send + Sync + 'static
{
    /// Total order over distances.
    fn cmp_distance(&self, other: &Self) -> Ordering;

    /// Convert to f64 for statistics and reporting.
    fn to_f64(self) -> f64;
}

macro_rules! impl_float_distance {
    ($($t:ty),*) => {
        $(
            impl DistanceValue for $t {
                #[inline]
                fn cmp_distance(&self, other: &Self) -> Ordering {
                    OrderedFloat(*self).cmp(&OrderedFloat(*other))
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

macro_rules! impl_integer_distance {
    ($($t:ty),*) => {
        $(
            impl DistanceValue for $t {
                #[inline]
                fn cmp_distance(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_float_distance!(f32, f64);
impl_integer_distance!(u8, u16, u32, u64, i32, i64, usize);

/// A nearest neighbor result: an object id and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor<D> {
    /// Identifier of the neighbor.
    pub id: ObjectId,

    /// Distance from the query.
    pub distance: D,
}

impl<D> Neighbor<D> {
    /// Create a new result.
    pub fn new(id: ObjectId, distance: D) -> Self {
        Self { id, distance }
    }
}

/// Mask with the low `bits` bits set.
#[inline]
pub const fn code_mask(bits: u32) -> Code {
    if bits >= MAX_BITS {
        Code::MAX
    } else {
        (1u64 << bits) - 1
    }
}
