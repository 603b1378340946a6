//! Utility functions and types for bitsketch.

pub mod bits;
pub(crate) mod random;

pub use bits::*;
pub use random::RandomSampler;
