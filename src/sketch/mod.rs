//! Pivot-pair bit sketches.
//!
//! Each of the m sketch bits records which of two reference objects is
//! closer to the encoded object. Objects that are close in the metric space
//! tend to agree on most bits, so Hamming distance between sketches is a
//! cheap proxy for real distance.

mod encoder;
mod pivots;

pub use encoder::{BitBalance, SketchEncoder};
pub use pivots::{PivotPair, PivotSet, PivotSource, RandomPivotSource};
