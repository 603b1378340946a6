//! In-memory index of present sketch codes.
//!
//! The index holds only the distinct codes that occur in the database and
//! enumerates them for a query code in non-decreasing Hamming distance, ties
//! broken by ascending code value.

mod cursor;
mod sketch_index;

pub use cursor::HammingCursor;
pub use sketch_index::SketchIndex;
