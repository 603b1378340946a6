//! Brute-force nearest neighbor search.
//!
//! This module provides the bounded top-k collector shared by every search
//! path, and an exhaustive searcher that produces exact rankings used as
//! ground truth during calibration.

mod searcher;
mod top_k;

pub use searcher::{BruteForceSearcher, ExactRanking};
pub use top_k::{BoundedTopK, SortOrder, TopKEntry};
