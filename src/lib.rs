//! # bitsketch - Bit-Sketch Nearest Neighbors
//!
//! Approximate k-nearest-neighbor search over any metric space, driven by
//! compact bit sketches.
//!
//! ## Overview
//!
//! Every object is reduced to an m-bit code (m <= 64): bit i records which
//! of two reference objects, pivot pair i, it is closer to. Objects sharing a
//! code form a bucket in an external key/value store. A query is answered by:
//!
//! - **Encoding**: sketch the query with the same pivot pairs
//! - **Ordered enumeration**: visit present codes by increasing Hamming
//!   distance from the query code
//! - **Budgeted scan**: read a calibrated number of buckets and rank their
//!   objects by real distance in a bounded top-k
//!
//! The bucket budget per k comes from an offline calibration that replays
//! database objects as queries and measures how many buckets are needed for
//! the approximate result to come within a target error of the exact one.
//!
//! ## Quick Start
//!
//! ```rust
//! use bitsketch::prelude::*;
//!
//! let points: Vec<Vec<f32>> = (0..200)
//!     .map(|i| vec![(i % 20) as f32, (i / 20) as f32])
//!     .collect();
//! let objects = InMemoryObjects::new(points);
//!
//! let config = SketchConfig::new()
//!     .with_bits(16)
//!     .with_sample_size(20)
//!     .with_target_ks(vec![1, 10])
//!     .with_seed(42);
//!
//! // Build: pick pivots, encode every object, then freeze
//! let pivots = RandomPivotSource::new(&objects, config.seed);
//! let mut builder =
//!     SketchEngineBuilder::from_source(config, &pivots, VectorMetric::L2, MemoryBucketStore::new())
//!         .unwrap();
//! builder.add_all(&objects).unwrap();
//! let mut engine = builder.freeze().unwrap();
//!
//! // Calibrate bucket budgets, then search
//! engine.calibrate(&objects).unwrap();
//! let results = engine.search(&objects, &vec![3.2, 4.9], 10).unwrap();
//!
//! for neighbor in &results {
//!     println!("id: {}, distance: {:.4}", neighbor.id, neighbor.distance);
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`sketch`]: Pivot pairs and the sketch encoder
//! - [`index`]: Present-code set and ordered Hamming enumeration
//! - [`brute_force`]: Bounded top-k collector and exact ranking
//! - [`storage`]: Bucket store collaborator and its byte layout
//! - [`calibration`]: Bucket-budget estimation
//! - [`engine`]: Build pipeline and query engine

pub mod brute_force;
pub mod calibration;
pub mod engine;
pub mod index;
pub mod metric;
pub mod sketch;
pub mod storage;
pub mod utils;

mod config;
mod error;
mod types;

pub use config::SketchConfig;
pub use engine::{SketchEngine, SketchEngineBuilder};
pub use error::{ErrorCode, Result, SketchError};
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::brute_force::{BoundedTopK, BruteForceSearcher, ExactRanking, SortOrder};
    pub use crate::calibration::{CalibrationReport, Calibrator, EstimatorTable};
    pub use crate::config::SketchConfig;
    pub use crate::engine::{SketchEngine, SketchEngineBuilder};
    pub use crate::error::{ErrorCode, Result, SketchError};
    pub use crate::index::{HammingCursor, SketchIndex};
    pub use crate::metric::{FnMetric, InMemoryObjects, Metric, ObjectStore, VectorMetric};
    pub use crate::sketch::{PivotPair, PivotSet, PivotSource, RandomPivotSource, SketchEncoder};
    pub use crate::storage::{BucketStore, MemoryBucketStore};
    pub use crate::types::*;
}
