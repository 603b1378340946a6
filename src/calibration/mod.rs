//! Bucket-budget calibration.
//!
//! Offline, after freeze: sample database objects as synthetic queries,
//! read their buckets in Hamming order, and measure how many buckets each k
//! needs before the approximate top-k is within the target error of the
//! exact one. The resulting [`EstimatorTable`] drives query-time budgets.

mod calibrator;
mod error_metric;
mod stats;

pub use calibrator::{CalibrationReport, Calibrator};
pub use error_metric::approximation_error;
pub use stats::{EstimatorTable, RunningStats};
