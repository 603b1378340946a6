//! Offline bucket-budget calibration.

use crate::brute_force::{BoundedTopK, BruteForceSearcher, ExactRanking};
use crate::calibration::error_metric::approximation_error;
use crate::calibration::stats::EstimatorTable;
use crate::config::SketchConfig;
use crate::error::{Result, SketchError};
use crate::index::SketchIndex;
use crate::metric::{Metric, ObjectStore};
use crate::sketch::SketchEncoder;
use crate::storage::{read_bucket, BucketStore};
use crate::types::ObjectId;
use crate::utils::RandomSampler;
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

/// Outcome of one calibration run.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationReport {
    /// Fitted budgets.
    pub table: EstimatorTable,

    /// Number of sample queries issued.
    pub queries: usize,

    /// `(query, k)` runs that never reached the target error and were
    /// recorded as reading every bucket.
    pub degenerate: usize,
}

/// Per-k progress of one sample query.
struct Probe<D> {
    k: usize,
    top_k: BoundedTopK<D>,
    reached: bool,
}

/// Fits bucket budgets by replaying database objects as queries.
///
/// Reads the frozen index, the buckets and the objects; mutates none of them.
pub struct Calibrator<'a, O, M, S, B: ?Sized> {
    encoder: &'a SketchEncoder<O, M>,
    index: &'a SketchIndex,
    objects: &'a S,
    buckets: &'a B,
    _phantom: PhantomData<fn() -> O>,
}

impl<'a, O, M, S, B> Calibrator<'a, O, M, S, B>
where
    M: Metric<O>,
    S: ObjectStore<O>,
    B: BucketStore + ?Sized,
{
    /// Create a calibrator over a frozen index.
    pub fn new(
        encoder: &'a SketchEncoder<O, M>,
        index: &'a SketchIndex,
        objects: &'a S,
        buckets: &'a B,
    ) -> Self {
        Self {
            encoder,
            index,
            objects,
            buckets,
            _phantom: PhantomData,
        }
    }

    /// Calibrate with the sample size, ks, target error, confidence and seed
    /// of `config`.
    pub fn calibrate(&self, config: &SketchConfig) -> Result<CalibrationReport> {
        config.validate()?;
        self.calibrate_with(
            config.sample_size,
            &config.normalized_ks(),
            config.target_error,
            config.confidence_alpha,
            config.seed,
        )
    }

    /// Calibrate with explicit parameters.
    ///
    /// Draws `sample_size` distinct objects (all of them if the database is
    /// smaller) as queries. For each query and each k, buckets are read in
    /// Hamming order until the approximate top-k is within `target_error`
    /// of the exact one; that bucket count is one sample for k. Repeated
    /// entries of `target_ks` are calibrated once.
    pub fn calibrate_with(
        &self,
        sample_size: usize,
        target_ks: &[usize],
        target_error: f64,
        confidence_alpha: f64,
        seed: Option<u64>,
    ) -> Result<CalibrationReport> {
        if !self.index.is_frozen() {
            return Err(SketchError::not_frozen(
                "sketch index must be frozen before calibration",
            ));
        }
        let mut ks = target_ks.to_vec();
        ks.sort_unstable();
        ks.dedup();
        if ks.first() == Some(&0) {
            return Err(SketchError::invalid_argument("target_ks must not contain 0"));
        }
        if !(0.0..=1.0).contains(&target_error) {
            return Err(SketchError::invalid_argument(format!(
                "target_error must be in [0, 1], got {}",
                target_error
            )));
        }
        if !confidence_alpha.is_finite() || confidence_alpha < 0.0 {
            return Err(SketchError::invalid_argument(format!(
                "confidence_alpha must be finite and >= 0, got {}",
                confidence_alpha
            )));
        }

        let mut table = EstimatorTable::new(confidence_alpha, target_error, self.index.size());
        let ids = self.objects.ids()?;
        let mut sampler = RandomSampler::from_option(seed);
        let sample = sampler.sample_indices(ids.len(), sample_size.min(ids.len()));
        if sample.is_empty() {
            warn!("calibration skipped: no objects to sample");
        }

        let mut degenerate = 0;
        for &pos in &sample {
            degenerate += self.run_query(ids[pos], &ks, target_error, &mut table)?;
        }

        for k in table.calibrated_ks() {
            if let Some(stats) = table.entry(k) {
                info!(
                    k,
                    samples = stats.count(),
                    mean = stats.mean(),
                    std_dev = stats.std_dev(),
                    budget = table.estimate_bucket_budget(k).unwrap_or(0),
                    "calibrated bucket budget"
                );
            }
        }

        Ok(CalibrationReport {
            table,
            queries: sample.len(),
            degenerate,
        })
    }

    /// Replay one object as a query, recording a sample for every k.
    /// Returns how many ks never reached the target.
    fn run_query(
        &self,
        query_id: ObjectId,
        target_ks: &[usize],
        target_error: f64,
        table: &mut EstimatorTable,
    ) -> Result<usize> {
        let query = self.objects.require(query_id)?;
        let truth = BruteForceSearcher::new(self.objects, self.encoder.metric()).rank(&query)?;
        let code = self.encoder.encode_quiet(&query)?;

        let mut probes: Vec<Probe<M::Distance>> = target_ks
            .iter()
            .map(|&k| Probe {
                k,
                top_k: BoundedTopK::new(k),
                reached: false,
            })
            .collect();
        let mut pending = probes.len();

        let mut consumed = 0;
        let mut seen = HashSet::new();
        for bucket_code in self.index.cursor(code)? {
            if pending == 0 {
                break;
            }
            let members = read_bucket(self.buckets, bucket_code, self.index.bits())?;
            consumed += 1;

            for &id in members.iter().filter(|&&id| seen.insert(id)) {
                let distance = Self::known_distance(&truth, id)?;
                for probe in probes.iter_mut().filter(|p| !p.reached) {
                    if probe.top_k.is_candidate(distance) {
                        probe.top_k.add(id, distance, ());
                    }
                }
            }

            for probe in probes.iter_mut().filter(|p| !p.reached) {
                let approximate: Vec<ObjectId> =
                    probe.top_k.neighbors().iter().map(|n| n.id).collect();
                if approximation_error(&approximate, &truth, probe.k) <= target_error {
                    table.record(probe.k, consumed);
                    probe.reached = true;
                    pending -= 1;
                }
            }
        }

        let all_buckets = self.index.size();
        let mut degenerate = 0;
        for probe in probes.iter().filter(|p| !p.reached) {
            warn!(
                query = query_id,
                k = probe.k,
                target_error,
                buckets = all_buckets,
                "degenerate calibration query: target error not reached"
            );
            table.record(probe.k, all_buckets);
            degenerate += 1;
        }
        debug!(query = query_id, buckets_read = consumed, degenerate, "calibration query done");
        Ok(degenerate)
    }

    fn known_distance(truth: &ExactRanking<M::Distance>, id: ObjectId) -> Result<M::Distance> {
        truth.distance_of(id).ok_or_else(|| {
            SketchError::corrupt_index(format!(
                "bucket references object {} unknown to the object store",
                id
            ))
        })
    }
}
