//! Sketch query engine.
//!
//! [`SketchEngineBuilder`] runs the build phase (encode, index, persist
//! buckets). [`SketchEngine`] is the frozen, queryable result: it encodes a
//! query, looks up a calibrated bucket budget, walks buckets in Hamming order
//! and ranks their objects by real distance.

use crate::brute_force::{BoundedTopK, TopKEntry};
use crate::calibration::{CalibrationReport, Calibrator, EstimatorTable};
use crate::config::SketchConfig;
use crate::error::{Result, SketchError};
use crate::index::SketchIndex;
use crate::metric::{Metric, ObjectStore};
use crate::sketch::{PivotSet, PivotSource, SketchEncoder};
use crate::storage::{append_to_bucket, read_bucket, stored_codes, BucketStore};
use crate::types::{Code, DistanceValue, Neighbor, ObjectId};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

fn check_pivots<O>(config: &SketchConfig, pivots: &PivotSet<O>) -> Result<()> {
    config.validate()?;
    if pivots.bits() != config.bits {
        return Err(SketchError::invalid_argument(format!(
            "pivot set has {} pairs but the sketch is {} bits wide",
            pivots.bits(),
            config.bits
        )));
    }
    Ok(())
}

/// Build phase of a sketch engine.
///
/// Single writer: objects are added one at a time, then [`freeze`](Self::freeze)
/// writes every bucket once and ends the phase for good. Adding the same id
/// twice files it twice; searches still report it once.
pub struct SketchEngineBuilder<O, M, B> {
    config: SketchConfig,
    encoder: SketchEncoder<O, M>,
    index: SketchIndex,
    buckets: B,

    /// Ids per code, written to `buckets` at freeze.
    pending: BTreeMap<Code, Vec<ObjectId>>,
    added: usize,
}

impl<O, M, B> SketchEngineBuilder<O, M, B>
where
    M: Metric<O>,
    B: BucketStore,
{
    /// Start a build with a fixed pivot set of `config.bits` pairs.
    pub fn new(config: SketchConfig, pivots: PivotSet<O>, metric: M, buckets: B) -> Result<Self> {
        check_pivots(&config, &pivots)?;
        let index = SketchIndex::new(config.bits)?;
        Ok(Self {
            encoder: SketchEncoder::new(pivots, metric),
            config,
            index,
            buckets,
            pending: BTreeMap::new(),
            added: 0,
        })
    }

    /// Start a build, asking `source` for the pivot set.
    pub fn from_source<P>(config: SketchConfig, source: &P, metric: M, buckets: B) -> Result<Self>
    where
        P: PivotSource<O> + ?Sized,
    {
        config.validate()?;
        let pivots = source.pivots(config.bits)?;
        Self::new(config, pivots, metric, buckets)
    }

    /// Encode an object and file its id under the resulting code.
    pub fn add(&mut self, id: ObjectId, object: &O) -> Result<Code> {
        let code = self.encoder.encode(object)?;
        self.index.insert(code)?;
        self.pending.entry(code).or_default().push(id);
        self.added += 1;
        debug!(id, code, added = self.added, "object added");
        Ok(code)
    }

    /// Add every object of a store. Returns the number added.
    pub fn add_all<S: ObjectStore<O>>(&mut self, objects: &S) -> Result<usize> {
        let ids = objects.ids()?;
        for &id in &ids {
            let object = objects.require(id)?;
            self.add(id, &object)?;
        }
        info!(
            objects = ids.len(),
            distinct_codes = self.index.size(),
            "bulk load finished"
        );
        Ok(ids.len())
    }

    /// Objects added so far.
    pub fn len(&self) -> usize {
        self.added
    }

    /// Check if nothing was added.
    pub fn is_empty(&self) -> bool {
        self.added == 0
    }

    /// The configuration.
    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    /// The encoder and its bit statistics.
    pub fn encoder(&self) -> &SketchEncoder<O, M> {
        &self.encoder
    }

    /// Write the buckets and end the build phase.
    ///
    /// Ids land after anything the store already held under the same code.
    pub fn freeze(mut self) -> Result<SketchEngine<O, M, B>> {
        for (code, ids) in &self.pending {
            append_to_bucket(&mut self.buckets, *code, self.config.bits, ids)?;
        }
        self.index.freeze();
        self.encoder.report_skew(self.config.skew_threshold);
        info!(
            objects = self.added,
            buckets = self.pending.len(),
            "build phase frozen"
        );
        Ok(SketchEngine {
            config: self.config,
            encoder: self.encoder,
            index: self.index,
            buckets: self.buckets,
            estimators: None,
        })
    }
}

/// Frozen, queryable sketch index.
///
/// Read-only once built: searches take `&self` and each allocates its own
/// collector, so one engine can serve many threads.
pub struct SketchEngine<O, M, B> {
    config: SketchConfig,
    encoder: SketchEncoder<O, M>,
    index: SketchIndex,
    buckets: B,

    /// Calibrated budgets; `None` means every search reads all buckets.
    estimators: Option<EstimatorTable>,
}

impl<O, M, B> SketchEngine<O, M, B>
where
    M: Metric<O>,
    B: BucketStore,
{
    /// Reopen a persisted engine, rebuilding the present codes from the
    /// bucket store.
    pub fn open(config: SketchConfig, pivots: PivotSet<O>, metric: M, buckets: B) -> Result<Self> {
        check_pivots(&config, &pivots)?;
        let index = SketchIndex::from_codes(config.bits, stored_codes(&buckets, config.bits)?)?;
        info!(bits = config.bits, distinct_codes = index.size(), "sketch engine opened");
        Ok(Self {
            config,
            encoder: SketchEncoder::new(pivots, metric),
            index,
            buckets,
            estimators: None,
        })
    }

    /// Fit bucket budgets against `objects` and keep the resulting table.
    pub fn calibrate<S: ObjectStore<O>>(&mut self, objects: &S) -> Result<CalibrationReport> {
        let report = self.calibrator(objects).calibrate(&self.config)?;
        if report.degenerate > 0 {
            warn!(
                degenerate = report.degenerate,
                queries = report.queries,
                "some calibration queries never reached the target error"
            );
        }
        self.estimators = Some(report.table.clone());
        Ok(report)
    }

    /// A calibrator over this engine's index and buckets.
    pub fn calibrator<'a, S: ObjectStore<O>>(
        &'a self,
        objects: &'a S,
    ) -> Calibrator<'a, O, M, S, B> {
        Calibrator::new(&self.encoder, &self.index, objects, &self.buckets)
    }

    /// Install a previously saved table.
    pub fn set_estimators(&mut self, table: EstimatorTable) {
        if table.total_buckets() != self.index.size() {
            warn!(
                calibrated = table.total_buckets(),
                present = self.index.size(),
                "estimator table was fitted on a different index"
            );
        }
        self.estimators = Some(table);
    }

    /// The installed table, if any.
    pub fn estimators(&self) -> Option<&EstimatorTable> {
        self.estimators.as_ref()
    }

    /// Calibrated bucket budget for `k`, `None` when `k` is beyond every
    /// calibrated value or no table is installed.
    pub fn estimate_bucket_budget(&self, k: usize) -> Option<usize> {
        self.estimators.as_ref()?.estimate_bucket_budget(k)
    }

    /// Approximate k nearest neighbors, nearest first.
    ///
    /// Reads the calibrated number of buckets, or every bucket when `k` has
    /// no calibrated budget.
    pub fn search<S: ObjectStore<O>>(
        &self,
        objects: &S,
        query: &O,
        k: usize,
    ) -> Result<Vec<Neighbor<M::Distance>>> {
        Ok(self.collect(objects, query, k, self.budget_for(k), None)?.neighbors())
    }

    /// Like [`search`](Self::search) with an explicit bucket budget.
    pub fn search_with_budget<S: ObjectStore<O>>(
        &self,
        objects: &S,
        query: &O,
        k: usize,
        budget: usize,
    ) -> Result<Vec<Neighbor<M::Distance>>> {
        Ok(self.collect(objects, query, k, budget, None)?.neighbors())
    }

    /// Approximate k nearest neighbors no farther than `radius`.
    pub fn search_within<S: ObjectStore<O>>(
        &self,
        objects: &S,
        query: &O,
        k: usize,
        radius: M::Distance,
    ) -> Result<Vec<Neighbor<M::Distance>>> {
        Ok(self
            .collect(objects, query, k, self.budget_for(k), Some(radius))?
            .neighbors())
    }

    /// Like [`search`](Self::search), also returning the objects.
    pub fn search_entries<S: ObjectStore<O>>(
        &self,
        objects: &S,
        query: &O,
        k: usize,
    ) -> Result<Vec<TopKEntry<M::Distance, O>>> {
        Ok(self
            .collect(objects, query, k, self.budget_for(k), None)?
            .into_sorted_vec())
    }

    fn budget_for(&self, k: usize) -> usize {
        self.estimate_bucket_budget(k)
            .unwrap_or_else(|| self.index.size())
    }

    /// Read up to `budget` buckets nearest the query's code into a top-k.
    /// An id filed under several codes, or twice under one, is ranked once.
    fn collect<S: ObjectStore<O>>(
        &self,
        objects: &S,
        query: &O,
        k: usize,
        budget: usize,
        radius: Option<M::Distance>,
    ) -> Result<BoundedTopK<M::Distance, O>> {
        let mut result = BoundedTopK::new(k);
        if k == 0 {
            return Ok(result);
        }

        let code = self.encoder.encode_quiet(query)?;
        let candidates = self.index.search(code, budget)?;
        debug!(code, k, budget, candidates = candidates.len(), "sketch search");

        let mut range = radius;
        let mut seen = HashSet::new();
        for candidate in candidates {
            for id in read_bucket(&self.buckets, candidate, self.config.bits)? {
                if !seen.insert(id) {
                    continue;
                }
                let object = objects.get(id)?.ok_or_else(|| {
                    SketchError::corrupt_index(format!(
                        "bucket {:#x} references unknown object {}",
                        candidate, id
                    ))
                })?;
                let distance = self.encoder.metric().distance(query, &object)?;
                if let Some(limit) = range {
                    if distance.cmp_distance(&limit) == Ordering::Greater {
                        continue;
                    }
                }
                result.add(id, distance, object);
                range = range.map(|limit| result.update_range(limit));
            }
        }
        Ok(result)
    }

    /// Sketch width.
    pub fn bits(&self) -> u32 {
        self.config.bits
    }

    /// Number of distinct codes present.
    pub fn size(&self) -> usize {
        self.index.size()
    }

    /// The configuration.
    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    /// The encoder.
    pub fn encoder(&self) -> &SketchEncoder<O, M> {
        &self.encoder
    }

    /// The frozen index.
    pub fn index(&self) -> &SketchIndex {
        &self.index
    }

    /// The bucket store.
    pub fn buckets(&self) -> &B {
        &self.buckets
    }

    /// Give back the bucket store.
    pub fn into_buckets(self) -> B {
        self.buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::metric::{InMemoryObjects, VectorMetric};
    use crate::sketch::{PivotPair, RandomPivotSource};
    use crate::storage::MemoryBucketStore;

    fn grid() -> InMemoryObjects<Vec<f32>> {
        let mut points = Vec::new();
        for x in 0..8 {
            for y in 0..8 {
                points.push(vec![x as f32 * 1.5, y as f32 * 0.7]);
            }
        }
        InMemoryObjects::new(points)
    }

    fn config() -> SketchConfig {
        SketchConfig::new()
            .with_bits(8)
            .with_sample_size(16)
            .with_target_ks(vec![1, 5])
            .with_target_error(0.05)
            .with_seed(7)
    }

    type Engine = SketchEngine<Vec<f32>, VectorMetric, MemoryBucketStore>;

    fn build(objects: &InMemoryObjects<Vec<f32>>) -> Engine {
        let source = RandomPivotSource::new(objects, Some(7));
        let mut builder = SketchEngineBuilder::from_source(
            config(),
            &source,
            VectorMetric::L2,
            MemoryBucketStore::new(),
        )
        .unwrap();
        builder.add_all(objects).unwrap();
        builder.freeze().unwrap()
    }

    #[test]
    fn test_build_and_full_scan_is_exact() {
        let objects = grid();
        let engine = build(&objects);
        assert!(engine.index().is_frozen());

        let query = vec![4.1, 2.2];
        let approx = engine
            .search_with_budget(&objects, &query, 5, engine.size())
            .unwrap();
        let mut exact: Vec<(ObjectId, f32)> = objects
            .iter()
            .map(|(id, p)| (id, VectorMetric::L2.distance(&query, p).unwrap()))
            .collect();
        exact.sort_by(|a, b| a.1.cmp_distance(&b.1).then(a.0.cmp(&b.0)));

        let got: Vec<f32> = approx.iter().map(|n| n.distance).collect();
        let want: Vec<f32> = exact.iter().take(5).map(|e| e.1).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn test_uncalibrated_search_reads_everything() {
        let objects = grid();
        let engine = build(&objects);
        assert_eq!(engine.estimate_bucket_budget(1), None);

        let results = engine.search(&objects, &vec![0.0, 0.0], 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 0);
    }

    #[test]
    fn test_calibrated_search() {
        let objects = grid();
        let mut engine = build(&objects);
        let report = engine.calibrate(&objects).unwrap();

        assert_eq!(report.queries, 16);
        assert!(engine.estimate_bucket_budget(1).is_some());
        assert!(engine.estimate_bucket_budget(3).is_some());
        assert_eq!(engine.estimate_bucket_budget(6), None);

        let results = engine.search(&objects, &vec![3.0, 1.4], 5).unwrap();
        assert!(!results.is_empty() && results.len() <= 5);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_search_within_radius() {
        let objects = grid();
        let engine = build(&objects);

        let results = engine
            .search_within(&objects, &vec![0.0, 0.0], 10, 1.0)
            .unwrap();
        // (0, 0) and (0, 0.7) only
        let ids: Vec<ObjectId> = results.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_search_entries_carry_objects() {
        let objects = grid();
        let engine = build(&objects);
        let entries = engine.search_entries(&objects, &vec![1.5, 0.0], 1).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].payload, vec![1.5, 0.0]);
    }

    #[test]
    fn test_zero_k_and_zero_budget() {
        let objects = grid();
        let engine = build(&objects);
        assert!(engine.search(&objects, &vec![1.0, 1.0], 0).unwrap().is_empty());
        assert!(engine
            .search_with_budget(&objects, &vec![1.0, 1.0], 3, 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_reopen_from_buckets() {
        let objects = grid();
        let pivots = RandomPivotSource::new(&objects, Some(7)).pivots(8).unwrap();
        let engine = build(&objects);
        let size = engine.size();
        let buckets = engine.into_buckets();

        let reopened = SketchEngine::open(config(), pivots, VectorMetric::L2, buckets).unwrap();
        assert_eq!(reopened.size(), size);
        let results = reopened.search(&objects, &vec![10.5, 4.9], 1).unwrap();
        assert_eq!(results[0].id, 63);
    }

    #[test]
    fn test_pivot_width_must_match() {
        let pivots = PivotSet::new(vec![PivotPair::new(vec![0.0f32], vec![1.0])]).unwrap();
        let err =
            SketchEngineBuilder::new(config(), pivots, VectorMetric::L2, MemoryBucketStore::new())
                .err()
                .unwrap();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_unknown_object_is_corruption() {
        let objects = grid();
        let engine = build(&objects);
        let fewer = InMemoryObjects::new(vec![vec![0.0f32, 0.0]]);

        let err = engine
            .search_with_budget(&fewer, &vec![5.0, 5.0], 3, engine.size())
            .unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_repeated_id_is_reported_once() {
        let objects = InMemoryObjects::new(vec![vec![0.0f32], vec![1.0], vec![2.0], vec![3.0]]);
        let pivots = PivotSet::new(vec![
            PivotPair::new(vec![0.0f32], vec![3.0]),
            PivotPair::new(vec![1.0], vec![2.0]),
        ])
        .unwrap();
        let config = SketchConfig::new().with_bits(2);
        let mut builder =
            SketchEngineBuilder::new(config, pivots, VectorMetric::L2, MemoryBucketStore::new())
                .unwrap();
        builder.add_all(&objects).unwrap();
        builder.add(0, &vec![0.0]).unwrap();
        assert_eq!(builder.len(), 5);
        let engine = builder.freeze().unwrap();

        let results = engine
            .search_with_budget(&objects, &vec![0.0], 2, engine.size())
            .unwrap();
        let ids: Vec<ObjectId> = results.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_freeze_writes_each_bucket_once() {
        let objects = grid();
        let engine = build(&objects);
        assert_eq!(engine.buckets().len(), engine.size());

        let mut filed = 0;
        for &code in engine.index().codes() {
            filed += read_bucket(engine.buckets(), code, engine.bits()).unwrap().len();
        }
        assert_eq!(filed, objects.size());
    }

    #[test]
    fn test_saved_estimators() {
        let objects = grid();
        let mut engine = build(&objects);
        let table = engine.calibrate(&objects).unwrap().table;
        let json = table.to_json().unwrap();

        let mut other = build(&objects);
        other.set_estimators(EstimatorTable::from_json(&json).unwrap());
        assert_eq!(other.estimators(), Some(&table));
        assert_eq!(
            other.estimate_bucket_budget(5),
            engine.estimate_bucket_budget(5)
        );
    }
}
