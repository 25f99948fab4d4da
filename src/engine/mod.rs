//! The level-wise explanation controller.
//!
//! [`Explainer`] drives candidate enumeration order by order: it shards the
//! dataset across worker threads, merges their per-thread aggregate tables,
//! applies the configured quality metrics, and derives the frontier that
//! prunes the next order.

mod shard;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::error::{LensError, Result};
use crate::key::{ArrayKey, CandidateKey, PackedKey, MAX_PACKED_CODE, NO_SUPPORT};
use crate::metric::{Action, QualityMetric};
use crate::ops::AggregationOp;
use crate::result::SubgroupResult;
use crate::table::FixedAggregateTable;

use shard::{aggregate_shard, build_shards, RowAggregates};

/// Highest supported enumeration order.
pub const MAX_ORDER: usize = 3;

/// Per-invocation options for [`Explainer::explain`].
#[derive(Debug, Clone)]
pub struct ExplainOptions {
    /// Exclusive upper bound on attribute codes.
    pub cardinality: u32,
    /// Highest subgroup arity to enumerate (1..=3).
    pub max_order: usize,
    /// Number of worker threads, each owning one row shard.
    pub num_threads: usize,
}

impl ExplainOptions {
    /// Creates options for the given attribute cardinality, defaulting to
    /// order 3 on a single thread.
    pub fn new(cardinality: u32) -> Self {
        Self {
            cardinality,
            max_order: MAX_ORDER,
            num_threads: 1,
        }
    }

    /// Sets the highest subgroup arity to enumerate.
    pub fn with_max_order(mut self, max_order: usize) -> Self {
        self.max_order = max_order;
        self
    }

    /// Sets the number of worker threads.
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }
}

/// Builder for [`Explainer`].
#[derive(Default)]
pub struct ExplainerBuilder {
    metrics: Vec<Box<dyn QualityMetric>>,
    thresholds: Vec<f64>,
}

impl ExplainerBuilder {
    /// Adds a quality metric with its threshold.
    pub fn metric(mut self, metric: impl QualityMetric + 'static, threshold: f64) -> Self {
        self.metrics.push(Box::new(metric));
        self.thresholds.push(threshold);
        self
    }

    /// Builds the explainer; at least one metric is required.
    pub fn build(self) -> Result<Explainer> {
        Explainer::new(self.metrics, self.thresholds)
    }
}

/// Finds all subgroups of arity 1..=3 whose aggregates pass every configured
/// quality metric.
///
/// # Example
///
/// ```rust
/// use segment_lens::prelude::*;
///
/// let mut explainer = Explainer::builder()
///     .metric(SupportMetric::new(1), 0.5)
///     .metric(MinCountMetric::new(0), 1.0)
///     .build()?;
///
/// // Two encoded attribute columns, a count aggregate and an outlier count.
/// let attributes = vec![vec![1, 7], vec![1, 8], vec![2, 7], vec![2, 8]];
/// let aggregates = vec![vec![1.0; 4], vec![1.0, 0.0, 0.0, 0.0]];
/// let ops = [AggregationOp::Sum, AggregationOp::Sum];
///
/// let results = explainer.explain(
///     &attributes,
///     &aggregates,
///     &ops,
///     &ExplainOptions::new(10).with_max_order(2),
/// )?;
/// assert!(results.iter().any(|r| r.members == [1, 7]));
/// # Ok::<(), segment_lens::error::LensError>(())
/// ```
pub struct Explainer {
    metrics: Vec<Box<dyn QualityMetric>>,
    thresholds: Vec<f64>,
}

impl std::fmt::Debug for Explainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explainer")
            .field("metrics", &self.metrics.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

impl Explainer {
    /// Creates an explainer from parallel metric and threshold vectors.
    pub fn new(metrics: Vec<Box<dyn QualityMetric>>, thresholds: Vec<f64>) -> Result<Self> {
        if metrics.is_empty() {
            return Err(LensError::invalid_input("at least one quality metric is required"));
        }
        if metrics.len() != thresholds.len() {
            return Err(LensError::invalid_input(format!(
                "{} metrics but {} thresholds",
                metrics.len(),
                thresholds.len()
            )));
        }
        Ok(Explainer { metrics, thresholds })
    }

    /// Starts a builder.
    pub fn builder() -> ExplainerBuilder {
        ExplainerBuilder::default()
    }

    /// Names of the configured metrics, in evaluation order.
    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.name()).collect()
    }

    /// Runs the level-wise enumeration over a fixed in-memory dataset.
    ///
    /// `attributes` is a row-major `R × C` matrix of encoded codes in
    /// `[0, cardinality)`; `aggregate_columns` holds `M ≥ 1` column-major
    /// aggregate arrays of length `R`, folded under the matching entry of
    /// `ops`. Returns one record per passing subgroup, sorted by
    /// (order, members).
    #[instrument(skip_all, fields(
        rows = attributes.len(),
        cardinality = options.cardinality,
        max_order = options.max_order,
        num_threads = options.num_threads,
    ))]
    pub fn explain(
        &mut self,
        attributes: &[Vec<u32>],
        aggregate_columns: &[Vec<f64>],
        ops: &[AggregationOp],
        options: &ExplainOptions,
    ) -> Result<Vec<SubgroupResult>> {
        if options.max_order == 0 || options.max_order > MAX_ORDER {
            return Err(LensError::UnsupportedOrder {
                order: options.max_order,
            });
        }
        if options.num_threads == 0 {
            return Err(LensError::invalid_input("num_threads must be at least 1"));
        }
        if aggregate_columns.is_empty() {
            return Err(LensError::invalid_input(
                "at least one aggregate column is required",
            ));
        }
        if ops.len() != aggregate_columns.len() {
            return Err(LensError::invalid_input(format!(
                "{} aggregate columns but {} aggregation ops",
                aggregate_columns.len(),
                ops.len()
            )));
        }
        let num_rows = attributes.len();
        for (j, column) in aggregate_columns.iter().enumerate() {
            if column.len() != num_rows {
                return Err(LensError::invalid_input(format!(
                    "aggregate column {j} has {} rows, expected {num_rows}",
                    column.len()
                )));
            }
        }
        let num_columns = attributes.first().map_or(0, Vec::len);
        for (i, row) in attributes.iter().enumerate() {
            if row.len() != num_columns {
                return Err(LensError::invalid_input(format!(
                    "attribute row {i} has {} columns, expected {num_columns}",
                    row.len()
                )));
            }
        }

        // Global aggregates seed the metrics' relative thresholds.
        let global: Vec<f64> = ops
            .iter()
            .zip(aggregate_columns)
            .map(|(op, column)| column.iter().fold(op.identity(), |acc, &v| op.combine(acc, v)))
            .collect();
        for metric in &mut self.metrics {
            metric.initialize(&global);
        }

        let row_aggregates = RowAggregates::from_columns(aggregate_columns, num_rows);

        if options.cardinality >= MAX_PACKED_CODE {
            warn!(
                cardinality = options.cardinality,
                "attribute cardinality exceeds the packed key range; \
                 falling back to array keys, candidate generation will be slower"
            );
            self.run::<ArrayKey>(attributes, &row_aggregates, ops, options)
        } else {
            self.run::<PackedKey>(attributes, &row_aggregates, ops, options)
        }
    }

    /// The level-wise loop, generic over the candidate key representation.
    fn run<K: CandidateKey>(
        &self,
        attributes: &[Vec<u32>],
        row_aggregates: &RowAggregates,
        ops: &[AggregationOp],
        options: &ExplainOptions,
    ) -> Result<Vec<SubgroupResult>> {
        let num_columns = attributes.first().map_or(0, Vec::len);
        let num_aggregates = ops.len();
        let shards = build_shards(attributes, num_columns, options.num_threads);

        // Frontier and saved aggregates per order, plus the order-1 frontier
        // as a boolean array for O(1) member filtering in the workers.
        let mut frontier: Vec<HashSet<ArrayKey>> = vec![HashSet::new(); MAX_ORDER + 1];
        let mut saved: Vec<HashMap<ArrayKey, Vec<f64>>> = vec![HashMap::new(); MAX_ORDER + 1];
        let mut single_next = vec![false; options.cardinality as usize];

        for order in 1..=options.max_order {
            let order_start = Instant::now();
            let tuples = column_tuples(num_columns, order);
            if tuples == 0 {
                continue;
            }

            let joined = thread::scope(|scope| {
                let single_next = &single_next;
                let handles: Vec<_> = shards
                    .iter()
                    .map(|shard| {
                        let mut table: FixedAggregateTable<K> = FixedAggregateTable::with_capacity(
                            table_slots(options.cardinality, order, shard.rows(), tuples),
                            num_aggregates,
                        );
                        scope.spawn(move || {
                            let shard_start = Instant::now();
                            let outcome = aggregate_shard(
                                shard,
                                order,
                                row_aggregates,
                                ops,
                                single_next,
                                &mut table,
                            )
                            .map(|()| table);
                            debug!(
                                order,
                                start_row = shard.start(),
                                elapsed_ms = shard_start.elapsed().as_millis() as u64,
                                "shard enumeration finished"
                            );
                            outcome
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle
                            .join()
                            .map_err(|payload| LensError::WorkerPanicked {
                                message: panic_message(payload.as_ref()),
                            })
                            .and_then(|outcome| outcome)
                    })
                    .collect::<Vec<Result<FixedAggregateTable<K>>>>()
            });

            // Fold per-thread tables in thread-index order onto canonical
            // array keys, reporting the first worker failure after all have
            // been joined.
            let mut merged: HashMap<ArrayKey, Vec<f64>> = HashMap::new();
            let mut first_failure = None;
            for outcome in joined {
                match outcome {
                    Ok(table) if first_failure.is_none() => {
                        for (key, values) in table.iter() {
                            match merged.entry(key.to_array()) {
                                Entry::Occupied(mut entry) => {
                                    AggregationOp::combine_vector(ops, entry.get_mut(), values);
                                }
                                Entry::Vacant(entry) => {
                                    entry.insert(values.to_vec());
                                }
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) if first_failure.is_none() => first_failure = Some(e),
                    Err(_) => {}
                }
            }
            if let Some(failure) = first_failure {
                return Err(failure);
            }

            let candidates = merged.len();
            let mut order_frontier = HashSet::new();
            let mut order_saved = HashMap::new();
            for (key, aggregates) in merged {
                let action = if order == 1 && key.first() == NO_SUPPORT {
                    Action::Prune
                } else {
                    self.combined_action(&aggregates)
                };
                match action {
                    Action::Keep => {
                        // A passing candidate is reportable and still feeds
                        // the next order's enumeration.
                        order_frontier.insert(key);
                        if order != 3 || pair_subsets_on_frontier(&key, &frontier[2]) {
                            order_saved.insert(key, aggregates);
                        }
                    }
                    Action::Next => {
                        order_frontier.insert(key);
                    }
                    Action::Prune => {}
                }
            }
            if order == 1 {
                for key in &order_frontier {
                    single_next[key.first() as usize] = true;
                }
            }
            debug!(
                order,
                candidates,
                kept = order_saved.len(),
                frontier = order_frontier.len(),
                elapsed_ms = order_start.elapsed().as_millis() as u64,
                "order complete"
            );
            frontier[order] = order_frontier;
            saved[order] = order_saved;
        }

        let metric_names: Vec<String> =
            self.metrics.iter().map(|m| m.name().to_string()).collect();
        let mut results = Vec::new();
        for order_saved in &saved[1..=options.max_order] {
            for (key, aggregates) in order_saved {
                results.push(SubgroupResult {
                    members: key.members(),
                    aggregates: aggregates.clone(),
                    metric_names: metric_names.clone(),
                    metric_values: self.metrics.iter().map(|m| m.value(aggregates)).collect(),
                });
            }
        }
        results.sort_by(|a, b| {
            (a.members.len(), &a.members).cmp(&(b.members.len(), &b.members))
        });
        Ok(results)
    }

    /// Lattice-combined verdict of all metrics, short-circuiting on prune.
    fn combined_action(&self, aggregates: &[f64]) -> Action {
        let mut action = Action::Keep;
        for (metric, threshold) in self.metrics.iter().zip(&self.thresholds) {
            action = action.combine(metric.action(aggregates, *threshold));
            if action == Action::Prune {
                break;
            }
        }
        action
    }
}

/// Whether all three pair subsets of a triple survived order 2.
fn pair_subsets_on_frontier(key: &ArrayKey, pairs: &HashSet<ArrayKey>) -> bool {
    let a = key.first();
    let (Some(b), Some(c)) = (key.second(), key.third()) else {
        return true;
    };
    pairs.contains(&ArrayKey::from_two(a, b))
        && pairs.contains(&ArrayKey::from_two(b, c))
        && pairs.contains(&ArrayKey::from_two(a, c))
}

/// Number of ascending column tuples of the given order.
fn column_tuples(num_columns: usize, order: usize) -> usize {
    match order {
        1 => num_columns,
        2 => num_columns * num_columns.saturating_sub(1) / 2,
        3 => num_columns * num_columns.saturating_sub(1) * num_columns.saturating_sub(2) / 6,
        _ => 0,
    }
}

/// Slot budget for one thread's table: four times the distinct candidates the
/// shard can produce, bounded by both the key space and the insert count.
fn table_slots(cardinality: u32, order: usize, shard_rows: usize, tuples: usize) -> usize {
    let key_space = (cardinality as u128).saturating_pow(order as u32);
    let inserts = (shard_rows as u128).saturating_mul(tuples as u128);
    let distinct = key_space.min(inserts);
    distinct.saturating_mul(4).min(1 << 40) as usize
}

/// Extracts a readable message from a worker panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker thread panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MinCountMetric, SupportMetric};

    fn support_and_count() -> Explainer {
        Explainer::builder()
            .metric(SupportMetric::new(1), 0.5)
            .metric(MinCountMetric::new(0), 1.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_a_metric() {
        let err = Explainer::builder().build().unwrap_err();
        assert!(matches!(err, LensError::InvalidInput(_)));
    }

    #[test]
    fn test_mismatched_thresholds_rejected() {
        let err = Explainer::new(vec![Box::new(SupportMetric::new(0))], vec![]).unwrap_err();
        assert!(matches!(err, LensError::InvalidInput(_)));
    }

    #[test]
    fn test_order_out_of_range_rejected() {
        let mut explainer = support_and_count();
        for bad_order in [0, 4] {
            let err = explainer
                .explain(
                    &[vec![1]],
                    &[vec![1.0], vec![1.0]],
                    &[AggregationOp::Sum, AggregationOp::Sum],
                    &ExplainOptions::new(10).with_max_order(bad_order),
                )
                .unwrap_err();
            assert!(matches!(err, LensError::UnsupportedOrder { .. }));
        }
    }

    #[test]
    fn test_dimension_mismatches_rejected() {
        let mut explainer = support_and_count();
        let ops = [AggregationOp::Sum, AggregationOp::Sum];

        let err = explainer
            .explain(
                &[vec![1], vec![2]],
                &[vec![1.0], vec![1.0]],
                &ops,
                &ExplainOptions::new(10),
            )
            .unwrap_err();
        assert!(err.to_string().contains("aggregate column"));

        let err = explainer
            .explain(
                &[vec![1, 2], vec![3]],
                &[vec![1.0, 1.0], vec![0.0, 0.0]],
                &ops,
                &ExplainOptions::new(10),
            )
            .unwrap_err();
        assert!(err.to_string().contains("attribute row"));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let mut explainer = support_and_count();
        let err = explainer
            .explain(
                &[vec![1]],
                &[vec![1.0], vec![1.0]],
                &[AggregationOp::Sum, AggregationOp::Sum],
                &ExplainOptions::new(10).with_num_threads(0),
            )
            .unwrap_err();
        assert!(matches!(err, LensError::InvalidInput(_)));
    }

    #[test]
    fn test_pair_subset_check() {
        let mut pairs = HashSet::new();
        pairs.insert(ArrayKey::from_two(1, 2));
        pairs.insert(ArrayKey::from_two(2, 3));
        pairs.insert(ArrayKey::from_two(1, 3));
        assert!(pair_subsets_on_frontier(&ArrayKey::from_three(1, 2, 3), &pairs));
        assert!(!pair_subsets_on_frontier(&ArrayKey::from_three(1, 2, 4), &pairs));
    }

    #[test]
    fn test_column_tuples() {
        assert_eq!(column_tuples(4, 1), 4);
        assert_eq!(column_tuples(4, 2), 6);
        assert_eq!(column_tuples(4, 3), 4);
        assert_eq!(column_tuples(2, 3), 0);
    }

    #[test]
    fn test_table_slots_bounded_by_key_space_and_inserts() {
        // Tiny key space dominates.
        assert_eq!(table_slots(4, 1, 1_000_000, 8), 16);
        // Tiny shard dominates even at huge cardinality.
        assert_eq!(table_slots(3_000_000, 2, 4, 1), 16);
    }
}
