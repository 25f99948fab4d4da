//! Row-sharded candidate enumeration.
//!
//! The dataset is split by row range across worker threads, but each shard
//! stores its attribute slice column-major so the inner loops scan one
//! contiguous column at a time. Every worker folds its shard into a private
//! [`FixedAggregateTable`]; the controller merges the tables after the join.

use crate::error::{LensError, Result};
use crate::key::{CandidateKey, NO_SUPPORT};
use crate::ops::AggregationOp;
use crate::table::FixedAggregateTable;

/// Row-major copy of the aggregate columns for constant-stride row access.
#[derive(Debug)]
pub(crate) struct RowAggregates {
    data: Vec<f64>,
    width: usize,
}

impl RowAggregates {
    /// Transposes `M` column-major aggregate arrays into one `R × M` matrix.
    pub(crate) fn from_columns(columns: &[Vec<f64>], num_rows: usize) -> Self {
        let width = columns.len();
        let mut data = vec![0.0; num_rows * width];
        for (j, column) in columns.iter().enumerate() {
            for (i, &v) in column.iter().enumerate() {
                data[i * width + j] = v;
            }
        }
        RowAggregates { data, width }
    }

    /// The aggregate vector of one row.
    #[inline]
    pub(crate) fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.width..][..self.width]
    }
}

/// One worker's slice of the dataset: a column-major transpose of its row
/// range plus the global index of its first row.
#[derive(Debug)]
pub(crate) struct RowShard {
    columns: Vec<Vec<u32>>,
    start: usize,
    rows: usize,
}

impl RowShard {
    pub(crate) fn start(&self) -> usize {
        self.start
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }
}

/// Splits `attributes` into `num_threads` contiguous row shards, transposing
/// each into column-major order.
pub(crate) fn build_shards(
    attributes: &[Vec<u32>],
    num_columns: usize,
    num_threads: usize,
) -> Vec<RowShard> {
    let num_rows = attributes.len();
    (0..num_threads)
        .map(|t| {
            let start = num_rows * t / num_threads;
            let end = num_rows * (t + 1) / num_threads;
            let mut columns = vec![Vec::with_capacity(end - start); num_columns];
            for row in &attributes[start..end] {
                for (c, column) in columns.iter_mut().enumerate() {
                    column.push(row[c]);
                }
            }
            RowShard {
                columns,
                start,
                rows: end - start,
            }
        })
        .collect()
}

/// Enumerates all order-`order` candidates of one shard into `table`.
///
/// A row is skipped for a column tuple when any member carries the no-support
/// sentinel, or (for orders above one) when any member's singleton was pruned
/// at order one (`single_next` filter). Keys are canonicalized `Copy` values
/// built on the stack, so the loop performs no allocation.
pub(crate) fn aggregate_shard<K: CandidateKey>(
    shard: &RowShard,
    order: usize,
    row_aggregates: &RowAggregates,
    ops: &[AggregationOp],
    single_next: &[bool],
    table: &mut FixedAggregateTable<K>,
) -> Result<()> {
    let num_columns = shard.columns.len();
    match order {
        1 => {
            for column in &shard.columns {
                for (r, &a) in column.iter().enumerate() {
                    if a == NO_SUPPORT {
                        continue;
                    }
                    table.combine_or_insert(
                        K::from_one(a),
                        row_aggregates.row(shard.start + r),
                        ops,
                    )?;
                }
            }
        }
        2 => {
            for c1 in 0..num_columns {
                let column_one = &shard.columns[c1];
                for c2 in c1 + 1..num_columns {
                    let column_two = &shard.columns[c2];
                    for r in 0..shard.rows {
                        let (a, b) = (column_one[r], column_two[r]);
                        if a == NO_SUPPORT
                            || b == NO_SUPPORT
                            || !single_next[a as usize]
                            || !single_next[b as usize]
                        {
                            continue;
                        }
                        table.combine_or_insert(
                            K::from_two(a, b),
                            row_aggregates.row(shard.start + r),
                            ops,
                        )?;
                    }
                }
            }
        }
        3 => {
            for c1 in 0..num_columns {
                let column_one = &shard.columns[c1];
                for c2 in c1 + 1..num_columns {
                    let column_two = &shard.columns[c2];
                    for c3 in c2 + 1..num_columns {
                        let column_three = &shard.columns[c3];
                        for r in 0..shard.rows {
                            let (a, b, c) = (column_one[r], column_two[r], column_three[r]);
                            if a == NO_SUPPORT
                                || b == NO_SUPPORT
                                || c == NO_SUPPORT
                                || !single_next[a as usize]
                                || !single_next[b as usize]
                                || !single_next[c as usize]
                            {
                                continue;
                            }
                            // No pair-subset check here: the order-2 frontier
                            // is only complete after order 2, so the
                            // controller applies it post-merge.
                            table.combine_or_insert(
                                K::from_three(a, b, c),
                                row_aggregates.row(shard.start + r),
                                ops,
                            )?;
                        }
                    }
                }
            }
        }
        other => return Err(LensError::UnsupportedOrder { order: other }),
    }
    Ok(())
}
