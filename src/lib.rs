//! # segment-lens — subgroup explanations for tabular aggregates
//!
//! segment-lens finds the attribute combinations ("subgroups") of a dataset
//! that best explain an aggregate of interest, such as which device/version
//! pairs carry a disproportionate share of outliers. It consumes pre-encoded
//! integer attribute matrices and additive aggregate columns supplied by an
//! external encoder and scorer, and runs a multi-threaded, level-wise
//! enumeration over subgroup arities 1 through 3.
//!
//! ## How it works
//!
//! Rows are sharded across worker threads. Each worker scans its shard
//! column-major and folds every candidate subgroup's aggregate vector into a
//! private fixed-capacity hash table, keyed by a compact set representation
//! that packs up to three attribute codes into one machine word. After each
//! order, the per-thread tables are merged and every candidate is judged by
//! the configured [quality metrics](metric::QualityMetric): a candidate may
//! pass (reported), fail but stay on the frontier (its refinements are still
//! enumerated), or be pruned together with every superset. The surviving
//! frontier drives the classic APriori pruning of the next order.
//!
//! ## Quick start
//!
//! ```rust
//! use segment_lens::prelude::*;
//!
//! // Rows carry two encoded attribute columns; aggregates are a row count
//! // and an outlier count, both folded by summation.
//! let attributes = vec![vec![1, 7], vec![1, 8], vec![2, 7], vec![2, 8]];
//! let aggregates = vec![vec![1.0; 4], vec![1.0, 0.0, 0.0, 0.0]];
//! let ops = [AggregationOp::Sum, AggregationOp::Sum];
//!
//! let mut explainer = Explainer::builder()
//!     .metric(SupportMetric::new(1), 0.5)
//!     .metric(MinCountMetric::new(0), 1.0)
//!     .build()?;
//!
//! let results = explainer.explain(
//!     &attributes,
//!     &aggregates,
//!     &ops,
//!     &ExplainOptions::new(10).with_max_order(2).with_num_threads(2),
//! )?;
//!
//! for subgroup in &results {
//!     println!("{subgroup}");
//! }
//! # Ok::<(), segment_lens::error::LensError>(())
//! ```
//!
//! ## Scope
//!
//! The engine operates on a fixed in-memory dataset per invocation. Data
//! ingestion, column typing, and attribute encoding are the caller's
//! responsibility; the encoder must reserve code 0 as the
//! [no-support sentinel](key::NO_SUPPORT) and keep all codes below the
//! declared cardinality.

pub mod engine;
pub mod error;
pub mod key;
pub mod logging;
pub mod metric;
pub mod ops;
pub mod prelude;
pub mod result;
pub mod table;
