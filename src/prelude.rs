//! Prelude for commonly used types in segment-lens.

pub use crate::engine::{ExplainOptions, Explainer, ExplainerBuilder, MAX_ORDER};
pub use crate::error::{LensError, Result};
pub use crate::key::{ArrayKey, CandidateKey, PackedKey, MAX_PACKED_CODE, NO_SUPPORT};
pub use crate::logging::LogConfig;
pub use crate::metric::{Action, MinCountMetric, QualityMetric, RiskRatioMetric, SupportMetric};
pub use crate::ops::AggregationOp;
pub use crate::result::SubgroupResult;
