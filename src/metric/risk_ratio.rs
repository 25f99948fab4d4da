//! Risk ratio: a subgroup's outlier rate relative to the global rate.

use super::{Action, QualityMetric};

/// Compares a subgroup's outlier rate against the dataset-wide rate.
///
/// With a count aggregate and an outlier-count aggregate, the value is
/// `(outliers / count) / (global_outliers / global_count)`: a ratio of 3
/// means rows in the subgroup are three times as likely to be outliers as
/// rows overall. The ratio is not monotone under refinement, so failing
/// candidates stay on the frontier rather than being pruned.
#[derive(Debug, Clone)]
pub struct RiskRatioMetric {
    count_index: usize,
    outlier_index: usize,
    global_rate: f64,
}

impl RiskRatioMetric {
    /// Creates a risk-ratio metric from a row-count aggregate and an
    /// outlier-count aggregate.
    pub fn new(count_index: usize, outlier_index: usize) -> Self {
        RiskRatioMetric {
            count_index,
            outlier_index,
            global_rate: 0.0,
        }
    }
}

impl QualityMetric for RiskRatioMetric {
    fn initialize(&mut self, global_aggregates: &[f64]) {
        let count = global_aggregates[self.count_index];
        self.global_rate = if count > 0.0 {
            global_aggregates[self.outlier_index] / count
        } else {
            0.0
        };
    }

    fn action(&self, aggregates: &[f64], threshold: f64) -> Action {
        if self.value(aggregates) >= threshold {
            Action::Keep
        } else {
            Action::Next
        }
    }

    fn value(&self, aggregates: &[f64]) -> f64 {
        let count = aggregates[self.count_index];
        if count <= 0.0 || self.global_rate <= 0.0 {
            return 0.0;
        }
        (aggregates[self.outlier_index] / count) / self.global_rate
    }

    fn name(&self) -> &str {
        "risk_ratio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_relative_to_global_rate() {
        // Global rate 10%; a subgroup at 30% has ratio 3.
        let mut metric = RiskRatioMetric::new(0, 1);
        metric.initialize(&[100.0, 10.0]);
        assert_eq!(metric.value(&[10.0, 3.0]), 3.0);
    }

    #[test]
    fn test_failing_ratio_stays_on_frontier() {
        let mut metric = RiskRatioMetric::new(0, 1);
        metric.initialize(&[100.0, 10.0]);
        assert_eq!(metric.action(&[10.0, 3.0], 2.0), Action::Keep);
        assert_eq!(metric.action(&[10.0, 1.0], 2.0), Action::Next);
    }

    #[test]
    fn test_degenerate_globals_yield_zero() {
        let mut metric = RiskRatioMetric::new(0, 1);
        metric.initialize(&[0.0, 0.0]);
        assert_eq!(metric.value(&[10.0, 5.0]), 0.0);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let global = [50.0, 5.0];
        let mut metric = RiskRatioMetric::new(0, 1);
        metric.initialize(&global);
        let first = metric.value(&global);
        metric.initialize(&global);
        assert_eq!(metric.value(&global), first);
    }
}
