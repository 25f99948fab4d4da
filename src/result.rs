//! Output records of an explanation run.

use serde::Serialize;
use std::fmt;

/// One reported subgroup: its attribute codes, accumulated aggregates, and
/// the value of every quality metric.
///
/// The engine emits results sorted by (order, members) for reproducible
/// presentation; consumers are free to re-rank them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubgroupResult {
    /// Attribute codes of the subgroup, ascending.
    pub members: Vec<u32>,
    /// Accumulated aggregate vector, one entry per aggregate column.
    pub aggregates: Vec<f64>,
    /// Metric names, parallel to `metric_values`.
    pub metric_names: Vec<String>,
    /// Reportable metric values, one per configured quality metric.
    pub metric_values: Vec<f64>,
}

impl SubgroupResult {
    /// Number of attributes in the subgroup (1..=3).
    pub fn order(&self) -> usize {
        self.members.len()
    }
}

impl fmt::Display for SubgroupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, m) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{m}")?;
        }
        write!(f, "}}")?;
        for (name, value) in self.metric_names.iter().zip(&self.metric_values) {
            write!(f, " {name}={value:.4}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_members_and_metrics() {
        let result = SubgroupResult {
            members: vec![3, 9],
            aggregates: vec![12.0, 4.0],
            metric_names: vec!["support".to_string(), "min_count".to_string()],
            metric_values: vec![0.5, 12.0],
        };
        assert_eq!(result.to_string(), "{3, 9} support=0.5000 min_count=12.0000");
        assert_eq!(result.order(), 2);
    }

    #[test]
    fn test_serializes_to_json() {
        let result = SubgroupResult {
            members: vec![5],
            aggregates: vec![1.0],
            metric_names: vec!["support".to_string()],
            metric_values: vec![1.0],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["members"], serde_json::json!([5]));
        assert_eq!(json["metric_values"], serde_json::json!([1.0]));
    }
}
