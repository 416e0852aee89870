//! Median-of-node-outputs reduction.

use super::node::median;
use super::types::NodeStatistics;

/// Reduce per-node statistics to one value per statistic by taking the median
/// across nodes. The result does not depend on how many nodes produced output,
/// so a minority of divergent nodes cannot move it.
pub fn reduce(per_node: &[NodeStatistics]) -> Option<NodeStatistics> {
    let pick = |f: fn(&NodeStatistics) -> f64| -> Option<f64> {
        let values: Vec<f64> = per_node.iter().map(f).collect();
        median(&values)
    };

    Some(NodeStatistics {
        average_speed: pick(|s| s.average_speed)?,
        median_speed: pick(|s| s.median_speed)?,
        min_speed: pick(|s| s.min_speed)?,
        max_speed: pick(|s| s.max_speed)?,
    })
}

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
