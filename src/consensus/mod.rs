//! Consensus statistics over batches of speed measurements.
//!
//! Every execution node computes mean, median, min and max over its own view
//! of the batch. The per-node outputs are reduced to one canonical value per
//! statistic by taking their median, and the result is rounded to two decimal
//! places only at the output boundary.

pub mod networks;
pub mod node;
pub mod reducer;
pub mod types;

use log::{debug, info};
use rayon::prelude::*;

use crate::config::ConsensusConfig;

pub use networks::summarize_by_network;
pub use node::{NodeContext, NodeView, NodeViewMode};
pub use reducer::{reduce, round2};
pub use types::*;

/// Reduces a batch of speeds to consensus statistics across simulated nodes
#[derive(Debug, Clone)]
pub struct ConsensusAggregator {
    nodes: Vec<NodeContext>,
}

impl ConsensusAggregator {
    /// Create an aggregator with `node_count` nodes that all see the batch unchanged
    pub fn new(node_count: usize) -> Result<Self, ConsensusError> {
        Self::with_view(node_count, NodeViewMode::Identical, 0)
    }

    pub fn with_view(node_count: usize, mode: NodeViewMode, seed: u64) -> Result<Self, ConsensusError> {
        if node_count == 0 {
            return Err(ConsensusError::InvalidNodeCount(node_count));
        }
        Ok(Self {
            nodes: NodeContext::build_all(node_count, mode, seed),
        })
    }

    pub fn from_config(config: &ConsensusConfig) -> Result<Self, ConsensusError> {
        Self::with_view(config.node_count, config.node_view, config.seed)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Compute consensus statistics for a batch of speeds
    pub fn aggregate(&self, speeds: &[f64]) -> Result<ConsensusResult, ConsensusError> {
        if speeds.is_empty() {
            return Err(ConsensusError::NoData);
        }
        if let Some((index, &value)) = speeds
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(ConsensusError::InvalidSpeed { index, value });
        }

        info!(
            "Calculating speed statistics for {} measurements across {} nodes",
            speeds.len(),
            self.nodes.len()
        );

        // Each node computes over the shared, immutable batch
        let per_node: Vec<NodeStatistics> = self
            .nodes
            .par_iter()
            .filter_map(|node| node.compute(speeds))
            .collect();

        for (node, stats) in self.nodes.iter().zip(&per_node) {
            debug!("Node {} computed {:?}", node.id, stats);
        }

        let consensus = reduce(&per_node).ok_or(ConsensusError::NoData)?;
        let result = finalize(speeds, &consensus);

        info!(
            "Speed statistics calculated: avg={} Mbps, median={} Mbps, range={}-{} Mbps",
            result.average_speed, result.median_speed, result.min_speed, result.max_speed
        );
        Ok(result)
    }

    /// Validate every record, then aggregate their speeds
    pub fn aggregate_records(&self, records: &[MeasurementRecord]) -> Result<ConsensusResult, ConsensusError> {
        if records.is_empty() {
            return Err(ConsensusError::NoData);
        }

        for (index, record) in records.iter().enumerate() {
            record
                .validate()
                .map_err(|reason| ConsensusError::InvalidRecord { index, reason })?;
        }

        let speeds: Vec<f64> = records.iter().map(|r| r.speed).collect();
        self.aggregate(&speeds)
    }

    /// Aggregate the `{speedData: [...]}` envelope; an absent field counts as no data
    pub fn aggregate_input(&self, input: &AggregationInput) -> Result<ConsensusResult, ConsensusError> {
        match &input.speed_data {
            Some(records) => self.aggregate_records(records),
            None => Err(ConsensusError::NoData),
        }
    }
}

/// Compute consensus statistics with `node_count` identical nodes
pub fn aggregate(speeds: &[f64], node_count: usize) -> Result<ConsensusResult, ConsensusError> {
    if speeds.is_empty() {
        return Err(ConsensusError::NoData);
    }
    ConsensusAggregator::new(node_count)?.aggregate(speeds)
}

/// Round the reduced statistics and attach the batch echo
fn finalize(speeds: &[f64], consensus: &NodeStatistics) -> ConsensusResult {
    let min_speed = round2(consensus.min_speed);
    let max_speed = round2(consensus.max_speed);

    ConsensusResult {
        total_inputs: speeds.len(),
        average_speed: round2(consensus.average_speed),
        median_speed: round2(consensus.median_speed),
        min_speed,
        max_speed,
        speed_range: round2(max_speed - min_speed),
        speeds: speeds.iter().copied().map(round2).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_two_decimals(value: f64) -> bool {
        let scaled = value * 100.0;
        (scaled - scaled.round()).abs() < 1e-6
    }

    #[test]
    fn test_end_to_end_four_speeds_three_nodes() {
        let result = aggregate(&[10.0, 20.0, 30.0, 40.0], 3).unwrap();
        assert_eq!(result.total_inputs, 4);
        assert_eq!(result.average_speed, 25.0);
        assert_eq!(result.median_speed, 25.0);
        assert_eq!(result.min_speed, 10.0);
        assert_eq!(result.max_speed, 40.0);
        assert_eq!(result.speed_range, 30.0);
        assert_eq!(result.speeds, vec![10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_empty_batch_is_no_data() {
        assert_eq!(aggregate(&[], 3), Err(ConsensusError::NoData));
        let aggregator = ConsensusAggregator::new(3).unwrap();
        assert_eq!(aggregator.aggregate_records(&[]), Err(ConsensusError::NoData));
        assert_eq!(
            aggregator.aggregate_input(&AggregationInput::default()),
            Err(ConsensusError::NoData)
        );
    }

    #[test]
    fn test_non_finite_speeds_rejected() {
        assert!(matches!(
            aggregate(&[f64::NAN], 3),
            Err(ConsensusError::InvalidSpeed { index: 0, .. })
        ));
        assert!(matches!(
            aggregate(&[10.0, f64::NAN], 3),
            Err(ConsensusError::InvalidSpeed { index: 1, .. })
        ));
        assert_eq!(
            aggregate(&[5.0, f64::INFINITY], 3),
            Err(ConsensusError::InvalidSpeed {
                index: 1,
                value: f64::INFINITY
            })
        );
        assert_eq!(
            aggregate(&[f64::NEG_INFINITY, 5.0], 1),
            Err(ConsensusError::InvalidSpeed {
                index: 0,
                value: f64::NEG_INFINITY
            })
        );
        assert!(matches!(
            aggregate(&[3.0, -1.0], 3),
            Err(ConsensusError::InvalidSpeed { index: 1, .. })
        ));

        let ok = aggregate(&[0.0, 7.5], 3).unwrap();
        assert!(ok.speed_range >= 0.0);
    }

    #[test]
    fn test_zero_nodes_rejected() {
        assert_eq!(aggregate(&[1.0], 0), Err(ConsensusError::InvalidNodeCount(0)));
    }

    #[test]
    fn test_rounding_and_range() {
        let result = aggregate(&[1.005, 2.3333, 7.77777], 5).unwrap();
        for value in [
            result.average_speed,
            result.median_speed,
            result.min_speed,
            result.max_speed,
            result.speed_range,
        ] {
            assert!(is_two_decimals(value), "{} is not rounded", value);
        }
        assert!(result.speeds.iter().all(|s| is_two_decimals(*s)));
        assert!(result.speed_range >= 0.0);
        assert_eq!(result.median_speed, 2.33);
        assert_eq!(result.max_speed, 7.78);
    }

    #[test]
    fn test_single_value_has_zero_range() {
        let result = aggregate(&[42.0], 1).unwrap();
        assert_eq!(result.speed_range, 0.0);
        assert_eq!(result.median_speed, 42.0);
    }

    #[test]
    fn test_permuted_views_agree_with_identical() {
        let speeds = [12.5, 80.0, 33.3, 41.0, 7.25, 19.0];
        let identical = ConsensusAggregator::new(4).unwrap().aggregate(&speeds).unwrap();
        let permuted = ConsensusAggregator::with_view(4, NodeViewMode::Permuted, 7)
            .unwrap()
            .aggregate(&speeds)
            .unwrap();
        assert_eq!(identical, permuted);
    }

    #[test]
    fn test_invalid_record_reports_index() {
        let good = MeasurementRecord {
            lat: 1.0,
            lon: 2.0,
            timestamp: "2025-11-22T12:23:00Z".to_string(),
            ip: "1.1.1.1".to_string(),
            wallet_address: "0x1".to_string(),
            speed: 10.0,
            wifi_name: None,
        };
        let mut bad = good.clone();
        bad.speed = -1.0;

        let err = ConsensusAggregator::new(3)
            .unwrap()
            .aggregate_records(&[good, bad])
            .unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidRecord { index: 1, .. }));
    }
}
