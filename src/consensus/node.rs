//! Execution node contexts and the statistics each node computes.

use std::borrow::Cow;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use super::types::NodeStatistics;

/// How node views are derived from the shared batch (configuration form)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeViewMode {
    /// Every node sees the batch exactly as submitted
    #[default]
    Identical,
    /// Every node sees the batch in its own seeded order
    Permuted,
}

/// The view of the input batch handed to a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeView {
    Identical,
    Permuted { seed: u64 },
}

/// One independent computation unit whose output feeds the reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeContext {
    pub id: usize,
    pub view: NodeView,
}

impl NodeContext {
    pub fn new(id: usize, view: NodeView) -> Self {
        Self { id, view }
    }

    /// Build `count` contexts for the given view mode
    pub fn build_all(count: usize, mode: NodeViewMode, seed: u64) -> Vec<NodeContext> {
        (0..count)
            .map(|id| {
                let view = match mode {
                    NodeViewMode::Identical => NodeView::Identical,
                    NodeViewMode::Permuted => NodeView::Permuted {
                        seed: seed.wrapping_add(id as u64),
                    },
                };
                NodeContext::new(id, view)
            })
            .collect()
    }

    /// Materialize this node's view of the shared batch
    pub fn view_of<'a>(&self, speeds: &'a [f64]) -> Cow<'a, [f64]> {
        match self.view {
            NodeView::Identical => Cow::Borrowed(speeds),
            NodeView::Permuted { seed } => {
                let mut owned = speeds.to_vec();
                owned.shuffle(&mut StdRng::seed_from_u64(seed));
                Cow::Owned(owned)
            }
        }
    }

    /// Compute mean, median, min and max over this node's view.
    ///
    /// Returns `None` for an empty batch.
    pub fn compute(&self, speeds: &[f64]) -> Option<NodeStatistics> {
        let view = self.view_of(speeds);
        let median_speed = median(&view)?;
        let average_speed = view.iter().sum::<f64>() / view.len() as f64;
        let min_speed = view.iter().copied().fold(f64::INFINITY, f64::min);
        let max_speed = view.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(NodeStatistics {
            average_speed,
            median_speed,
            min_speed,
            max_speed,
        })
    }
}

/// Median of a sequence: middle element for odd lengths, mean of the two
/// middle elements for even lengths
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
