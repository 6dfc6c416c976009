//! Conversion of solved positions into renderer offsets.

use crate::descriptor::NodeKind;
use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectOptions {
    /// Boxes are shifted left by this much so their edges, not centers, line up.
    pub box_shift: f64,
    /// Subtracted from the gap that follows a box.
    pub box_inset: f64,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            box_shift: 2.0,
            box_inset: 4.0,
        }
    }
}

impl ProjectOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.box_shift.is_finite() {
            return Err(Error::InvalidOptions {
                message: format!("`box_shift` must be finite, got {}", self.box_shift),
            });
        }
        if !(self.box_inset.is_finite() && self.box_inset >= 0.0) {
            return Err(Error::InvalidOptions {
                message: format!(
                    "`box_inset` must be a nonnegative finite number, got {}",
                    self.box_inset
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Offset {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Absolute for the first node of a row, otherwise the gap to the left neighbor.
    pub offset: f64,
}

/// Projects the graph's current positions into per-row offsets.
///
/// Reads the graph only; projecting the same graph twice yields the same offsets.
pub fn project(graph: &Graph, opts: &ProjectOptions) -> Vec<Vec<Offset>> {
    let anchored: Vec<Vec<f64>> = graph
        .rows()
        .map(|ids| {
            ids.iter()
                .map(|&id| {
                    let node = graph.node(id);
                    match node.kind() {
                        NodeKind::Box => node.position() - opts.box_shift,
                        NodeKind::Point => node.position(),
                    }
                })
                .collect()
        })
        .collect();

    let base = anchored
        .iter()
        .filter_map(|row| row.first().copied())
        .fold(f64::INFINITY, f64::min);
    let base = if base.is_finite() { base } else { 0.0 };

    graph
        .rows()
        .zip(&anchored)
        .map(|(ids, shifted)| {
            let xs: Vec<f64> = shifted.iter().map(|&x| (x - base).max(0.0)).collect();
            ids.iter()
                .enumerate()
                .map(|(k, &id)| {
                    let offset = if k == 0 {
                        xs[0]
                    } else {
                        let inset = match graph.node(ids[k - 1]).kind() {
                            NodeKind::Box => opts.box_inset,
                            NodeKind::Point => 0.0,
                        };
                        (xs[k] - xs[k - 1] - inset).max(0.0)
                    };
                    Offset {
                        id,
                        kind: graph.node(id).kind(),
                        offset,
                    }
                })
                .collect()
        })
        .collect()
}
