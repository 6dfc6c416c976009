//! Neighbor pull estimation.
//!
//! Every node sees three groups of neighbors: the row above, the row below and its partners in the
//! same row. The ideal position blends the mean position of each group, weighting partners twice
//! as heavily as each vertical group. The same per-group means drive the spring forces used by the
//! solver.

use crate::graph::{Graph, NodeId, Relation};
use rustc_hash::FxHashMap;

/// Mean neighbor position for one relation group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMean {
    pub mean: f64,
    pub count: usize,
}

/// Denominator each group's contribution is divided by.
pub fn pull_weight(relation: Relation) -> f64 {
    match relation {
        Relation::Above | Relation::Below => 4.0,
        Relation::Partners => 2.0,
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedMean {
    epoch: u64,
    value: Option<GroupMean>,
}

/// Computes ideal positions and group means, memoizing per `(node, relation)`.
///
/// A cached mean stays valid until the row it reads from gets a new epoch, so rows that did not
/// move between rounds are not re-summed.
#[derive(Debug, Default)]
pub struct Estimator {
    cache: FxHashMap<(NodeId, Relation), CachedMean>,
    hits: u64,
    misses: u64,
}

impl Estimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean position of `id`'s neighbors in `relation`, or `None` if the group is empty.
    pub fn group_mean(
        &mut self,
        graph: &Graph,
        id: NodeId,
        relation: Relation,
    ) -> Option<GroupMean> {
        let node = graph.node(id);
        let neighbors = node.related(relation);
        if neighbors.is_empty() {
            return None;
        }
        let dep_row = match relation {
            Relation::Above => node.row() - 1,
            Relation::Below => node.row() + 1,
            Relation::Partners => node.row(),
        };
        let epoch = graph.row_epoch(dep_row);
        if let Some(c) = self.cache.get(&(id, relation)) {
            if c.epoch == epoch {
                self.hits += 1;
                return c.value;
            }
        }
        self.misses += 1;
        let value = Some(mean_of(graph, neighbors));
        self.cache.insert((id, relation), CachedMean { epoch, value });
        value
    }

    /// Weighted blend of the three neighbor groups.
    ///
    /// A missing group contributes the node's own position, so it neither pulls nor biases.
    pub fn ideal_position(&mut self, graph: &Graph, id: NodeId) -> f64 {
        let own = graph.position(id);
        Relation::ALL
            .into_iter()
            .map(|rel| {
                let p = self.group_mean(graph, id, rel).map_or(own, |g| g.mean);
                p / pull_weight(rel)
            })
            .sum()
    }

    /// Net spring stretch acting on `id`: each neighbor pulls toward its own position with the
    /// stiffness of its relation.
    pub fn spring_force(
        &mut self,
        graph: &Graph,
        id: NodeId,
        vertical_stiffness: f64,
        partner_stiffness: f64,
    ) -> f64 {
        let own = graph.position(id);
        Relation::ALL
            .into_iter()
            .filter_map(|rel| {
                let g = self.group_mean(graph, id, rel)?;
                let k = match rel {
                    Relation::Above | Relation::Below => vertical_stiffness,
                    Relation::Partners => partner_stiffness,
                };
                Some(k * g.count as f64 * (g.mean - own))
            })
            .sum()
    }

    /// `(hits, misses)` of the group-mean cache.
    pub fn cache_stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

fn mean_of(graph: &Graph, ids: &[NodeId]) -> GroupMean {
    let total: f64 = ids.iter().map(|&n| graph.position(n)).sum();
    GroupMean {
        mean: total / ids.len() as f64,
        count: ids.len(),
    }
}
