//! Row graph model.
//!
//! Nodes live in a single arena indexed by [`NodeId`]; rows hold ids in their fixed left-to-right
//! order. Relations are stored as ids once the index-based descriptors have been validated.

use crate::descriptor::{self, NodeDescriptor, NodeKind};
use crate::error::{Error, Result};
use crate::solver::INVARIANT_TOLERANCE;
use serde::Serialize;

mod validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Above,
    Below,
    Partners,
}

impl Relation {
    pub const ALL: [Relation; 3] = [Relation::Above, Relation::Below, Relation::Partners];

    /// The list the referenced node must use to point back.
    pub fn reciprocal(self) -> Relation {
        match self {
            Relation::Above => Relation::Below,
            Relation::Below => Relation::Above,
            Relation::Partners => Relation::Partners,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Above => "above",
            Relation::Below => "below",
            Relation::Partners => "partners",
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    row: usize,
    index: usize,
    pub(crate) position: f64,
    pub(crate) velocity: f64,
    above: Vec<NodeId>,
    below: Vec<NodeId>,
    partners: Vec<NodeId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn buffer(&self) -> f64 {
        self.kind.buffer()
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// Index within the row. Never changes after construction.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn above(&self) -> &[NodeId] {
        &self.above
    }

    pub fn below(&self) -> &[NodeId] {
        &self.below
    }

    pub fn partners(&self) -> &[NodeId] {
        &self.partners
    }

    pub fn related(&self, relation: Relation) -> &[NodeId] {
        match relation {
            Relation::Above => &self.above,
            Relation::Below => &self.below,
            Relation::Partners => &self.partners,
        }
    }

    pub fn is_isolated(&self) -> bool {
        self.above.is_empty() && self.below.is_empty() && self.partners.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Row {
    pub(crate) nodes: Vec<NodeId>,
    /// Bumped whenever any position in the row changes.
    pub(crate) epoch: u64,
}

#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    rows: Vec<Row>,
}

impl Graph {
    /// Validates the descriptors and builds a left-justified graph.
    ///
    /// Nothing is built unless every relation checks out.
    pub fn new(rows: &[Vec<NodeDescriptor>]) -> Result<Self> {
        validate::validate(rows)?;

        let mut offsets = Vec::with_capacity(rows.len());
        let mut next = 0usize;
        for row in rows {
            offsets.push(next);
            next += row.len();
        }
        let id_at = |r: usize, i: usize| NodeId(offsets[r] + i);

        let mut nodes = Vec::with_capacity(next);
        let mut graph_rows = Vec::with_capacity(rows.len());
        for (r, row) in rows.iter().enumerate() {
            let mut ids = Vec::with_capacity(row.len());
            for (i, desc) in row.iter().enumerate() {
                let id = id_at(r, i);
                // `validate` rejects above/below lists that point past the first/last row.
                let above = desc.above.iter().map(|&t| id_at(r - 1, t)).collect();
                let below = desc.below.iter().map(|&t| id_at(r + 1, t)).collect();
                let partners = desc.partners.iter().map(|&t| id_at(r, t)).collect();
                nodes.push(Node {
                    id,
                    kind: desc.kind,
                    row: r,
                    index: i,
                    position: 0.0,
                    velocity: 0.0,
                    above,
                    below,
                    partners,
                });
                ids.push(id);
            }
            graph_rows.push(Row {
                nodes: ids,
                epoch: 0,
            });
        }

        let mut graph = Self {
            nodes,
            rows: graph_rows,
        };
        graph.left_justify();
        tracing::debug!(
            rows = graph.row_count(),
            nodes = graph.node_count(),
            "built row graph"
        );
        Ok(graph)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let rows = descriptor::parse_rows_str(text)?;
        Self::new(&rows)
    }

    /// Places the first node of each row at 0 and packs the rest at their minimum gaps.
    pub fn left_justify(&mut self) {
        for r in 0..self.rows.len() {
            let mut spot = 0.0;
            let mut prev_buffer: Option<f64> = None;
            for k in 0..self.rows[r].nodes.len() {
                let id = self.rows[r].nodes[k];
                let node = &mut self.nodes[id.0];
                if let Some(b) = prev_buffer {
                    spot += b + node.buffer();
                }
                node.position = spot;
                node.velocity = 0.0;
                prev_buffer = Some(node.buffer());
            }
            self.rows[r].epoch += 1;
        }
    }

    /// Replaces all positions, e.g. to warm-start from a previous layout.
    ///
    /// The new positions must satisfy the positional invariants, with gaps allowed the same
    /// [`INVARIANT_TOLERANCE`] the solver keeps; otherwise the graph is left untouched and the
    /// violation is returned.
    pub fn seed_positions(&mut self, positions: &[Vec<f64>]) -> Result<()> {
        if positions.len() != self.rows.len() {
            return Err(Error::Malformed {
                path: "positions".to_string(),
                message: format!("expected {} rows, got {}", self.rows.len(), positions.len()),
            });
        }
        for (r, row) in positions.iter().enumerate() {
            if row.len() != self.rows[r].nodes.len() {
                return Err(Error::Malformed {
                    path: format!("positions[{r}]"),
                    message: format!(
                        "expected {} positions, got {}",
                        self.rows[r].nodes.len(),
                        row.len()
                    ),
                });
            }
        }

        let previous = self.positions();
        for (r, row) in positions.iter().enumerate() {
            self.set_row_positions(r, row);
        }
        if let Err(err) = self.check_invariants(INVARIANT_TOLERANCE) {
            for (r, row) in previous.iter().enumerate() {
                self.set_row_positions(r, row);
            }
            return Err(err);
        }
        self.reset_velocities();
        Ok(())
    }

    pub(crate) fn reset_velocities(&mut self) {
        for node in &mut self.nodes {
            node.velocity = 0.0;
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Ids of row `r`, left to right.
    pub fn row(&self, r: usize) -> &[NodeId] {
        &self.rows[r].nodes
    }

    pub fn rows(&self) -> impl Iterator<Item = &[NodeId]> + '_ {
        self.rows.iter().map(|r| r.nodes.as_slice())
    }

    /// Looks up the node at `index` in row `r`.
    pub fn node_at(&self, r: usize, index: usize) -> Option<&Node> {
        let id = *self.rows.get(r)?.nodes.get(index)?;
        Some(self.node(id))
    }

    pub(crate) fn row_epoch(&self, r: usize) -> u64 {
        self.rows[r].epoch
    }

    pub fn position(&self, id: NodeId) -> f64 {
        self.nodes[id.0].position
    }

    pub fn positions(&self) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|row| row.nodes.iter().map(|id| self.nodes[id.0].position).collect())
            .collect()
    }

    pub(crate) fn row_positions(&self, r: usize) -> Vec<f64> {
        self.rows[r]
            .nodes
            .iter()
            .map(|id| self.nodes[id.0].position)
            .collect()
    }

    /// Minimum distance between row neighbors `k` and `k + 1`.
    pub(crate) fn row_gaps(&self, r: usize) -> Vec<f64> {
        self.rows[r]
            .nodes
            .windows(2)
            .map(|w| self.nodes[w[0].0].buffer() + self.nodes[w[1].0].buffer())
            .collect()
    }

    /// Writes new positions for row `r`; the row epoch only moves if something changed.
    pub(crate) fn set_row_positions(&mut self, r: usize, positions: &[f64]) {
        debug_assert_eq!(positions.len(), self.rows[r].nodes.len());
        let mut changed = false;
        for (k, &p) in positions.iter().enumerate() {
            let id = self.rows[r].nodes[k];
            let node = &mut self.nodes[id.0];
            if node.position != p {
                node.position = p;
                changed = true;
            }
        }
        if changed {
            self.rows[r].epoch += 1;
        }
    }

    /// Checks the positional invariants: finite, nonnegative, ordered with minimum gaps.
    pub fn check_invariants(&self, tolerance: f64) -> Result<()> {
        for (r, row) in self.rows.iter().enumerate() {
            for (k, id) in row.nodes.iter().enumerate() {
                let node = &self.nodes[id.0];
                if !node.position.is_finite() {
                    return Err(Error::NonFinitePosition {
                        node: *id,
                        position: node.position,
                    });
                }
                if node.position < -tolerance {
                    return Err(Error::NegativePosition {
                        node: *id,
                        position: node.position,
                    });
                }
                if k + 1 < row.nodes.len() {
                    let next = &self.nodes[row.nodes[k + 1].0];
                    let gap = next.position - node.position;
                    let required = node.buffer() + next.buffer();
                    if gap < required - tolerance {
                        return Err(Error::GapViolation {
                            row: r,
                            index: k,
                            gap,
                            required,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
