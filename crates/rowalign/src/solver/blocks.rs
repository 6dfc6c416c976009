//! Row resolution.
//!
//! Each node of a row wants to move by some amount. Nodes that would collide (come closer than
//! their combined buffers) are merged into a block which moves as a unit by the mean of its
//! members' wishes. Blocks keep absorbing neighbors until no two blocks collide; a block pressed
//! against the left edge of the row stops at position `floor`.
//!
//! Subtracting each node's cumulative minimum gap (`cum[i]`) from its target turns the gap
//! constraints into plain monotonicity, so the merge pass is pool-adjacent-violators over those
//! shifted targets.

/// Disjoint sets over row indices. Every set is a contiguous run.
#[derive(Debug, Clone)]
pub(crate) struct BlockSet {
    parent: Vec<usize>,
    first: Vec<usize>,
    last: Vec<usize>,
    sum: Vec<f64>,
    len: Vec<usize>,
}

impl BlockSet {
    pub(crate) fn singletons(levels: &[f64]) -> Self {
        let n = levels.len();
        Self {
            parent: (0..n).collect(),
            first: (0..n).collect(),
            last: (0..n).collect(),
            sum: levels.to_vec(),
            len: vec![1; n],
        }
    }

    pub(crate) fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            let grand = self.parent[self.parent[i]];
            self.parent[i] = grand;
            i = grand;
        }
        i
    }

    /// Joins two adjacent roots, `a` directly left of `b`. Returns the new root.
    pub(crate) fn merge(&mut self, a: usize, b: usize) -> usize {
        debug_assert_eq!(self.last[a] + 1, self.first[b]);
        let (root, child) = if self.len[a] >= self.len[b] { (a, b) } else { (b, a) };
        self.parent[child] = root;
        self.first[root] = self.first[a];
        self.last[root] = self.last[b];
        self.sum[root] = self.sum[a] + self.sum[b];
        self.len[root] = self.len[a] + self.len[b];
        root
    }

    /// Mean shifted target of the block rooted at `root`.
    pub(crate) fn level(&self, root: usize) -> f64 {
        self.sum[root] / self.len[root] as f64
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Resolution {
    pub(crate) positions: Vec<f64>,
    pub(crate) blocks: usize,
}

/// Moves `current` by `desired` as far as the gap constraints allow.
///
/// `gaps[k]` is the minimum distance between nodes `k` and `k + 1`.
pub(crate) fn resolve_row(
    current: &[f64],
    desired: &[f64],
    gaps: &[f64],
    floor: f64,
) -> Resolution {
    let n = current.len();
    debug_assert_eq!(desired.len(), n);
    debug_assert_eq!(gaps.len() + 1, n.max(1));
    if n == 0 {
        return Resolution {
            positions: Vec::new(),
            blocks: 0,
        };
    }

    let mut cum = Vec::with_capacity(n);
    cum.push(0.0);
    for g in gaps {
        let prev = cum[cum.len() - 1];
        cum.push(prev + g);
    }

    let levels: Vec<f64> = (0..n).map(|i| current[i] + desired[i] - cum[i]).collect();
    let mut set = BlockSet::singletons(&levels);
    let mut stack: Vec<usize> = Vec::with_capacity(n);
    for i in 0..n {
        let mut root = i;
        while let Some(&top) = stack.last() {
            if set.level(top) <= set.level(root) {
                break;
            }
            stack.pop();
            root = set.merge(top, root);
        }
        stack.push(root);
    }

    let mut positions = Vec::with_capacity(n);
    for (i, c) in cum.iter().enumerate() {
        let root = set.find(i);
        positions.push(set.level(root).max(floor) + c);
    }
    // Rounding only; block levels are already non-decreasing.
    for i in 1..n {
        let min = positions[i - 1] + gaps[i - 1];
        if positions[i] < min {
            positions[i] = min;
        }
    }

    Resolution {
        positions,
        blocks: stack.len(),
    }
}
