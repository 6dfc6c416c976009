use crate::graph::Graph;

/// Slides every isolated node (no relations at all) flush against its nearest connected row
/// neighbor.
///
/// A run of isolated nodes between two connected nodes splits: the part closer to the left
/// neighbor packs against it, the rest packs against the right neighbor. Runs with no connected
/// neighbor on either side stay where they are. Returns how many nodes moved.
pub fn compact_isolated(graph: &mut Graph) -> usize {
    let mut moved = 0;
    for r in 0..graph.row_count() {
        let ids = graph.row(r).to_vec();
        let isolated: Vec<bool> = ids.iter().map(|&id| graph.node(id).is_isolated()).collect();
        let mut positions = graph.row_positions(r);
        let gaps = graph.row_gaps(r);

        let mut start = 0;
        while start < ids.len() {
            if !isolated[start] {
                start += 1;
                continue;
            }
            let mut end = start;
            while end + 1 < ids.len() && isolated[end + 1] {
                end += 1;
            }
            let left = start.checked_sub(1);
            let right = (end + 1 < ids.len()).then_some(end + 1);

            // Nodes [start, split) pack to the left, [split, end] to the right.
            let split = match (left, right) {
                (None, None) => {
                    start = end + 1;
                    continue;
                }
                (Some(_), None) => end + 1,
                (None, Some(_)) => start,
                (Some(l), Some(rt)) => (start..=end)
                    .find(|&k| positions[k] - positions[l] > positions[rt] - positions[k])
                    .unwrap_or(end + 1),
            };

            for k in start..split {
                let target = positions[k - 1] + gaps[k - 1];
                if positions[k] != target {
                    positions[k] = target;
                    moved += 1;
                }
            }
            for k in (split..=end).rev() {
                let target = positions[k + 1] - gaps[k];
                if positions[k] != target {
                    positions[k] = target;
                    moved += 1;
                }
            }
            start = end + 1;
        }

        graph.set_row_positions(r, &positions);
    }
    moved
}
