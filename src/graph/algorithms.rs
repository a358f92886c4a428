//! Graph algorithms for similarity analysis

use crate::graph::BipartiteGraph;
use std::collections::HashMap;

/// Row of the weighted one-mode projection for a single node.
///
/// Two same-side nodes are connected in the projection when they share at
/// least one neighbor; the weight is the number of shared neighbors. Only
/// nodes accepted by `in_projection` are reported, and `node` itself is
/// never its own neighbor.
pub fn projected_neighbors<F>(
    graph: &BipartiteGraph,
    node: u32,
    in_projection: F,
) -> HashMap<u32, u32>
where
    F: Fn(u32) -> bool,
{
    let mut weights: HashMap<u32, u32> = HashMap::new();

    // Walk node -> shared neighbor -> other endpoint
    for &shared in graph.neighbors(node as usize) {
        for &other in graph.neighbors(shared as usize) {
            if other == node || !in_projection(other) {
                continue;
            }
            *weights.entry(other).or_insert(0) += 1;
        }
    }

    weights
}

/// Full weighted one-mode projection onto `members`.
///
/// Returns, for each member, its projected neighbors with their weights.
/// Members with no neighbor get an empty map.
pub fn weighted_projection(
    graph: &BipartiteGraph,
    members: &[u32],
) -> HashMap<u32, HashMap<u32, u32>> {
    let mut in_set = vec![false; graph.node_count];
    for &member in members {
        in_set[member as usize] = true;
    }

    members.iter()
        .map(|&member| {
            let row = projected_neighbors(graph, member, |other| in_set[other as usize]);
            (member, row)
        })
        .collect()
}
