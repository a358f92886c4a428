//! Assign previously unseen users to existing clusters

use itertools::Itertools;
use crate::cluster::{ClusterAssignment, ClusterId};
use crate::data::Artifacts;
use crate::graph::algorithms::projected_neighbors;
use crate::graph::{GraphBuilder, GraphError, NodeKind};
use log;

/// Errors raised by cluster assignment
#[derive(Debug, thiserror::Error)]
pub enum AssignError {
    /// The candidate id already names a node of the static graph
    #[error("candidate id {0} collides with an existing graph node")]
    CandidateIdCollision(String),

    /// The working copy could not be extended
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Assign a new user to the cluster its most similar known users belong to.
///
/// The candidate is inserted into a working copy of the static graph and
/// linked to every declared interest the graph knows; unknown interests are
/// dropped. Similarity is the number of shared interests with each
/// partitioned user. The `top_n` most similar users (weight descending,
/// then user id ascending) vote with their clusters; the most frequent
/// cluster wins and ties go to the one seen first.
///
/// Returns the `Unassigned` sentinel when the candidate shares nothing
/// with any partitioned user.
pub fn assign_cluster<S: AsRef<str>>(
    artifacts: &Artifacts,
    candidate_id: &str,
    interests: &[S],
    top_n: usize,
) -> Result<ClusterAssignment, AssignError> {
    if artifacts.graph().contains(candidate_id) {
        return Err(AssignError::CandidateIdCollision(candidate_id.to_string()));
    }

    // Per-request copy; the shared graph is never edited
    let mut working = GraphBuilder::from_graph(artifacts.graph());
    let candidate = working.insert_node(candidate_id, NodeKind::User)?;

    let mut matched = 0usize;
    for interest in interests {
        let interest = interest.as_ref();
        match working.node_index(interest) {
            Some(idx) if working.kind(idx) == Some(NodeKind::Interest) => {
                working.add_edge(candidate, idx)?;
                matched += 1;
            }
            _ => log::debug!("Skipping unknown interest {:?} for {}", interest, candidate_id),
        }
    }

    if matched == 0 {
        log::debug!("{} matched none of {} interests", candidate_id, interests.len());
        return Ok(ClusterAssignment::unassigned());
    }

    let graph = working.build();
    let weights = projected_neighbors(&graph, candidate, |node| artifacts.is_anchor(node));

    if weights.is_empty() {
        log::debug!("{} shares no interests with any partitioned user", candidate_id);
        return Ok(ClusterAssignment::unassigned());
    }

    let top_neighbors: Vec<(&str, u32)> = weights.into_iter()
        .map(|(node, weight)| (graph.node_id(node), weight))
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .take(top_n)
        .collect();

    log::debug!("Top neighbors for {}: {:?}", candidate_id, top_neighbors);

    let neighbor_clusters: Vec<ClusterId> = top_neighbors.iter()
        .filter_map(|(user, _)| artifacts.cluster_of(user))
        .collect();

    let Some(cluster) = most_common(&neighbor_clusters) else {
        return Ok(ClusterAssignment::unassigned());
    };

    Ok(ClusterAssignment {
        cluster: Some(cluster),
        tag: artifacts.tag_for(cluster).to_string(),
    })
}

/// Most frequent value; ties resolve to the value encountered first
fn most_common(values: &[ClusterId]) -> Option<ClusterId> {
    let mut counts: Vec<(ClusterId, usize)> = Vec::new();

    for &value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(ClusterId, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }

    best.map(|(value, _)| value)
}
