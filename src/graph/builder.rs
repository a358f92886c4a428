//! Graph construction module

use crate::graph::{BipartiteGraph, GraphError, NodeKind};
use std::collections::HashMap;

/// Builder for incrementally constructing a BipartiteGraph
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    /// Mapping from string IDs to node indices
    id_to_index: HashMap<String, u32>,

    /// Node string IDs
    node_ids: Vec<String>,

    /// Side of the bipartition for each node
    kinds: Vec<NodeKind>,

    /// Adjacency lists for each node
    adjacency_lists: Vec<Vec<u32>>,
}

impl GraphBuilder {
    /// Create a new graph builder with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id_to_index: HashMap::with_capacity(capacity),
            node_ids: Vec::with_capacity(capacity),
            kinds: Vec::with_capacity(capacity),
            adjacency_lists: Vec::with_capacity(capacity),
        }
    }

    /// Expand an existing graph into an editable working copy.
    ///
    /// Node indices are preserved, so any per-node data keyed on the
    /// source graph's indices stays valid for the copy.
    pub fn from_graph(graph: &BipartiteGraph) -> Self {
        let adjacency_lists = (0..graph.node_count)
            .map(|node| graph.neighbors(node).to_vec())
            .collect();

        Self {
            id_to_index: graph.id_to_index.clone(),
            node_ids: graph.node_ids.clone(),
            kinds: graph.kinds.clone(),
            adjacency_lists,
        }
    }

    /// Number of nodes added so far
    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// Look up a node index by id
    pub fn node_index(&self, id: &str) -> Option<u32> {
        self.id_to_index.get(id).copied()
    }

    /// Side of the bipartition of a node
    pub fn kind(&self, node: u32) -> Option<NodeKind> {
        self.kinds.get(node as usize).copied()
    }

    /// Insert a node that must not exist yet
    pub fn insert_node(&mut self, id: &str, kind: NodeKind) -> Result<u32, GraphError> {
        if self.id_to_index.contains_key(id) {
            return Err(GraphError::DuplicateNode(id.to_string()));
        }
        Ok(self.push_node(id, kind))
    }

    /// Get or create a node for the given string ID
    pub fn get_or_create_node(&mut self, id: &str, kind: NodeKind) -> Result<u32, GraphError> {
        if let Some(&idx) = self.id_to_index.get(id) {
            let existing = self.kinds[idx as usize];
            if existing != kind {
                return Err(GraphError::KindConflict {
                    id: id.to_string(),
                    existing,
                    requested: kind,
                });
            }
            return Ok(idx);
        }

        Ok(self.push_node(id, kind))
    }

    fn push_node(&mut self, id: &str, kind: NodeKind) -> u32 {
        let idx = self.node_ids.len() as u32;
        self.id_to_index.insert(id.to_string(), idx);
        self.node_ids.push(id.to_string());
        self.kinds.push(kind);
        self.adjacency_lists.push(Vec::new());
        idx
    }

    /// Connect two existing nodes on opposite sides of the bipartition.
    ///
    /// Repeated edges are collapsed when the graph is built.
    pub fn add_edge(&mut self, a: u32, b: u32) -> Result<(), GraphError> {
        let kind_a = self.kind(a).ok_or(GraphError::UnknownIndex(a))?;
        let kind_b = self.kind(b).ok_or(GraphError::UnknownIndex(b))?;

        if kind_a == kind_b {
            return Err(GraphError::SameSideEdge(
                self.node_ids[a as usize].clone(),
                self.node_ids[b as usize].clone(),
            ));
        }

        self.adjacency_lists[a as usize].push(b);
        self.adjacency_lists[b as usize].push(a);

        Ok(())
    }

    /// Connect a user to an interest by id, creating either node if needed
    pub fn connect(&mut self, user: &str, interest: &str) -> Result<(), GraphError> {
        let user_idx = self.get_or_create_node(user, NodeKind::User)?;
        let interest_idx = self.get_or_create_node(interest, NodeKind::Interest)?;
        self.add_edge(user_idx, interest_idx)
    }

    /// Build the compressed graph
    pub fn build(mut self) -> BipartiteGraph {
        let node_count = self.node_ids.len();

        // Sort for binary search, drop repeated edges
        for list in &mut self.adjacency_lists {
            list.sort_unstable();
            list.dedup();
        }

        let edge_count: usize = self.adjacency_lists.iter()
            .map(|list| list.len())
            .sum();

        // Create offsets array
        let mut offsets = Vec::with_capacity(node_count + 1);
        offsets.push(0);

        let mut offset = 0;
        for list in &self.adjacency_lists {
            offset += list.len() as u32;
            offsets.push(offset);
        }

        let mut edges = Vec::with_capacity(edge_count);
        for list in &self.adjacency_lists {
            edges.extend_from_slice(list);
        }

        BipartiteGraph {
            node_count,
            offsets,
            edges,
            node_ids: self.node_ids,
            kinds: self.kinds,
            id_to_index: self.id_to_index,
        }
    }
}
