//! Memory-efficient bipartite graph representation

use std::collections::HashMap;
use std::mem;
use serde::{Serialize, Deserialize};

/// Side of the bipartition a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A person (`bipartite = 0`)
    User,

    /// A declared interest (`bipartite = 1`)
    Interest,
}

impl NodeKind {
    /// Numeric side marker used by the serialized artifacts
    pub fn bipartite(self) -> u8 {
        match self {
            NodeKind::User => 0,
            NodeKind::Interest => 1,
        }
    }

    /// Parse a numeric side marker
    pub fn from_bipartite(value: u8) -> Option<Self> {
        match value {
            0 => Some(NodeKind::User),
            1 => Some(NodeKind::Interest),
            _ => None,
        }
    }
}

/// Compressed sparse representation of an undirected bipartite graph.
///
/// Every edge is stored twice (once per endpoint) so that both
/// user -> interests and interest -> users lookups are slices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BipartiteGraph {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// Offset array: index where each node's edges begin
    /// offsets[i] to offsets[i+1] defines the edge range for node i
    pub offsets: Vec<u32>,

    /// Edge array: concatenated, sorted neighbor lists
    pub edges: Vec<u32>,

    /// Mapping from internal node indices to string ids
    pub node_ids: Vec<String>,

    /// Side of the bipartition for each node
    pub kinds: Vec<NodeKind>,

    /// Reverse mapping from string ids to node indices
    pub id_to_index: HashMap<String, u32>,
}

impl BipartiteGraph {
    /// Create an empty graph
    pub fn empty() -> Self {
        Self {
            node_count: 0,
            offsets: vec![0],
            edges: Vec::new(),
            node_ids: Vec::new(),
            kinds: Vec::new(),
            id_to_index: HashMap::new(),
        }
    }

    /// Look up the index of a node by its id
    pub fn node_index(&self, id: &str) -> Option<u32> {
        self.id_to_index.get(id).copied()
    }

    /// String id of a node
    pub fn node_id(&self, node: u32) -> &str {
        &self.node_ids[node as usize]
    }

    /// Side of the bipartition of a node
    pub fn kind(&self, node: u32) -> NodeKind {
        self.kinds[node as usize]
    }

    /// Whether a node with the given id exists
    pub fn contains(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    /// Get the neighbors of a node
    pub fn neighbors(&self, node: usize) -> &[u32] {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        &self.edges[start..end]
    }

    /// Check if there's an edge between `a` and `b`
    pub fn has_edge(&self, a: usize, b: u32) -> bool {
        self.neighbors(a).binary_search(&b).is_ok()
    }

    /// Get degree of a node
    pub fn degree(&self, node: usize) -> usize {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        end - start
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.edges.len() / 2
    }

    /// Number of nodes of the given kind
    pub fn count_of(&self, kind: NodeKind) -> usize {
        self.kinds.iter().filter(|&&k| k == kind).count()
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        let base = mem::size_of::<Self>();
        let offsets = self.offsets.capacity() * mem::size_of::<u32>();
        let edges = self.edges.capacity() * mem::size_of::<u32>();
        let kinds = self.kinds.capacity() * mem::size_of::<NodeKind>();

        // Ids are stored twice: in node_ids and as index keys
        let ids = self.node_ids.iter().map(|s| s.capacity()).sum::<usize>() * 2;
        let index = self.id_to_index.capacity() * mem::size_of::<(String, u32)>();

        base + offsets + edges + kinds + ids + index
    }
}

impl Default for BipartiteGraph {
    fn default() -> Self {
        Self::empty()
    }
}
