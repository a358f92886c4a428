//! Bipartite user/interest graph representation and algorithms

pub mod compressed;
pub mod builder;
pub mod algorithms;

pub use builder::GraphBuilder;
pub use compressed::{BipartiteGraph, NodeKind};

/// Errors raised while building or editing a bipartite graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A node with this id is already present
    #[error("node already exists: {0}")]
    DuplicateNode(String),

    /// A node id was reused with a different side of the bipartition
    #[error("node {id} is a {existing:?} node, cannot reuse it as {requested:?}")]
    KindConflict {
        /// Offending node id
        id: String,
        /// Kind already recorded for the id
        existing: NodeKind,
        /// Kind the caller asked for
        requested: NodeKind,
    },

    /// An edge would connect two nodes on the same side
    #[error("edge {0} -- {1} does not cross the bipartition")]
    SameSideEdge(String, String),

    /// Node index out of range
    #[error("unknown node index {0}")]
    UnknownIndex(u32),
}
