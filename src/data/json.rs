//! JSON artifact formats

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cluster::ClusterId;
use crate::data::ArtifactError;
use crate::graph::{BipartiteGraph, GraphBuilder, NodeKind};

/// A node entry of the graph document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node id (user id or interest name)
    pub id: String,

    /// 0 for users, 1 for interests
    pub bipartite: u8,
}

/// Serialized bipartite graph: node list plus user/interest edge pairs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Declared nodes; isolated nodes only appear here
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,

    /// `[user, interest]` pairs
    #[serde(default)]
    pub edges: Vec<(String, String)>,
}

impl GraphDocument {
    /// Build the compressed graph described by this document
    pub fn into_graph(self) -> Result<BipartiteGraph> {
        let mut builder = GraphBuilder::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let kind = NodeKind::from_bipartite(node.bipartite).ok_or_else(|| {
                ArtifactError::InvalidSide { id: node.id.clone(), value: node.bipartite }
            })?;
            builder.get_or_create_node(&node.id, kind)?;
        }

        for (user, interest) in &self.edges {
            builder.connect(user, interest)?;
        }

        Ok(builder.build())
    }

    /// Describe an existing graph as a document
    pub fn from_graph(graph: &BipartiteGraph) -> Self {
        let nodes = (0..graph.node_count as u32)
            .map(|idx| NodeRecord {
                id: graph.node_id(idx).to_string(),
                bipartite: graph.kind(idx).bipartite(),
            })
            .collect();

        let mut edges = Vec::with_capacity(graph.edge_count());
        for user in 0..graph.node_count as u32 {
            if graph.kind(user) != NodeKind::User {
                continue;
            }
            for &interest in graph.neighbors(user as usize) {
                edges.push((graph.node_id(user).to_string(), graph.node_id(interest).to_string()));
            }
        }

        Self { nodes, edges }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(value)
}

/// Load a graph document
pub fn load_graph(path: &Path) -> Result<BipartiteGraph> {
    log::info!("Reading graph document: {}", path.display());
    let document: GraphDocument = read_json(path)?;
    document.into_graph()
}

/// Load the user -> cluster mapping
pub fn load_partition(path: &Path) -> Result<HashMap<String, ClusterId>> {
    log::info!("Reading partition: {}", path.display());
    read_json(path)
}

/// Load the cluster -> tag mapping (keys are stringified cluster ids)
pub fn load_tags(path: &Path) -> Result<HashMap<ClusterId, String>> {
    log::info!("Reading cluster tags: {}", path.display());
    read_json(path)
}
