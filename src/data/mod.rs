//! Precomputed artifacts: bipartite graph, partition and cluster tags

pub mod json;
pub mod parquet;

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use anyhow::{Context, Result};

use crate::cluster::{ClusterId, UNKNOWN_TAG};
use crate::graph::{BipartiteGraph, NodeKind};

/// File name of the JSON graph document
pub const GRAPH_JSON: &str = "bipartite_graph.json";

/// File name of the bincode graph snapshot
pub const GRAPH_SNAPSHOT: &str = "bipartite_graph.bin";

/// File name of the Parquet edge table
pub const GRAPH_PARQUET: &str = "bipartite_graph.parquet";

/// File name of the user -> cluster mapping
pub const PARTITION_JSON: &str = "partition.json";

/// File name of the cluster -> tag mapping
pub const TAGS_JSON: &str = "cluster_tags.json";

/// Errors for artifacts that are present but malformed
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// None of the supported graph files exists in the directory
    #[error("no bipartite graph found in {0}")]
    MissingGraph(PathBuf),

    /// A node carries a side marker other than 0 or 1
    #[error("node {id} has invalid bipartite marker {value}")]
    InvalidSide {
        /// Node id
        id: String,
        /// Marker found in the file
        value: u8,
    },

    /// A required column is absent from an edge table
    #[error("edge table {path} is missing column {column}")]
    MissingColumn {
        /// Table path
        path: PathBuf,
        /// Column name
        column: &'static str,
    },
}

/// Immutable bundle of the static inputs used for cluster assignment
#[derive(Debug)]
pub struct Artifacts {
    graph: BipartiteGraph,
    partition: HashMap<String, ClusterId>,
    tags: HashMap<ClusterId, String>,

    /// anchors[i] is true when graph node i is a user present in the partition
    anchors: Vec<bool>,
}

impl Artifacts {
    /// Bundle already loaded artifacts
    pub fn new(
        graph: BipartiteGraph,
        partition: HashMap<String, ClusterId>,
        tags: HashMap<ClusterId, String>,
    ) -> Self {
        let mut anchors = vec![false; graph.node_count];
        let mut missing = 0usize;

        for user in partition.keys() {
            match graph.node_index(user) {
                Some(idx) if graph.kind(idx) == NodeKind::User => anchors[idx as usize] = true,
                _ => missing += 1,
            }
        }

        if missing > 0 {
            log::warn!("{} partitioned users are not user nodes of the graph", missing);
        }

        Self { graph, partition, tags, anchors }
    }

    /// Load every artifact from a directory.
    ///
    /// The graph is read from the bincode snapshot when present, then the
    /// JSON document, then the Parquet edge table.
    pub fn load(dir: &Path) -> Result<Self> {
        log::info!("Loading artifacts from {}", dir.display());

        let graph = load_graph(dir)?;
        let partition = json::load_partition(&dir.join(PARTITION_JSON))?;
        let tags = json::load_tags(&dir.join(TAGS_JSON))?;

        log::info!(
            "Loaded graph with {} users, {} interests and {} edges; {} partitioned users in {} tagged clusters",
            graph.count_of(NodeKind::User),
            graph.count_of(NodeKind::Interest),
            graph.edge_count(),
            partition.len(),
            tags.len()
        );

        Ok(Self::new(graph, partition, tags))
    }

    /// The static bipartite graph
    pub fn graph(&self) -> &BipartiteGraph {
        &self.graph
    }

    /// The user -> cluster mapping
    pub fn partition(&self) -> &HashMap<String, ClusterId> {
        &self.partition
    }

    /// The cluster -> tag mapping
    pub fn tags(&self) -> &HashMap<ClusterId, String> {
        &self.tags
    }

    /// Cluster of a known user
    pub fn cluster_of(&self, user: &str) -> Option<ClusterId> {
        self.partition.get(user).copied()
    }

    /// Tag of a cluster, "Unknown" when untagged
    pub fn tag_for(&self, cluster: ClusterId) -> &str {
        self.tags.get(&cluster).map(String::as_str).unwrap_or(UNKNOWN_TAG)
    }

    /// Whether a graph node is a partitioned user.
    ///
    /// Indices past the end of the static graph (nodes added to a working
    /// copy) are never anchors.
    pub fn is_anchor(&self, node: u32) -> bool {
        self.anchors.get(node as usize).copied().unwrap_or(false)
    }

    /// Indices of all anchor nodes
    pub fn anchor_nodes(&self) -> Vec<u32> {
        self.anchors.iter()
            .enumerate()
            .filter(|(_, &anchor)| anchor)
            .map(|(idx, _)| idx as u32)
            .collect()
    }

    /// Number of partitioned users that are missing from the graph
    pub fn missing_anchor_count(&self) -> usize {
        self.partition.len() - self.anchors.iter().filter(|&&a| a).count()
    }

    /// Write the graph as a bincode snapshot
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        save_graph_snapshot(&self.graph, path)
    }
}

/// Shared, swappable reference to the current artifacts.
///
/// Readers get an `Arc` they can hold for the duration of a request;
/// reloading swaps in a fresh bundle without touching the old one.
#[derive(Debug)]
pub struct ArtifactHandle {
    current: RwLock<Arc<Artifacts>>,
}

impl ArtifactHandle {
    /// Wrap an initial artifact bundle
    pub fn new(artifacts: Artifacts) -> Self {
        Self { current: RwLock::new(Arc::new(artifacts)) }
    }

    /// Current artifacts
    pub fn current(&self) -> Arc<Artifacts> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Atomically replace the artifacts, returning the previous bundle
    pub fn replace(&self, artifacts: Artifacts) -> Arc<Artifacts> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, Arc::new(artifacts))
    }

    /// Reload from a directory and swap in the result
    pub fn reload(&self, dir: &Path) -> Result<()> {
        let fresh = Artifacts::load(dir)?;
        self.replace(fresh);
        log::info!("Artifacts reloaded from {}", dir.display());
        Ok(())
    }
}

/// Load the graph from whichever supported file the directory holds.
///
/// The snapshot is preferred unless the JSON or Parquet source next to it
/// was modified after it; a stale snapshot is ignored with a warning.
pub fn load_graph(dir: &Path) -> Result<BipartiteGraph> {
    let snapshot = dir.join(GRAPH_SNAPSHOT);
    let source = [dir.join(GRAPH_JSON), dir.join(GRAPH_PARQUET)]
        .into_iter()
        .find(|path| path.exists());

    if snapshot.exists() {
        match &source {
            Some(source) if modified(source) > modified(&snapshot) => {
                log::warn!(
                    "{} is newer than {}, ignoring the snapshot",
                    source.display(),
                    snapshot.display()
                );
            }
            Some(source) => {
                log::warn!("Using {} over {}", snapshot.display(), source.display());
                return load_graph_snapshot(&snapshot);
            }
            None => return load_graph_snapshot(&snapshot),
        }
    }

    match source {
        Some(path) if path.ends_with(GRAPH_JSON) => json::load_graph(&path),
        Some(path) => parquet::load_edge_table(&path),
        None => Err(ArtifactError::MissingGraph(dir.to_path_buf()).into()),
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Write a graph as a bincode snapshot
pub fn save_graph_snapshot(graph: &BipartiteGraph, path: &Path) -> Result<()> {
    log::info!("Writing graph snapshot to {}", path.display());

    let file = File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    bincode::serialize_into(BufWriter::new(file), graph)?;

    Ok(())
}

/// Read a bincode graph snapshot
pub fn load_graph_snapshot(path: &Path) -> Result<BipartiteGraph> {
    log::info!("Reading graph snapshot: {}", path.display());

    let file = File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let graph: BipartiteGraph = bincode::deserialize_from(BufReader::new(file))
        .with_context(|| format!("decoding {}", path.display()))?;

    Ok(graph)
}
