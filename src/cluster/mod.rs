//! Cluster assignment module

pub mod assigner;

use serde::{Serialize, Deserialize};

pub use assigner::{assign_cluster, AssignError};

/// Identifier of a detected community
pub type ClusterId = u32;

/// Tag reported when no cluster could be determined
pub const UNASSIGNED_TAG: &str = "Unassigned";

/// Tag reported for clusters without an entry in the tag mapping
pub const UNKNOWN_TAG: &str = "Unknown";

/// Number of most similar users consulted when voting on a cluster
pub const DEFAULT_TOP_N: usize = 3;

/// Result of assigning a new user to a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    /// Assigned cluster, `None` when the user could not be classified
    pub cluster: Option<ClusterId>,

    /// Human-readable tag of the cluster
    pub tag: String,
}

impl ClusterAssignment {
    /// The "could not auto-classify" sentinel
    pub fn unassigned() -> Self {
        Self {
            cluster: None,
            tag: UNASSIGNED_TAG.to_string(),
        }
    }

    /// Whether a cluster was found
    pub fn is_assigned(&self) -> bool {
        self.cluster.is_some()
    }
}
