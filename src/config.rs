//! Configuration management for the matcher

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Serialize, Deserialize};

use crate::cluster::DEFAULT_TOP_N;
use crate::placement::PlacementRules;

/// Runtime configuration for assignment and placement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the graph, partition and tag artifacts
    pub artifact_dir: PathBuf,

    /// Number of most similar users that vote on a cluster
    pub top_n: usize,

    /// Maximum members per subgroup
    pub max_subgroup_size: usize,

    /// Largest age difference allowed inside a subgroup
    pub max_age_gap: u32,

    /// Largest budget difference allowed inside a subgroup
    pub max_budget_gap: f64,

    /// Group used for users that could not be assigned to a cluster.
    /// Such users stay ungrouped when unset.
    pub fallback_group: Option<String>,

    /// Seed for id generation and subgroup naming
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("artifacts"),
            top_n: DEFAULT_TOP_N,
            max_subgroup_size: 5,
            max_age_gap: 5,
            max_budget_gap: 500.0,
            fallback_group: None,
            seed: None,
        }
    }
}

impl Config {
    /// Read a configuration file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening config {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Subgroup compatibility rules
    pub fn placement_rules(&self) -> PlacementRules {
        PlacementRules {
            max_members: self.max_subgroup_size,
            max_age_gap: self.max_age_gap,
            max_budget_gap: self.max_budget_gap,
        }
    }
}
