//! Parquet edge tables for the bipartite graph

use std::path::Path;
use anyhow::Result;
use polars::prelude::*;
use crate::data::ArtifactError;
use crate::graph::{BipartiteGraph, GraphBuilder};
use log;

/// Column holding the user id of each edge
pub const USER_COLUMN: &str = "user_id";

/// Column holding the interest name of each edge
pub const INTEREST_COLUMN: &str = "interest";

/// Load a user/interest edge table into a bipartite graph
pub fn load_edge_table(path: &Path) -> Result<BipartiteGraph> {
    log::info!("Reading parquet file: {}", path.display());

    // Check if the file exists
    if !path.exists() {
        return Err(anyhow::anyhow!("File not found: {}", path.display()));
    }

    let mut frame = LazyFrame::scan_parquet(path, Default::default())?;

    // The null filter below would fail on a missing column with a generic error
    let schema = frame.collect_schema()?;
    log::debug!("File schema: {:?}", schema);

    for column in [USER_COLUMN, INTEREST_COLUMN] {
        if schema.get(column).is_none() {
            return Err(ArtifactError::MissingColumn { path: path.to_path_buf(), column }.into());
        }
    }

    let df = frame
        .filter(col(USER_COLUMN).is_not_null().and(col(INTEREST_COLUMN).is_not_null()))
        .collect()?;

    let user_col = df.column(USER_COLUMN)?.str()?;
    let interest_col = df.column(INTEREST_COLUMN)?.str()?;

    let row_count = df.height();
    log::info!("Processing {} user/interest rows", row_count);

    let mut builder = GraphBuilder::with_capacity(row_count);
    let mut skipped = 0usize;

    for i in 0..row_count {
        let (Some(user), Some(interest)) = (user_col.get(i), interest_col.get(i)) else {
            skipped += 1;
            continue;
        };

        // Interests are stored with stray quotes and padding in some exports
        let interest = interest.trim_matches(|c: char| c == '\'' || c.is_whitespace());
        if interest.is_empty() {
            skipped += 1;
            continue;
        }

        builder.connect(user, interest)?;
    }

    if skipped > 0 {
        log::warn!("Skipped {} incomplete rows", skipped);
    }

    Ok(builder.build())
}
