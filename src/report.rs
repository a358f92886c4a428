//! Summary report of the loaded artifacts

use anyhow::Result;
use crate::data::Artifacts;
use crate::graph::algorithms::weighted_projection;
use crate::graph::NodeKind;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use serde_json::{json, to_string_pretty, Value};

/// Build the artifact summary
pub fn summarize(artifacts: &Artifacts) -> Value {
    let graph = artifacts.graph();

    // Cluster sizes straight from the partition
    let mut sizes: BTreeMap<u32, usize> = BTreeMap::new();
    for &cluster in artifacts.partition().values() {
        *sizes.entry(cluster).or_insert(0) += 1;
    }

    let clusters: Vec<Value> = sizes.iter()
        .map(|(&cluster, &size)| {
            json!({
                "id": cluster,
                "tag": artifacts.tag_for(cluster),
                "size": size,
            })
        })
        .collect();

    // Degree distribution of the user projection, 0-100+ buckets
    let anchors = artifacts.anchor_nodes();
    let projection = weighted_projection(graph, &anchors);
    let mut degree_dist = vec![0usize; 101];
    let mut isolated = 0usize;

    for row in projection.values() {
        let bucket = std::cmp::min(row.len(), 100);
        degree_dist[bucket] += 1;
        if row.is_empty() {
            isolated += 1;
        }
    }

    let projected_edges = projection.values().map(|row| row.len()).sum::<usize>() / 2;

    json!({
        "graph_stats": {
            "user_count": graph.count_of(NodeKind::User),
            "interest_count": graph.count_of(NodeKind::Interest),
            "edge_count": graph.edge_count(),
            "memory_bytes": graph.memory_usage(),
        },
        "partition_stats": {
            "partitioned_users": artifacts.partition().len(),
            "missing_from_graph": artifacts.missing_anchor_count(),
            "cluster_count": sizes.len(),
            "tagged_clusters": artifacts.tags().len(),
        },
        "projection_stats": {
            "edge_count": projected_edges,
            "isolated_users": isolated,
            "degree_distribution": degree_dist,
        },
        "clusters": clusters,
    })
}

/// Write `summary.json` into the output directory
pub fn write_report(artifacts: &Artifacts, output_dir: &Path) -> Result<()> {
    log::info!("Writing artifact report to {}", output_dir.display());

    fs::create_dir_all(output_dir)?;

    let path = output_dir.join("summary.json");
    let mut file = File::create(path)?;
    file.write_all(to_string_pretty(&summarize(artifacts))?.as_bytes())?;

    Ok(())
}
