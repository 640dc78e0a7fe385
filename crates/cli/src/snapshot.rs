//! Cluster snapshot files consumed by `estimate`

use anyhow::{Context, Result};
use scaler_lib::{ComputeNode, Workload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Nodes, pending workloads and instance bindings captured from a cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub nodes: Vec<ComputeNode>,
    #[serde(default)]
    pub workloads: Vec<Workload>,
    /// instance id -> node group id
    #[serde(default)]
    pub instances: BTreeMap<String, String>,
}

impl ClusterSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }
}
