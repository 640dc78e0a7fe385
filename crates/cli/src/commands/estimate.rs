//! `estimate`: demand and per-node supply for a cluster snapshot

use anyhow::Result;
use colored::Colorize;
use futures::future::join_all;
use scaler_lib::{
    Backend, BackendRegistry, CapacityEstimate, ComputeNode, NodeCapacityEstimator, Quantity,
    ResourceDemandEstimator, ScalerMetrics,
};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;
use tracing::{debug, warn};

use super::build_backend;
use crate::config::ScalerConfig;
use crate::output::{
    color_source, format_quantity, print_json, print_rows, print_warning, OutputFormat,
};
use crate::snapshot::ClusterSnapshot;

/// Supply estimate for one node
#[derive(Debug, Serialize)]
pub struct NodeReport {
    pub node: String,
    pub group: Option<String>,
    #[serde(flatten)]
    pub estimate: Option<CapacityEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct DemandSummary {
    maximum: Quantity,
    total: Quantity,
    workloads: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EstimateReport {
    resource: String,
    backend: String,
    generated_at: String,
    demand: DemandSummary,
    supply: Quantity,
    nodes: Vec<NodeReport>,
}

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Node Group")]
    group: String,
    #[tabled(rename = "Capacity")]
    capacity: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub async fn run_estimate(
    registry: &BackendRegistry,
    config: &ScalerConfig,
    backend: Option<&str>,
    snapshot_path: &Path,
    show_metrics: bool,
    format: OutputFormat,
) -> Result<()> {
    let backend = build_backend(registry, config, backend)?;
    let snapshot = ClusterSnapshot::load(snapshot_path)?;

    sync_backend(backend.as_ref(), &snapshot, &config.resource_name)?;

    let demand = ResourceDemandEstimator::new(&config.resource_name).estimate(&snapshot.workloads);
    let estimator = NodeCapacityEstimator::new(&config.resource_name, &config.marker_label);
    let nodes = estimate_nodes(backend.as_ref(), &estimator, &snapshot.nodes).await;

    let supply: Quantity = nodes
        .iter()
        .filter_map(|n| n.estimate.map(|e| e.quantity))
        .sum();

    let report = EstimateReport {
        resource: config.resource_name.clone(),
        backend: backend.name().to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        demand: DemandSummary {
            maximum: demand.maximum_demand,
            total: demand.total_demand,
            workloads: demand
                .workloads
                .iter()
                .map(|w| qualified_name(&w.namespace, &w.name))
                .collect(),
        },
        supply,
        nodes,
    };

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => print_report(report),
    }

    if show_metrics {
        println!();
        print!("{}", ScalerMetrics::new().render());
    }

    Ok(())
}

/// Bind snapshot instances and feed fully initialized nodes to the
/// backend as template sources
fn sync_backend(backend: &dyn Backend, snapshot: &ClusterSnapshot, resource: &str) -> Result<()> {
    for (instance_id, group_id) in &snapshot.instances {
        backend.bind_instance(instance_id, group_id)?;
    }

    for node in &snapshot.nodes {
        if node.allocatable_of(resource).is_zero() {
            continue;
        }
        match backend.observe_node(node) {
            Ok(Some(group)) => {
                debug!(node = %node.name, group = %group.id(), "Observed initialized node")
            }
            Ok(None) => {}
            Err(e) => warn!(node = %node.name, error = %e, "Could not attribute node to a group"),
        }
    }
    Ok(())
}

/// Estimate every node concurrently; failures are reported per node
pub async fn estimate_nodes(
    backend: &dyn Backend,
    estimator: &NodeCapacityEstimator,
    nodes: &[ComputeNode],
) -> Vec<NodeReport> {
    join_all(nodes.iter().map(|node| async move {
        let group = match backend.node_group_for_node(node) {
            Ok(group) => group,
            Err(e) => {
                return NodeReport {
                    node: node.name.clone(),
                    group: None,
                    estimate: None,
                    error: Some(e.to_string()),
                }
            }
        };

        let result = estimator.node_capacity(node, group.as_deref()).await;
        NodeReport {
            node: node.name.clone(),
            group: group.map(|g| g.id().to_string()),
            estimate: result.as_ref().ok().copied(),
            error: result.err().map(|e| e.to_string()),
        }
    }))
    .await
}

fn qualified_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", namespace, name)
    }
}

fn print_report(report: EstimateReport) {
    println!("{}", "Capacity Estimate".bold());
    println!("{}", "=".repeat(50));
    println!("Resource:        {}", report.resource.cyan());
    println!("Backend:         {}", report.backend.cyan());
    println!();

    println!("{}", "Demand".bold());
    println!("{}", "-".repeat(50));
    println!("Workloads:       {}", report.demand.workloads.len());
    println!("Largest request: {}", format_quantity(report.demand.maximum));
    println!("Total requested: {}", format_quantity(report.demand.total));
    println!();

    println!("{}", "Supply".bold());
    println!("{}", "-".repeat(50));
    let failures = report.nodes.iter().filter(|n| n.error.is_some()).count();
    let rows: Vec<NodeRow> = report
        .nodes
        .into_iter()
        .map(|n| NodeRow {
            node: n.node,
            group: n.group.unwrap_or_else(|| "-".to_string()),
            capacity: n
                .estimate
                .map(|e| format_quantity(e.quantity))
                .unwrap_or_else(|| "-".to_string()),
            source: match (n.estimate, n.error) {
                (Some(e), _) => color_source(e.source),
                (None, Some(error)) => error.red().to_string(),
                (None, None) => "-".to_string(),
            },
        })
        .collect();
    print_rows(rows, &(), OutputFormat::Table);
    println!("\nTotal supply: {}", format_quantity(report.supply).green());

    if failures > 0 {
        print_warning(&format!(
            "{} node(s) could not be estimated; their capacity is excluded",
            failures
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scaler_lib::backend::{BackendOptions, DiscoveryOptions, ResourceLimiter};
    use scaler_lib::CapacitySource;

    const GPU_MEMORY: &str = "nvidia.com/gpu-memory";

    #[tokio::test]
    async fn test_estimate_nodes_reports_each_outcome() {
        let backend = BackendRegistry::builtin()
            .build(
                "",
                &BackendOptions::default(),
                &DiscoveryOptions::from_specs(["gpu:0:3"]),
                &ResourceLimiter::default(),
            )
            .unwrap();
        let snapshot = ClusterSnapshot {
            nodes: vec![
                ComputeNode::new("ready")
                    .with_provider_id("aws:///z/i-1")
                    .with_label("accelerator", "a10g")
                    .with_capacity(GPU_MEMORY, 24u64)
                    .with_allocatable(GPU_MEMORY, 24u64),
                ComputeNode::new("booting")
                    .with_provider_id("aws:///z/i-2")
                    .with_label("accelerator", "a10g"),
                ComputeNode::new("stray")
                    .with_provider_id("aws:///z/i-9")
                    .with_label("accelerator", "a10g"),
                ComputeNode::new("no-provider"),
            ],
            workloads: Vec::new(),
            instances: [("i-1", "gpu"), ("i-2", "gpu")]
                .into_iter()
                .map(|(i, g)| (i.to_string(), g.to_string()))
                .collect(),
        };

        sync_backend(backend.as_ref(), &snapshot, GPU_MEMORY).unwrap();
        let estimator = NodeCapacityEstimator::new(GPU_MEMORY, "accelerator");
        let reports = estimate_nodes(backend.as_ref(), &estimator, &snapshot.nodes).await;

        let ready = reports[0].estimate.unwrap();
        assert_eq!((ready.quantity, ready.source), (Quantity::new(24), CapacitySource::Observed));

        // The booting node borrows the ready node's capacity through the template
        let booting = reports[1].estimate.unwrap();
        assert_eq!(
            (booting.quantity, booting.source),
            (Quantity::new(24), CapacitySource::Template)
        );
        assert_eq!(reports[1].group.as_deref(), Some("gpu"));

        assert!(reports[2].estimate.is_none());
        assert!(reports[2].error.as_ref().unwrap().contains("managed node group"));

        assert!(reports[3].error.as_ref().unwrap().contains("provider id"));
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name("", "pod"), "pod");
        assert_eq!(qualified_name("ml", "pod"), "ml/pod");
    }
}
