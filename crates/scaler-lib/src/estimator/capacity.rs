//! Node supply estimation with template fallback
//!
//! A node that is expected to provide the resource (it carries the marker
//! label) may not report it yet, typically because the device driver is
//! still being installed. For nodes in a managed group the group's template
//! node stands in for the real one; for anything else there is no safe value.

use crate::backend::NodeGroupHandle;
use crate::error::{Result, ScalerError};
use crate::models::ComputeNode;
use crate::observability::ScalerMetrics;
use crate::quantity::Quantity;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Where a capacity value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacitySource {
    /// Read from the node's allocatable resources
    Observed,
    /// Read from the node group's template capacity
    Template,
    /// The template exists but does not declare the resource
    TemplateMissingResource,
    /// The node group could not produce a template
    TemplateUnavailable,
    /// The node neither reports nor advertises the resource
    NotExpected,
}

impl CapacitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapacitySource::Observed => "observed",
            CapacitySource::Template => "template",
            CapacitySource::TemplateMissingResource => "template_missing_resource",
            CapacitySource::TemplateUnavailable => "template_unavailable",
            CapacitySource::NotExpected => "not_expected",
        }
    }

    /// Zero returned in place of an amount the node was expected to have
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            CapacitySource::TemplateMissingResource | CapacitySource::TemplateUnavailable
        )
    }
}

/// Resolved supply of the resource on one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityEstimate {
    pub quantity: Quantity,
    pub source: CapacitySource,
}

impl CapacityEstimate {
    fn new(quantity: Quantity, source: CapacitySource) -> Self {
        Self { quantity, source }
    }
}

/// Resolves how much of a resource a node supplies
#[derive(Clone)]
pub struct NodeCapacityEstimator {
    resource: String,
    marker_label: String,
    metrics: ScalerMetrics,
}

impl NodeCapacityEstimator {
    pub fn new(resource: impl Into<String>, marker_label: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            marker_label: marker_label.into(),
            metrics: ScalerMetrics::new(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn marker_label(&self) -> &str {
        &self.marker_label
    }

    /// True if the node advertises the resource or already reports a
    /// non-zero allocatable amount of it
    pub fn node_has_resource(&self, node: &ComputeNode) -> bool {
        node.has_label(&self.marker_label) || !node.allocatable_of(&self.resource).is_zero()
    }

    /// Resolve the node's supply of the resource.
    ///
    /// Observed allocatable always wins. Otherwise a marked node falls back
    /// to its group's template capacity, and a marked node without a group
    /// is an [`ScalerError::UnmanagedNode`] error. This is a single query:
    /// nothing is retried or cached.
    pub async fn node_capacity(
        &self,
        node: &ComputeNode,
        group: Option<&NodeGroupHandle>,
    ) -> Result<CapacityEstimate> {
        let result = self.resolve(node, group).await;
        match &result {
            Ok(estimate) => self.metrics.record_capacity_estimate(estimate.source.as_str()),
            Err(ScalerError::UnmanagedNode { .. }) => self.metrics.inc_unmanaged_node_errors(),
            Err(_) => {}
        }
        result
    }

    async fn resolve(
        &self,
        node: &ComputeNode,
        group: Option<&NodeGroupHandle>,
    ) -> Result<CapacityEstimate> {
        let allocatable = node.allocatable_of(&self.resource);
        if !allocatable.is_zero() {
            return Ok(CapacityEstimate::new(allocatable, CapacitySource::Observed));
        }

        if !node.has_label(&self.marker_label) {
            return Ok(CapacityEstimate::new(Quantity::ZERO, CapacitySource::NotExpected));
        }

        let Some(group) = group else {
            return Err(ScalerError::UnmanagedNode {
                node: node.name.clone(),
                resource: self.resource.clone(),
            });
        };

        debug!(
            node = %node.name,
            group = %group.id(),
            resource = %self.resource,
            "Resource not reported yet, consulting node group template"
        );

        let started = Instant::now();
        let template = group.template_node().await;
        self.metrics
            .observe_template_latency(started.elapsed().as_secs_f64());

        let template = match template {
            Ok(template) => template,
            Err(ScalerError::TemplateUnavailable { reason, .. }) => {
                warn!(
                    node = %node.name,
                    group = %group.id(),
                    reason = %reason,
                    "No template available for node group, assuming no capacity"
                );
                return Ok(CapacityEstimate::new(
                    Quantity::ZERO,
                    CapacitySource::TemplateUnavailable,
                ));
            }
            Err(e) => return Err(e),
        };

        let capacity = template.capacity_of(&self.resource);
        if capacity.is_zero() {
            warn!(
                node = %node.name,
                group = %group.id(),
                resource = %self.resource,
                "Template does not define the resource its group's nodes advertise"
            );
            return Ok(CapacityEstimate::new(
                Quantity::ZERO,
                CapacitySource::TemplateMissingResource,
            ));
        }

        Ok(CapacityEstimate::new(capacity, CapacitySource::Template))
    }
}
