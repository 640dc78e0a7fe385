//! Pluggable fleet-management backends
//!
//! A backend owns a set of node groups built from textual specs and knows
//! how to map a cluster node back to the group that manages it. Backends are
//! selected by name through an explicit [`BackendRegistry`] table.

mod labels;
mod manager;
mod node_group;
mod registry;
mod spec;
mod spotinst;

#[cfg(test)]
mod tests;

pub use labels::{LabelBackend, NODE_GROUP_LABEL};
pub use manager::{InstanceManager, HOSTNAME_LABEL};
pub use node_group::NodeGroupHandle;
pub use registry::{BackendDescriptor, BackendFactory, BackendRegistry, BackendRegistryBuilder};
pub use spec::{PoolSpec, SpecParser};
pub use spotinst::{extract_instance_id, SpotinstBackend};

use crate::error::{Result, ScalerError};
use crate::models::{ComputeNode, ResourceList};
use crate::quantity::Quantity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Capabilities every fleet backend provides
pub trait Backend: Send + Sync {
    /// Registered backend name
    fn name(&self) -> &str;

    /// All node groups configured for this backend, in registration order
    fn node_groups(&self) -> Vec<Arc<NodeGroupHandle>>;

    /// The node group managing `node`, or `None` for nodes outside any group
    fn node_group_for_node(&self, node: &ComputeNode) -> Result<Option<Arc<NodeGroupHandle>>>;

    /// Cluster-wide resource limits this backend was built with
    fn resource_limiter(&self) -> &ResourceLimiter;

    /// Bind a cloud instance to one of this backend's groups
    fn bind_instance(&self, instance_id: &str, group_id: &str) -> Result<()>;

    /// Record a live node so its group can synthesize templates from it.
    /// Returns the group the node was attributed to, if any.
    fn observe_node(&self, node: &ComputeNode) -> Result<Option<Arc<NodeGroupHandle>>>;
}

/// Delegation target for [`NodeGroupHandle`]: the backend-side instance
/// index and template source
#[async_trait]
pub trait BackendManager: Send + Sync {
    /// Group owning a cloud instance
    fn group_for_instance(&self, instance_id: &str) -> Result<Arc<NodeGroupHandle>>;

    /// Synthesize the node a new instance of `group` would become
    async fn template_node(&self, group: &NodeGroupHandle) -> Result<ComputeNode>;
}

/// Backend-wide options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendOptions {
    #[serde(default)]
    pub cluster_name: String,
    /// Static template catalog, keyed by the name a node group spec's
    /// payload refers to
    #[serde(default)]
    pub templates: BTreeMap<String, ComputeNode>,
}

impl BackendOptions {
    pub fn validate(&self) -> Result<()> {
        for (name, template) in &self.templates {
            if name.trim().is_empty() {
                return Err(ScalerError::InvalidOptions(
                    "template names must not be empty".to_string(),
                ));
            }
            if template.capacity.is_empty() {
                return Err(ScalerError::InvalidOptions(format!(
                    "template {name} does not declare any capacity"
                )));
            }
        }
        Ok(())
    }
}

/// Where node groups come from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryOptions {
    /// `identifier:minSize:maxSize[:payload]` strings, one per group
    #[serde(default)]
    pub node_group_specs: Vec<String>,
}

impl DiscoveryOptions {
    pub fn from_specs<I, S>(specs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            node_group_specs: specs.into_iter().map(Into::into).collect(),
        }
    }
}

/// Cluster-wide minimum and maximum amounts per resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimiter {
    #[serde(default)]
    pub min: ResourceList,
    #[serde(default)]
    pub max: ResourceList,
}

impl ResourceLimiter {
    pub fn new(min: ResourceList, max: ResourceList) -> Self {
        Self { min, max }
    }

    /// Lower bound for a resource, zero when unset
    pub fn min_limit(&self, resource: &str) -> Quantity {
        self.min.get(resource).copied().unwrap_or_default()
    }

    /// Upper bound for a resource, unbounded when unset
    pub fn max_limit(&self, resource: &str) -> Quantity {
        self.max
            .get(resource)
            .copied()
            .unwrap_or(Quantity::new(u64::MAX))
    }

    pub fn validate(&self) -> Result<()> {
        for key in self.min.keys().chain(self.max.keys()) {
            if key.trim().is_empty() {
                return Err(ScalerError::InvalidOptions(
                    "resource limit keys must not be empty".to_string(),
                ));
            }
        }
        for (resource, min) in &self.min {
            let max = self.max_limit(resource);
            if *min > max {
                return Err(ScalerError::InvalidOptions(format!(
                    "minimum limit {min} for {resource} exceeds maximum {max}"
                )));
            }
        }
        Ok(())
    }
}
