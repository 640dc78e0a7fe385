//! Label-driven backend
//!
//! Nodes name their group through the [`NODE_GROUP_LABEL`] label, which
//! suits fleets whose provisioner stamps group membership on the node
//! instead of exposing a provider id. Groups here cannot scale to zero.

use super::manager::InstanceManager;
use super::node_group::NodeGroupHandle;
use super::spec::SpecParser;
use super::{Backend, BackendOptions, DiscoveryOptions, ResourceLimiter};
use crate::error::Result;
use crate::models::ComputeNode;
use std::sync::Arc;
use tracing::{debug, info};

/// Label carrying the node group id
pub const NODE_GROUP_LABEL: &str = "scaler.io/node-group";

pub struct LabelBackend {
    manager: Arc<InstanceManager>,
    limiter: ResourceLimiter,
}

impl LabelBackend {
    pub const NAME: &'static str = "labels";

    pub fn build(
        options: &BackendOptions,
        discovery: &DiscoveryOptions,
        limiter: &ResourceLimiter,
    ) -> Result<Arc<dyn Backend>> {
        info!(cluster = %options.cluster_name, "Building label backend");
        let specs = SpecParser::new()
            .scale_to_zero(false)
            .parse_all(&discovery.node_group_specs)?;

        let manager = InstanceManager::new(options.templates.clone());
        manager.register_groups(specs)?;

        Ok(Arc::new(Self {
            manager,
            limiter: limiter.clone(),
        }))
    }
}

impl Backend for LabelBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn node_groups(&self) -> Vec<Arc<NodeGroupHandle>> {
        self.manager.groups()
    }

    fn node_group_for_node(&self, node: &ComputeNode) -> Result<Option<Arc<NodeGroupHandle>>> {
        let Some(group_id) = node.labels.get(NODE_GROUP_LABEL) else {
            return Ok(None);
        };
        let group = self.manager.group(group_id);
        if group.is_none() {
            debug!(node = %node.name, group = %group_id, "Node labelled with unknown group");
        }
        Ok(group)
    }

    fn resource_limiter(&self) -> &ResourceLimiter {
        &self.limiter
    }

    fn bind_instance(&self, instance_id: &str, group_id: &str) -> Result<()> {
        self.manager.register_instance(instance_id, group_id)
    }

    fn observe_node(&self, node: &ComputeNode) -> Result<Option<Arc<NodeGroupHandle>>> {
        let group = self.node_group_for_node(node)?;
        self.manager.observe_attributed(group, node)
    }
}
