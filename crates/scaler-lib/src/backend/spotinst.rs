//! Spotinst (Elastigroup) backend
//!
//! Nodes are attributed to groups through their cloud instance id, taken
//! from the last segment of the node's provider id.

use super::manager::InstanceManager;
use super::node_group::NodeGroupHandle;
use super::spec::SpecParser;
use super::{Backend, BackendManager, BackendOptions, DiscoveryOptions, ResourceLimiter};
use crate::error::{Result, ScalerError};
use crate::models::ComputeNode;
use std::sync::Arc;
use tracing::info;

pub struct SpotinstBackend {
    manager: Arc<InstanceManager>,
    limiter: ResourceLimiter,
}

impl SpotinstBackend {
    pub const NAME: &'static str = "spotinst";

    /// Build the backend and register every configured group
    pub fn build(
        options: &BackendOptions,
        discovery: &DiscoveryOptions,
        limiter: &ResourceLimiter,
    ) -> Result<Arc<dyn Backend>> {
        info!(cluster = %options.cluster_name, "Building Spotinst backend");
        let specs = SpecParser::new().parse_all(&discovery.node_group_specs)?;

        let manager = InstanceManager::new(options.templates.clone());
        manager.register_groups(specs)?;

        Ok(Arc::new(Self {
            manager,
            limiter: limiter.clone(),
        }))
    }
}

impl Backend for SpotinstBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn node_groups(&self) -> Vec<Arc<NodeGroupHandle>> {
        self.manager.groups()
    }

    fn node_group_for_node(&self, node: &ComputeNode) -> Result<Option<Arc<NodeGroupHandle>>> {
        let instance_id = extract_instance_id(&node.provider_id)?;
        match self.manager.group_for_instance(instance_id) {
            Ok(group) => Ok(Some(group)),
            Err(ScalerError::InstanceNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
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

/// Instance id from a provider id such as `aws:///us-east-1a/i-0abc123`
pub fn extract_instance_id(provider_id: &str) -> Result<&str> {
    let invalid = || ScalerError::InvalidProviderId(provider_id.to_string());

    let (scheme, path) = provider_id.split_once("://").ok_or_else(invalid)?;
    if scheme.is_empty() {
        return Err(invalid());
    }
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .ok_or_else(invalid)
}
