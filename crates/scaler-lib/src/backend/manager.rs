//! In-memory instance index and template source shared by the built-in
//! backends

use super::node_group::NodeGroupHandle;
use super::spec::PoolSpec;
use super::BackendManager;
use crate::error::{Result, ScalerError};
use crate::models::ComputeNode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Per-node identity label stripped from synthesized templates
pub const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

/// A live node last seen for a group
#[derive(Debug, Clone)]
struct ObservedNode {
    node: ComputeNode,
    observed_at: DateTime<Utc>,
}

/// Registry of node groups, instance bindings and template sources for
/// one backend
pub struct InstanceManager {
    /// group id -> (registration order, handle)
    groups: DashMap<String, (usize, Arc<NodeGroupHandle>)>,
    /// instance id -> group id
    instances: DashMap<String, String>,
    /// group id -> last live node with non-empty capacity
    observed: DashMap<String, ObservedNode>,
    /// Static templates keyed by the name a group's payload refers to
    templates: BTreeMap<String, ComputeNode>,
    next_order: AtomicUsize,
}

impl InstanceManager {
    pub fn new(templates: BTreeMap<String, ComputeNode>) -> Arc<Self> {
        Arc::new(Self {
            groups: DashMap::new(),
            instances: DashMap::new(),
            observed: DashMap::new(),
            templates,
            next_order: AtomicUsize::new(0),
        })
    }

    /// Register validated specs as node groups.
    ///
    /// Every spec is checked against the groups already registered before
    /// any of them is inserted, so a rejected batch leaves the index as it was.
    pub fn register_groups(
        self: &Arc<Self>,
        specs: Vec<PoolSpec>,
    ) -> Result<Vec<Arc<NodeGroupHandle>>> {
        if let Some(existing) = specs.iter().find(|s| self.groups.contains_key(&s.name)) {
            return Err(ScalerError::config(
                existing.name.clone(),
                format!("node group {} is already registered", existing.name),
            ));
        }

        let manager: Weak<dyn BackendManager> = Arc::downgrade(self) as Weak<dyn BackendManager>;
        let handles: Vec<Arc<NodeGroupHandle>> = specs
            .into_iter()
            .map(|spec| Arc::new(NodeGroupHandle::new(spec, manager.clone())))
            .collect();

        for handle in &handles {
            let order = self.next_order.fetch_add(1, Ordering::Relaxed);
            self.groups
                .insert(handle.id().to_string(), (order, Arc::clone(handle)));
            info!(
                group = %handle.id(),
                min_size = handle.min_size(),
                max_size = handle.max_size(),
                "Node group added"
            );
        }

        Ok(handles)
    }

    pub fn group(&self, group_id: &str) -> Option<Arc<NodeGroupHandle>> {
        self.groups.get(group_id).map(|entry| Arc::clone(&entry.1))
    }

    /// All groups in registration order
    pub fn groups(&self) -> Vec<Arc<NodeGroupHandle>> {
        let mut groups: Vec<(usize, Arc<NodeGroupHandle>)> = self
            .groups
            .iter()
            .map(|entry| (entry.0, Arc::clone(&entry.1)))
            .collect();
        groups.sort_by_key(|(order, _)| *order);
        groups.into_iter().map(|(_, handle)| handle).collect()
    }

    /// Bind a cloud instance to a registered group
    pub fn register_instance(&self, instance_id: &str, group_id: &str) -> Result<()> {
        if !self.groups.contains_key(group_id) {
            return Err(ScalerError::config(
                group_id,
                format!("cannot bind instance {instance_id} to unknown node group"),
            ));
        }
        debug!(instance_id = %instance_id, group = %group_id, "Binding instance");
        self.instances
            .insert(instance_id.to_string(), group_id.to_string());
        Ok(())
    }

    pub fn unregister_instance(&self, instance_id: &str) -> Option<String> {
        debug!(instance_id = %instance_id, "Unbinding instance");
        self.instances.remove(instance_id).map(|(_, group)| group)
    }

    /// Remember a live node of `group_id` as a template source. Nodes that
    /// report no capacity at all are ignored.
    pub fn observe_node(&self, group_id: &str, node: &ComputeNode) -> Result<()> {
        if !self.groups.contains_key(group_id) {
            return Err(ScalerError::config(
                group_id,
                format!("cannot attribute node {} to unknown node group", node.name),
            ));
        }
        if node.capacity.is_empty() {
            debug!(node = %node.name, group = %group_id, "Skipping node without capacity");
            return Ok(());
        }
        self.observed.insert(
            group_id.to_string(),
            ObservedNode {
                node: node.clone(),
                observed_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Record `node` under the group a backend attributed it to. Returns
    /// that group, or `None` when the node belongs to no group.
    pub fn observe_attributed(
        &self,
        group: Option<Arc<NodeGroupHandle>>,
        node: &ComputeNode,
    ) -> Result<Option<Arc<NodeGroupHandle>>> {
        if let Some(group) = &group {
            self.observe_node(group.id(), node)?;
        }
        Ok(group)
    }

    fn static_template(&self, group: &NodeGroupHandle) -> Option<ComputeNode> {
        let template = self.templates.get(group.payload())?;
        let mut node = template.clone();
        if node.allocatable.is_empty() {
            node.allocatable = node.capacity.clone();
        }
        Some(finish_template(node, group))
    }

    fn observed_template(&self, group: &NodeGroupHandle) -> Option<ComputeNode> {
        let observed = self.observed.get(group.id())?;
        debug!(
            group = %group.id(),
            source_node = %observed.node.name,
            observed_at = %observed.observed_at,
            "Building template from observed node"
        );
        let mut node = observed.node.clone();
        node.allocatable = node.capacity.clone();
        node.labels.remove(HOSTNAME_LABEL);
        Some(finish_template(node, group))
    }
}

fn finish_template(mut node: ComputeNode, group: &NodeGroupHandle) -> ComputeNode {
    node.name = format!("template-node-for-{}", group.id());
    node.provider_id.clear();
    node.labels
        .insert(super::NODE_GROUP_LABEL.to_string(), group.id().to_string());
    node
}

#[async_trait]
impl BackendManager for InstanceManager {
    fn group_for_instance(&self, instance_id: &str) -> Result<Arc<NodeGroupHandle>> {
        let group_id = self
            .instances
            .get(instance_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ScalerError::InstanceNotFound(instance_id.to_string()))?;
        self.group(&group_id)
            .ok_or_else(|| ScalerError::InstanceNotFound(instance_id.to_string()))
    }

    async fn template_node(&self, group: &NodeGroupHandle) -> Result<ComputeNode> {
        if let Some(template) = self.static_template(group) {
            return Ok(template);
        }
        if let Some(template) = self.observed_template(group) {
            return Ok(template);
        }
        Err(ScalerError::TemplateUnavailable {
            group: group.id().to_string(),
            reason: "no static template configured and no live node observed".to_string(),
        })
    }
}
