//! Node group handles

use super::spec::PoolSpec;
use super::BackendManager;
use crate::error::{Result, ScalerError};
use crate::models::ComputeNode;
use std::fmt;
use std::sync::{Arc, Weak};

/// Identity and bounds of one node group.
///
/// Handles are created once when a backend is built and never change
/// afterwards. Instance lookups and template synthesis are delegated to the
/// backend's manager, which the handle refers to without owning.
pub struct NodeGroupHandle {
    id: String,
    min_size: usize,
    max_size: usize,
    payload: String,
    manager: Weak<dyn BackendManager>,
}

impl NodeGroupHandle {
    pub fn new(spec: PoolSpec, manager: Weak<dyn BackendManager>) -> Self {
        Self {
            id: spec.name,
            min_size: spec.min_size,
            max_size: spec.max_size,
            payload: spec.payload,
            manager,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `(min_size, max_size)`
    pub fn bounds(&self) -> (usize, usize) {
        (self.min_size, self.max_size)
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Backend-specific tail of the node group spec
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Group owning `instance_id`, as known to the backend
    pub fn owner_lookup(&self, instance_id: &str) -> Result<Arc<NodeGroupHandle>> {
        self.manager()?.group_for_instance(instance_id)
    }

    /// Ask the backend what a new node in this group would look like
    pub async fn template_node(&self) -> Result<ComputeNode> {
        let manager = self.manager()?;
        manager.template_node(self).await
    }

    fn manager(&self) -> Result<Arc<dyn BackendManager>> {
        self.manager
            .upgrade()
            .ok_or_else(|| ScalerError::BackendGone(self.id.clone()))
    }
}

impl fmt::Debug for NodeGroupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeGroupHandle")
            .field("id", &self.id)
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}
