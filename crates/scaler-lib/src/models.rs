//! Core data models for nodes, workloads and demand reports

use crate::quantity::Quantity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource key -> amount
pub type ResourceList = BTreeMap<String, Quantity>;

/// Point-in-time snapshot of a cluster node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputeNode {
    pub name: String,
    /// Cloud provider id, e.g. `aws:///us-east-1a/i-0abc`
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub capacity: ResourceList,
    #[serde(default)]
    pub allocatable: ResourceList,
}

impl ComputeNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_capacity(
        mut self,
        resource: impl Into<String>,
        amount: impl Into<Quantity>,
    ) -> Self {
        self.capacity.insert(resource.into(), amount.into());
        self
    }

    pub fn with_allocatable(
        mut self,
        resource: impl Into<String>,
        amount: impl Into<Quantity>,
    ) -> Self {
        self.allocatable.insert(resource.into(), amount.into());
        self
    }

    pub fn has_label(&self, key: &str) -> bool {
        self.labels.contains_key(key)
    }

    /// Allocatable amount of a resource, zero when absent
    pub fn allocatable_of(&self, resource: &str) -> Quantity {
        self.allocatable.get(resource).copied().unwrap_or_default()
    }

    /// Capacity of a resource, zero when absent
    pub fn capacity_of(&self, resource: &str) -> Quantity {
        self.capacity.get(resource).copied().unwrap_or_default()
    }
}

/// A container and its resource requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    #[serde(default)]
    pub requests: ResourceList,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requests: ResourceList::new(),
        }
    }

    pub fn with_request(
        mut self,
        resource: impl Into<String>,
        amount: impl Into<Quantity>,
    ) -> Self {
        self.requests.insert(resource.into(), amount.into());
        self
    }
}

/// A pending workload (pod) waiting for capacity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl Workload {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }
}

/// Aggregated demand for one resource across a batch of workloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDemandReport {
    /// Largest single-workload demand
    pub maximum_demand: Quantity,
    pub total_demand: Quantity,
    /// Workloads with non-zero demand, in input order
    pub workloads: Vec<Workload>,
}
