//! Demand and supply estimation for a specialized node resource
//!
//! The resource key (e.g. `nvidia.com/gpu-memory`) and the node label that
//! marks resource-capable nodes are configuration values, so the same
//! estimators serve any vendor-specific resource.

mod capacity;
mod demand;


pub use capacity::{CapacityEstimate, CapacitySource, NodeCapacityEstimator};
pub use demand::ResourceDemandEstimator;

/// Default resource key
pub const DEFAULT_RESOURCE_NAME: &str = "nvidia.com/gpu-memory";

/// Default label marking nodes that are expected to provide the resource
pub const DEFAULT_MARKER_LABEL: &str = "accelerator";
