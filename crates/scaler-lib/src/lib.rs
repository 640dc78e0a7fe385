//! Fleet backend registry and specialized-resource capacity estimation
//!
//! This crate provides:
//! - A name -> constructor table of pluggable fleet backends, each built
//!   from `identifier:minSize:maxSize[:payload]` node group specs
//! - Workload demand aggregation for one resource key
//! - Node supply estimation with a template fallback for nodes whose
//!   resource is not visible yet (scale-from-zero)
//! - Prometheus metrics for the above

pub mod backend;
pub mod error;
pub mod estimator;
pub mod models;
pub mod observability;
pub mod quantity;

pub use backend::{
    Backend, BackendOptions, BackendRegistry, DiscoveryOptions, NodeGroupHandle, ResourceLimiter,
};
pub use error::{Result, ScalerError};
pub use estimator::{
    CapacityEstimate, CapacitySource, NodeCapacityEstimator, ResourceDemandEstimator,
};
pub use models::*;
pub use observability::ScalerMetrics;
pub use quantity::Quantity;
