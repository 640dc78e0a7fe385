//! Error types shared by the backend registry and the estimators

use thiserror::Error;

/// Errors raised while building backends or estimating capacity
#[derive(Debug, Error)]
pub enum ScalerError {
    /// A node group spec (or instance binding) failed validation
    #[error("invalid node group spec {spec:?}: {reason}")]
    Config { spec: String, reason: String },

    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    #[error("invalid backend options: {0}")]
    InvalidOptions(String),

    /// The node advertises the resource through its marker label but has no
    /// allocatable amount yet, and no managed node group to take a template from
    #[error(
        "node {node} is expected to provide {resource} but has no allocatable amount \
         and does not belong to a managed node group"
    )]
    UnmanagedNode { node: String, resource: String },

    #[error("template node unavailable for node group {group}: {reason}")]
    TemplateUnavailable { group: String, reason: String },

    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    #[error("invalid provider id: {0:?}")]
    InvalidProviderId(String),

    #[error("backend for node group {0} is no longer running")]
    BackendGone(String),

    #[error("invalid quantity: {0:?}")]
    InvalidQuantity(String),

    /// Failure reported by a backend's control plane
    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl ScalerError {
    pub(crate) fn config(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            spec: spec.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScalerError>;
