//! Backend name -> constructor table

use super::labels::LabelBackend;
use super::spotinst::SpotinstBackend;
use super::{Backend, BackendOptions, DiscoveryOptions, ResourceLimiter};
use crate::error::{Result, ScalerError};
use crate::observability::ScalerMetrics;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Constructor for one backend
pub type BackendFactory = Arc<
    dyn Fn(&BackendOptions, &DiscoveryOptions, &ResourceLimiter) -> Result<Arc<dyn Backend>>
        + Send
        + Sync,
>;

/// A registered backend
#[derive(Clone)]
pub struct BackendDescriptor {
    pub name: String,
    pub factory: BackendFactory,
    pub is_default: bool,
}

impl fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("name", &self.name)
            .field("is_default", &self.is_default)
            .finish_non_exhaustive()
    }
}

/// Table of available backends with exactly one default
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    descriptors: Vec<BackendDescriptor>,
    /// Position of the default in `descriptors`, fixed when the table is built
    default_index: usize,
}

impl BackendRegistry {
    pub fn builder() -> BackendRegistryBuilder {
        BackendRegistryBuilder::default()
    }

    /// Backends shipped with this crate; `spotinst` is the default
    pub fn builtin() -> Self {
        Self {
            descriptors: vec![
                BackendDescriptor {
                    name: SpotinstBackend::NAME.to_string(),
                    factory: Arc::new(SpotinstBackend::build),
                    is_default: true,
                },
                BackendDescriptor {
                    name: LabelBackend::NAME.to_string(),
                    factory: Arc::new(LabelBackend::build),
                    is_default: false,
                },
            ],
            default_index: 0,
        }
    }

    pub fn descriptors(&self) -> &[BackendDescriptor] {
        &self.descriptors
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn default_name(&self) -> &str {
        self.default_descriptor().name.as_str()
    }

    fn default_descriptor(&self) -> &BackendDescriptor {
        &self.descriptors[self.default_index]
    }

    /// Factory registered under `name`, or the default factory for an empty name
    pub fn resolve(&self, name: &str) -> Result<&BackendFactory> {
        if name.is_empty() {
            return Ok(&self.default_descriptor().factory);
        }
        self.descriptors
            .iter()
            .find(|d| d.name == name)
            .map(|d| &d.factory)
            .ok_or_else(|| ScalerError::UnknownBackend(name.to_string()))
    }

    /// Validate the options, then construct the backend registered under `name`
    pub fn build(
        &self,
        name: &str,
        options: &BackendOptions,
        discovery: &DiscoveryOptions,
        limiter: &ResourceLimiter,
    ) -> Result<Arc<dyn Backend>> {
        let metrics = ScalerMetrics::new();
        let resolved_name = if name.is_empty() {
            self.default_name()
        } else {
            name
        };

        let result = options
            .validate()
            .and_then(|_| limiter.validate())
            .and_then(|_| self.resolve(name))
            .and_then(|factory| factory(options, discovery, limiter));

        match &result {
            Ok(backend) => {
                info!(
                    backend = %backend.name(),
                    node_groups = backend.node_groups().len(),
                    "Backend built"
                );
            }
            Err(e) => warn!(backend = %resolved_name, error = %e, "Failed to build backend"),
        }
        metrics.record_backend_build(resolved_name, result.is_ok());

        result
    }
}

/// Collects descriptors and checks the table invariants on [`build`](Self::build)
#[derive(Default)]
pub struct BackendRegistryBuilder {
    descriptors: Vec<BackendDescriptor>,
    default: Option<String>,
}

impl BackendRegistryBuilder {
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&BackendOptions, &DiscoveryOptions, &ResourceLimiter) -> Result<Arc<dyn Backend>>
            + Send
            + Sync
            + 'static,
    {
        self.descriptors.push(BackendDescriptor {
            name: name.into(),
            factory: Arc::new(factory),
            is_default: false,
        });
        self
    }

    pub fn default_backend(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    pub fn build(mut self) -> Result<BackendRegistry> {
        let mut seen = HashSet::new();
        for descriptor in &self.descriptors {
            if descriptor.name.is_empty() {
                return Err(ScalerError::InvalidOptions(
                    "backend names must not be empty".to_string(),
                ));
            }
            if !seen.insert(descriptor.name.as_str()) {
                return Err(ScalerError::InvalidOptions(format!(
                    "backend {} registered twice",
                    descriptor.name
                )));
            }
        }

        let default = self.default.take().ok_or_else(|| {
            ScalerError::InvalidOptions("no default backend configured".to_string())
        })?;
        let default_index = self
            .descriptors
            .iter()
            .position(|d| d.name == default)
            .ok_or_else(|| {
                ScalerError::InvalidOptions(format!("default backend {default} is not registered"))
            })?;
        self.descriptors[default_index].is_default = true;

        Ok(BackendRegistry {
            descriptors: self.descriptors,
            default_index,
        })
    }
}
