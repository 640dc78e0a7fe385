//! CLI subcommands

pub mod backends;
pub mod estimate;
pub mod groups;

use crate::config::ScalerConfig;
use anyhow::{Context, Result};
use scaler_lib::{Backend, BackendRegistry};
use std::sync::Arc;

/// Build the backend named on the command line, falling back to the
/// configured one and then to the registry default
pub fn build_backend(
    registry: &BackendRegistry,
    config: &ScalerConfig,
    backend: Option<&str>,
) -> Result<Arc<dyn Backend>> {
    let name = backend.unwrap_or(&config.backend);
    registry
        .build(
            name,
            &config.backend_options(),
            &config.discovery_options(),
            &config.resource_limits,
        )
        .with_context(|| {
            if name.is_empty() {
                "Failed to build default backend".to_string()
            } else {
                format!("Failed to build backend {name}")
            }
        })
}
