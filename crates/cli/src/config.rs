//! Configuration management for the CLI

use anyhow::{Context, Result};
use scaler_lib::backend::{BackendOptions, DiscoveryOptions, ResourceLimiter};
use scaler_lib::estimator::{DEFAULT_MARKER_LABEL, DEFAULT_RESOURCE_NAME};
use scaler_lib::ComputeNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Settings for building a backend and running the estimators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerConfig {
    /// Backend name, empty for the registry default
    #[serde(default)]
    pub backend: String,

    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Node group specs, `identifier:minSize:maxSize[:payload]`
    #[serde(default)]
    pub node_groups: Vec<String>,

    /// Resource key the estimators work on
    #[serde(default = "default_resource_name")]
    pub resource_name: String,

    /// Label marking nodes that should provide the resource
    #[serde(default = "default_marker_label")]
    pub marker_label: String,

    /// Static template catalog referenced by node group payloads
    #[serde(default)]
    pub templates: BTreeMap<String, ComputeNode>,

    #[serde(default)]
    pub resource_limits: ResourceLimiter,
}

fn default_cluster_name() -> String {
    "default".to_string()
}

fn default_resource_name() -> String {
    DEFAULT_RESOURCE_NAME.to_string()
}

fn default_marker_label() -> String {
    DEFAULT_MARKER_LABEL.to_string()
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self {
            backend: String::new(),
            cluster_name: default_cluster_name(),
            node_groups: Vec::new(),
            resource_name: default_resource_name(),
            marker_label: default_marker_label(),
            templates: BTreeMap::new(),
            resource_limits: ResourceLimiter::default(),
        }
    }
}

impl ScalerConfig {
    /// Load configuration from an optional JSON file, overridden by `SCALER_*`
    /// environment variables (`SCALER_NODE_GROUPS` takes a comma separated list)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(true),
            );
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("SCALER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("node_groups"),
            )
            .build()
            .context("Failed to load configuration")?;

        let mut settings: Self = config
            .try_deserialize()
            .context("Failed to parse configuration")?;

        // `config` lowercases map keys; catalog names and resource keys are
        // case sensitive, so those sections are taken from the file as written
        if let Some(path) = path {
            let sections = KeyedSections::load(path)?;
            settings.templates = sections.templates;
            settings.resource_limits = sections.resource_limits;
        }

        Ok(settings)
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            cluster_name: self.cluster_name.clone(),
            templates: self.templates.clone(),
        }
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions::from_specs(self.node_groups.iter().cloned())
    }
}

/// Configuration sections keyed by template names and resource names
#[derive(Debug, Default, Deserialize)]
struct KeyedSections {
    #[serde(default)]
    templates: BTreeMap<String, ComputeNode>,
    #[serde(default)]
    resource_limits: ResourceLimiter,
}

impl KeyedSections {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse configuration {}", path.display()))
    }
}
