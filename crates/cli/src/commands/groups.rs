//! `groups`: build the configured backend and show its node groups

use anyhow::Result;
use colored::Colorize;
use scaler_lib::BackendRegistry;
use serde::Serialize;
use tabled::Tabled;

use super::build_backend;
use crate::config::ScalerConfig;
use crate::output::{print_rows, print_success, OutputFormat};

#[derive(Tabled, Serialize)]
struct GroupRow {
    #[tabled(rename = "Node Group")]
    id: String,
    #[tabled(rename = "Min")]
    min_size: usize,
    #[tabled(rename = "Max")]
    max_size: usize,
    #[tabled(rename = "Payload")]
    payload: String,
}

pub fn show_groups(
    registry: &BackendRegistry,
    config: &ScalerConfig,
    backend: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let backend = build_backend(registry, config, backend)?;

    let rows: Vec<GroupRow> = backend
        .node_groups()
        .iter()
        .map(|g| GroupRow {
            id: g.id().to_string(),
            min_size: g.min_size(),
            max_size: g.max_size(),
            payload: g.payload().to_string(),
        })
        .collect();

    if let OutputFormat::Table = format {
        print_success(&format!(
            "Backend {} built with {} node groups",
            backend.name().cyan(),
            rows.len()
        ));
    }
    let json = serde_json::json!({
        "backend": backend.name(),
        "node_groups": &rows,
    });
    print_rows(rows, &json, format);
    Ok(())
}
