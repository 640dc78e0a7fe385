//! `backends`: list the registered backends

use anyhow::Result;
use scaler_lib::BackendRegistry;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_rows, OutputFormat};

#[derive(Tabled, Serialize)]
struct BackendRow {
    #[tabled(rename = "Backend")]
    name: String,
    #[tabled(rename = "Default")]
    default: bool,
}

pub fn list_backends(registry: &BackendRegistry, format: OutputFormat) -> Result<()> {
    let rows: Vec<BackendRow> = registry
        .descriptors()
        .iter()
        .map(|d| BackendRow {
            name: d.name.clone(),
            default: d.is_default,
        })
        .collect();

    let json = serde_json::to_value(&rows)?;
    print_rows(rows, &json, format);
    Ok(())
}
