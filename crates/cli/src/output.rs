//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use scaler_lib::{CapacitySource, Quantity};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a table, or the serializable value as JSON
pub fn print_rows<T: Tabled, S: Serialize>(rows: Vec<T>, json: &S, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(json),
    }
}

pub fn print_json<S: Serialize>(value: &S) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format a quantity with the largest binary suffix that divides it exactly
pub fn format_quantity(quantity: Quantity) -> String {
    const UNITS: &[(&str, u64)] = &[
        ("Ti", 1 << 40),
        ("Gi", 1 << 30),
        ("Mi", 1 << 20),
        ("Ki", 1 << 10),
    ];

    let value = quantity.value();
    if value == 0 {
        return "0".to_string();
    }
    UNITS
        .iter()
        .find(|(_, size)| value % size == 0)
        .map(|(unit, size)| format!("{}{}", value / size, unit))
        .unwrap_or_else(|| value.to_string())
}

/// Color a capacity source by how trustworthy it is
pub fn color_source(source: CapacitySource) -> String {
    let label = source.as_str();
    match source {
        CapacitySource::Observed => label.green().to_string(),
        CapacitySource::Template => label.blue().to_string(),
        CapacitySource::TemplateMissingResource | CapacitySource::TemplateUnavailable => {
            label.yellow().to_string()
        }
        CapacitySource::NotExpected => label.dimmed().to_string(),
    }
}
