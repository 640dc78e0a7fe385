//! Fleet capacity CLI
//!
//! A command-line tool for inspecting fleet backends and their node groups,
//! and for estimating accelerator demand and supply from a cluster snapshot.

mod commands;
mod config;
mod output;
mod snapshot;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{backends, estimate, groups};
use scaler_lib::BackendRegistry;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fleet capacity CLI
#[derive(Parser)]
#[command(name = "scalerctl")]
#[command(author, version, about = "Fleet backends and capacity estimation", long_about = None)]
pub struct Cli {
    /// Configuration file (can also be set via SCALERCTL_CONFIG env var)
    #[arg(long, short, env = "SCALERCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered backends
    Backends,

    /// Show the node groups a backend is built with
    Groups {
        /// Backend name (overrides the configured one)
        #[arg(long, short)]
        backend: Option<String>,
    },

    /// Estimate resource demand and node supply for a cluster snapshot
    Estimate {
        /// Snapshot file with nodes, workloads and instance bindings
        #[arg(long, short)]
        snapshot: PathBuf,

        /// Backend name (overrides the configured one)
        #[arg(long, short)]
        backend: Option<String>,

        /// Print Prometheus metrics after the estimate
        #[arg(long)]
        show_metrics: bool,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let registry = BackendRegistry::builtin();
    let config = config::ScalerConfig::load(cli.config.as_deref())?;

    // Execute command
    match cli.command {
        Commands::Backends => {
            backends::list_backends(&registry, cli.format)?;
        }
        Commands::Groups { backend } => {
            groups::show_groups(&registry, &config, backend.as_deref(), cli.format)?;
        }
        Commands::Estimate {
            snapshot,
            backend,
            show_metrics,
        } => {
            estimate::run_estimate(
                &registry,
                &config,
                backend.as_deref(),
                &snapshot,
                show_metrics,
                cli.format,
            )
            .await?;
        }
    }

    Ok(())
}
