//! # CLI Interface
//!
//! Defines the command-line argument structure for `verdant-node` using
//! `clap` derive. Supports three subcommands: `run`, `status`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// VERDANT exchange node.
///
/// Serves the credit wrap and carbon retirement HTTP API, persists the
/// ledger to local storage, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "verdant-node",
    about = "VERDANT exchange node",
    version,
    propagate_version = true
)]
pub struct VerdantNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the VERDANT node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the exchange node.
    Run(RunArgs),
    /// Query the health of a running node via its API endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node data directory where ledger records are stored.
    ///
    /// Created on first run if it does not exist.
    #[arg(
        long,
        short = 'd',
        env = "VERDANT_DATA_DIR",
        default_value = "./verdant-data"
    )]
    pub data_dir: PathBuf,

    /// Port for the HTTP API.
    #[arg(long, env = "VERDANT_API_PORT", default_value_t = 8000)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VERDANT_METRICS_PORT", default_value_t = 8001)]
    pub metrics_port: u16,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "VERDANT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// API endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    pub api_url: String,
}
