//! CLI argument parsing for bach-metadata

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// BachLedger function metadata tool
#[derive(Parser, Debug, Clone)]
#[command(name = "bach-metadata")]
#[command(about = "Register contract templates, deploy them and inspect function metadata")]
#[command(version)]
pub struct Cli {
    /// Data directory for the metadata database
    #[arg(long, default_value = "./data")]
    pub datadir: PathBuf,

    /// Chain ID
    #[arg(long, default_value = "1337")]
    pub chain_id: u64,

    /// Optional JSON config file with `db` and `metadata` sections
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Register every contract declaration of a manifest
    Register {
        /// Manifest file (JSON)
        manifest: PathBuf,
    },
    /// Deploy every contract instance of a manifest
    Deploy {
        /// Manifest file (JSON)
        manifest: PathBuf,
    },
    /// Show the metadata of a deployed function
    Show {
        /// Function key, `<address>.<signature>`
        function: String,
    },
    /// List registered contract types and their processing order
    Templates,
    /// Print the call graph of the chain
    Graph,
    /// Recompute every resource closure and compare it with the stored one
    Verify,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
