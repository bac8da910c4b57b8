//! BachLedger function metadata tool
//!
//! Registers contract templates produced by the extractor, deploys contract
//! instances and inspects the resulting per-function resource metadata.
//!
//! ```bash
//! bach-metadata --datadir ./data register contracts.json
//! bach-metadata --datadir ./data deploy contracts.json
//! bach-metadata --datadir ./data show 0x0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a0a.Func3
//! bach-metadata --datadir ./data graph --json
//! bach-metadata --datadir ./data verify
//! ```

mod cli;
mod commands;
mod config;
mod manifest;
mod output;

use anyhow::{Context, Result};
use bach_metadata::MetadataContext;
use bach_metadata_store::{MetadataStore, RocksStore};
use cli::{Cli, Command};
use config::ToolConfig;
use manifest::Manifest;
use output::Output;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = ToolConfig::from_cli(&cli)?;
    let (db, ctx) = open_context(&config)?;

    let result = run(&ctx, &config, &cli);
    db.close();
    result?.print();
    Ok(())
}

/// Open the database and recover the configured chain
fn open_context(config: &ToolConfig) -> Result<(RocksStore, MetadataContext)> {
    let path = config.db_path();
    std::fs::create_dir_all(&path)
        .with_context(|| format!("creating data directory {}", path.display()))?;

    let db = RocksStore::open_at(&path, config.db.clone())
        .with_context(|| format!("opening metadata database at {}", path.display()))?;
    let ctx = MetadataContext::new(
        MetadataStore::new(Arc::new(db.clone())),
        config.metadata.clone(),
    );
    ctx.recover_chain(config.chain_id)?;
    Ok((db, ctx))
}

fn run(ctx: &MetadataContext, config: &ToolConfig, cli: &Cli) -> Result<Output> {
    let chain = config.chain_id;
    match &cli.command {
        Command::Register { manifest } => {
            commands::register(ctx, chain, &Manifest::load(manifest)?, cli.json)
        }
        Command::Deploy { manifest } => {
            commands::deploy(ctx, chain, &Manifest::load(manifest)?, cli.json)
        }
        Command::Show { function } => commands::show(ctx, chain, function, cli.json),
        Command::Templates => commands::templates(ctx, chain, cli.json),
        Command::Graph => commands::graph(ctx, chain, cli.json),
        Command::Verify => commands::verify(ctx, chain, cli.json),
    }
}
