//! Configuration for the metadata tool

use crate::cli::Cli;
use anyhow::{Context, Result};
use bach_metadata::MetadataConfig;
use bach_metadata_store::DbConfig;
use bach_metadata_types::ChainId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the database directory under `--datadir`
pub const DB_DIR: &str = "metadata";

/// Tunables that can come from a config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// RocksDB options
    pub db: DbConfig,
    /// Metadata context options
    pub metadata: MetadataConfig,
}

impl FileConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from {:?}", path);
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}

/// Resolved tool configuration
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Data directory
    pub datadir: PathBuf,
    /// Chain every command works on
    pub chain_id: ChainId,
    /// RocksDB options
    pub db: DbConfig,
    /// Metadata context options
    pub metadata: MetadataConfig,
}

impl ToolConfig {
    /// Build from parsed arguments, reading the config file if one is given
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self {
            datadir: cli.datadir.clone(),
            chain_id: ChainId::new(cli.chain_id),
            db: file.db,
            metadata: file.metadata,
        })
    }

    /// Path of the metadata database
    pub fn db_path(&self) -> PathBuf {
        self.datadir.join(DB_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_file() {
        let cli = Cli::parse_from(["bach-metadata", "--chain-id", "7", "graph"]);
        let config = ToolConfig::from_cli(&cli).unwrap();
        assert_eq!(config.chain_id, ChainId::new(7));
        assert_eq!(config.db, DbConfig::default());
        assert_eq!(config.metadata, MetadataConfig::default());
        assert_eq!(config.db_path(), PathBuf::from("./data").join(DB_DIR));
    }

    #[test]
    fn test_partial_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{ "metadata": { "cache_metadata": false } }"#)
            .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert!(!config.metadata.cache_metadata);
        assert!(config.metadata.verify_graph_on_recovery);
        assert_eq!(config.db, DbConfig::default());
    }

    #[test]
    fn test_missing_config_file() {
        assert!(FileConfig::load(Path::new("/nonexistent/bach-metadata.json")).is_err());
    }
}
