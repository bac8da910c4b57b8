//! Manifest files: extractor output plus deployments
//!
//! ```json
//! {
//!   "contracts": [
//!     { "contract_type": "TestContractC", "declaration": { "fields": [...], "functions": [...] } }
//!   ],
//!   "deployments": [
//!     { "contract_type": "TestContractC", "address": "0x0c0c...", "aliases": {} }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use bach_metadata_types::{Address, ContractDeclaration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One contract type to register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEntry {
    /// Contract type name
    pub contract_type: String,
    /// Declaration as produced by the template extractor
    pub declaration: ContractDeclaration,
}

/// One contract instance to deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEntry {
    /// Registered contract type
    pub contract_type: String,
    /// Instance address
    pub address: Address,
    /// Alias -> address of the bound contract
    #[serde(default)]
    pub aliases: BTreeMap<String, Address>,
}

/// Manifest file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Contract types, registered in order
    #[serde(default)]
    pub contracts: Vec<ContractEntry>,
    /// Instances, deployed in order
    #[serde(default)]
    pub deployments: Vec<DeploymentEntry>,
}

impl Manifest {
    /// Load a manifest from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Loading manifest from {:?}", path);
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("parsing manifest {}", path.display()))
    }

    /// Parse a manifest from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
