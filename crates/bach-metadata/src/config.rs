//! Metadata context configuration

use serde::{Deserialize, Serialize};

/// Metadata context configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Keep function metadata in memory after the first read
    pub cache_metadata: bool,
    /// Re-check acyclicity of a persisted graph when recovering a chain
    pub verify_graph_on_recovery: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            cache_metadata: true,
            verify_graph_on_recovery: true,
        }
    }
}

impl MetadataConfig {
    /// Configuration without the metadata cache
    pub fn uncached() -> Self {
        Self {
            cache_metadata: false,
            ..Self::default()
        }
    }
}
