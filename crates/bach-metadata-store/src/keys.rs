//! Storage key layout
//!
//! All keys are scoped by chain id:
//! - `<chain>/<function-key>/metadata` for one function's metadata
//! - `<chain>/callGraph` for the chain's call graph
//! - `<chain>/templates` for the chain's registered templates

use bach_metadata_types::{ChainId, FunctionKey};

/// Key of one function's metadata record
pub fn metadata_key(chain: ChainId, function: &FunctionKey) -> Vec<u8> {
    format!("{}/{}/metadata", chain, function).into_bytes()
}

/// Key of a chain's serialized call graph
pub fn call_graph_key(chain: ChainId) -> Vec<u8> {
    format!("{}/callGraph", chain).into_bytes()
}

/// Key of a chain's template registry
pub fn templates_key(chain: ChainId) -> Vec<u8> {
    format!("{}/templates", chain).into_bytes()
}
