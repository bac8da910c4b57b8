//! Persisted per-function metadata and serialized call graph

use crate::function_key::FunctionKey;
use crate::resource::{Resource, ResourceSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Address-scoped metadata of one deployed function
///
/// Created once at deployment and immutable afterwards. All sets are ordered,
/// so two computations over the same graph encode to identical bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    /// Functions called directly
    pub calling_set: BTreeSet<FunctionKey>,
    /// Resources declared by this function itself
    pub local_resource_set: ResourceSet,
    /// Local resources plus the full resource sets of every callee
    pub full_resource_set: ResourceSet,
}

impl FunctionMetadata {
    /// Create metadata for a function without callees
    pub fn leaf(local_resource_set: ResourceSet) -> Self {
        Self {
            calling_set: BTreeSet::new(),
            full_resource_set: local_resource_set.clone(),
            local_resource_set,
        }
    }

    /// Check whether the closure touches a resource key
    pub fn touches(&self, key: &str) -> bool {
        self.full_resource_set.iter().any(|r| r.key == key)
    }

    /// Resources reached only through callees
    pub fn inherited_resources(&self) -> impl Iterator<Item = &Resource> {
        self.full_resource_set
            .iter()
            .filter(move |r| !self.local_resource_set.contains(*r))
    }
}

/// Explicit vertex and edge lists of a chain's call graph
///
/// Vertices and edges are kept sorted so the encoded record is canonical.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedCallGraph {
    /// All function keys
    pub vertices: Vec<FunctionKey>,
    /// `(caller, callee)` pairs
    pub edges: Vec<(FunctionKey, FunctionKey)>,
}

impl SerializedCallGraph {
    /// Build a canonical record from unordered parts
    pub fn new(
        vertices: impl IntoIterator<Item = FunctionKey>,
        edges: impl IntoIterator<Item = (FunctionKey, FunctionKey)>,
    ) -> Self {
        let vertices: BTreeSet<FunctionKey> = vertices.into_iter().collect();
        let edges: BTreeSet<(FunctionKey, FunctionKey)> = edges.into_iter().collect();
        Self {
            vertices: vertices.into_iter().collect(),
            edges: edges.into_iter().collect(),
        }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
