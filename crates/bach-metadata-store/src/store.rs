//! Typed access to metadata records

use crate::codec::{decode, encode};
use crate::db::cf;
use crate::error::StorageResult;
use crate::keys::{call_graph_key, metadata_key, templates_key};
use crate::traits::{KeyValueStore, WriteBatch};
use bach_metadata_types::{
    ChainId, ContractMetadataTemplate, FunctionKey, FunctionMetadata, SerializedCallGraph,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registered templates of a chain, by contract type
pub type TemplateMap = BTreeMap<String, ContractMetadataTemplate>;

/// Metadata store over any [`KeyValueStore`] backend
#[derive(Clone)]
pub struct MetadataStore {
    kv: Arc<dyn KeyValueStore>,
}

impl MetadataStore {
    /// Create a metadata store over a backend
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Get a function's metadata
    pub fn get_function_metadata(
        &self,
        chain: ChainId,
        function: &FunctionKey,
    ) -> StorageResult<Option<FunctionMetadata>> {
        self.raw_function_metadata(chain, function)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Get a function's encoded metadata record
    pub fn raw_function_metadata(
        &self,
        chain: ChainId,
        function: &FunctionKey,
    ) -> StorageResult<Option<Vec<u8>>> {
        self.kv.get(cf::METADATA, &metadata_key(chain, function))
    }

    /// Store a single function's metadata
    pub fn put_function_metadata(
        &self,
        chain: ChainId,
        function: &FunctionKey,
        metadata: &FunctionMetadata,
    ) -> StorageResult<()> {
        self.kv
            .put(cf::METADATA, &metadata_key(chain, function), &encode(metadata)?)
    }

    /// Get a chain's call graph
    pub fn get_serialized_graph(&self, chain: ChainId) -> StorageResult<Option<SerializedCallGraph>> {
        self.kv
            .get(cf::CALL_GRAPH, &call_graph_key(chain))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Store a chain's call graph
    pub fn put_serialized_graph(
        &self,
        chain: ChainId,
        graph: &SerializedCallGraph,
    ) -> StorageResult<()> {
        self.kv
            .put(cf::CALL_GRAPH, &call_graph_key(chain), &encode(graph)?)
    }

    /// Get a chain's registered templates
    pub fn get_templates(&self, chain: ChainId) -> StorageResult<Option<TemplateMap>> {
        self.kv
            .get(cf::TEMPLATES, &templates_key(chain))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Store a chain's registered templates
    pub fn put_templates(&self, chain: ChainId, templates: &TemplateMap) -> StorageResult<()> {
        self.kv
            .put(cf::TEMPLATES, &templates_key(chain), &encode(templates)?)
    }

    /// Persist the outcome of one deployment in a single batch
    ///
    /// Either the graph and every function record become durable, or none do.
    pub fn commit_deployment(
        &self,
        chain: ChainId,
        functions: &[(FunctionKey, FunctionMetadata)],
        graph: &SerializedCallGraph,
    ) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        for (function, metadata) in functions {
            batch.put(cf::METADATA, &metadata_key(chain, function), &encode(metadata)?);
        }
        batch.put(cf::CALL_GRAPH, &call_graph_key(chain), &encode(graph)?);

        tracing::debug!(
            chain = %chain,
            functions = functions.len(),
            edges = graph.edge_count(),
            "committing deployment batch"
        );
        self.kv.write_batch(batch)
    }
}
