//! Per-chain metadata context
//!
//! Every operation is keyed by [`ChainId`]. The template registry and call
//! graph of a chain are loaded from the store the first time the chain is
//! touched and kept behind a per-chain lock, so deployments on one chain run
//! strictly one after another while chains stay independent.

use crate::closure::full_resource_set;
use crate::config::MetadataConfig;
use crate::deployment::{plan_deployment, DeploymentPlan};
use crate::error::{DeploymentError, MetadataError, MetadataResult};
use crate::graph::CallGraph;
use crate::registry::TemplateRegistry;
use bach_metadata_store::{KeyValueStore, MetadataStore};
use bach_metadata_types::{
    Address, ChainId, ContractDeclaration, ContractMetadataTemplate, FunctionKey,
    FunctionMetadata, ResourceFootprint, SerializedCallGraph,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// In-memory state of one chain
#[derive(Clone, Debug, Default)]
pub struct ChainState {
    /// Registered templates
    pub registry: TemplateRegistry,
    /// Call graph over deployed functions
    pub graph: CallGraph<FunctionKey>,
}

/// Sizes of a chain's state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainSummary {
    /// Registered contract types
    pub templates: usize,
    /// Deployed functions
    pub functions: usize,
    /// Call edges
    pub edges: usize,
}

impl ChainSummary {
    fn of(state: &ChainState) -> Self {
        Self {
            templates: state.registry.len(),
            functions: state.graph.len(),
            edges: state.graph.edge_count(),
        }
    }
}

/// Entry point for registration, deployment and metadata queries
pub struct MetadataContext {
    store: MetadataStore,
    config: MetadataConfig,
    chains: DashMap<ChainId, Arc<Mutex<ChainState>>>,
    cache: DashMap<(ChainId, FunctionKey), FunctionMetadata>,
}

impl MetadataContext {
    /// Create a context over a metadata store
    pub fn new(store: MetadataStore, config: MetadataConfig) -> Self {
        Self {
            store,
            config,
            chains: DashMap::new(),
            cache: DashMap::new(),
        }
    }

    /// Create a context with default config over a raw backend
    pub fn with_backend(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::new(MetadataStore::new(kv), MetadataConfig::default())
    }

    /// Underlying store
    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &MetadataConfig {
        &self.config
    }

    fn load_chain(&self, chain: ChainId) -> MetadataResult<ChainState> {
        let registry = TemplateRegistry::from_templates(
            self.store.get_templates(chain)?.unwrap_or_default(),
        );
        let graph = self
            .store
            .get_serialized_graph(chain)?
            .map(|serialized| CallGraph::from_serialized(&serialized))
            .unwrap_or_default();

        if self.config.verify_graph_on_recovery {
            graph
                .check_acyclic()
                .map_err(|cycle| MetadataError::CorruptedCallGraph {
                    chain,
                    vertex: cycle.vertex,
                })?;
        }

        tracing::debug!(
            chain = %chain,
            templates = registry.len(),
            functions = graph.len(),
            edges = graph.edge_count(),
            "loaded chain state"
        );
        Ok(ChainState { registry, graph })
    }

    fn chain(&self, chain: ChainId) -> MetadataResult<Arc<Mutex<ChainState>>> {
        if let Some(slot) = self.chains.get(&chain) {
            return Ok(Arc::clone(slot.value()));
        }
        let loaded = self.load_chain(chain)?;
        let slot = self
            .chains
            .entry(chain)
            .or_insert_with(|| Arc::new(Mutex::new(loaded)));
        Ok(Arc::clone(slot.value()))
    }

    /// Rebuild a chain's in-memory state from the store
    ///
    /// Closures are not recomputed; the persisted per-function records are
    /// authoritative.
    pub fn recover_chain(&self, chain: ChainId) -> MetadataResult<ChainSummary> {
        let slot = Arc::clone(self.chains.entry(chain).or_default().value());
        // Held across the load so no deployment can commit in between
        let mut current = slot.lock();
        let state = self.load_chain(chain)?;
        let summary = ChainSummary::of(&state);

        *current = state;
        self.cache.retain(|(cached_chain, _), _| *cached_chain != chain);
        drop(current);

        tracing::info!(
            "Recovered chain {}: {} templates, {} functions, {} edges",
            chain,
            summary.templates,
            summary.functions,
            summary.edges
        );
        Ok(summary)
    }

    /// Sizes of a chain's current state
    pub fn summary(&self, chain: ChainId) -> MetadataResult<ChainSummary> {
        let slot = self.chain(chain)?;
        let state = slot.lock();
        Ok(ChainSummary::of(&state))
    }

    /// Validate and register the template of a contract type
    ///
    /// The registry is persisted before it changes in memory. On any error
    /// neither is modified.
    pub fn register_template(
        &self,
        chain: ChainId,
        contract_type: &str,
        declaration: &ContractDeclaration,
    ) -> MetadataResult<ContractMetadataTemplate> {
        let slot = self.chain(chain)?;
        let mut state = slot.lock();

        let template = match state.registry.validate(contract_type, declaration) {
            Ok(template) => template,
            Err(e) => {
                tracing::warn!(chain = %chain, contract_type, error = %e, "template rejected");
                return Err(e.into());
            }
        };

        let mut templates = state.registry.templates().clone();
        templates.insert(contract_type.to_string(), template.clone());
        self.store.put_templates(chain, &templates)?;
        state.registry.insert_validated(template.clone());

        tracing::info!(
            "Registered contract type {} on chain {} ({} functions)",
            contract_type,
            chain,
            template.len()
        );
        Ok(template)
    }

    /// Get the template of a registered contract type
    pub fn template(
        &self,
        chain: ChainId,
        contract_type: &str,
    ) -> MetadataResult<Option<ContractMetadataTemplate>> {
        let slot = self.chain(chain)?;
        let state = slot.lock();
        Ok(state.registry.get(contract_type).cloned())
    }

    /// Registered contract types
    pub fn contract_types(&self, chain: ChainId) -> MetadataResult<Vec<String>> {
        let slot = self.chain(chain)?;
        let state = slot.lock();
        Ok(state.registry.templates().keys().cloned().collect())
    }

    /// Deploy a contract instance from a template
    ///
    /// All new metadata and the grown graph are written in one batch. The
    /// in-memory graph changes only after that write succeeds. Returns the new
    /// function keys.
    pub fn deploy(
        &self,
        chain: ChainId,
        address: Address,
        template: &ContractMetadataTemplate,
        aliases: &BTreeMap<String, Address>,
    ) -> MetadataResult<Vec<FunctionKey>> {
        let slot = self.chain(chain)?;
        let mut state = slot.lock();
        self.deploy_locked(chain, &mut state, address, template, aliases)
    }

    /// Deploy a contract instance of a registered contract type
    pub fn deploy_registered(
        &self,
        chain: ChainId,
        address: Address,
        contract_type: &str,
        aliases: &BTreeMap<String, Address>,
    ) -> MetadataResult<Vec<FunctionKey>> {
        let slot = self.chain(chain)?;
        let mut state = slot.lock();
        let template = state
            .registry
            .get(contract_type)
            .cloned()
            .ok_or_else(|| DeploymentError::UnknownContractType(contract_type.to_string()))?;
        self.deploy_locked(chain, &mut state, address, &template, aliases)
    }

    fn deploy_locked(
        &self,
        chain: ChainId,
        state: &mut ChainState,
        address: Address,
        template: &ContractMetadataTemplate,
        aliases: &BTreeMap<String, Address>,
    ) -> MetadataResult<Vec<FunctionKey>> {
        let plan = match plan_deployment(chain, &self.store, &state.graph, address, template, aliases) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(
                    chain = %chain,
                    address = %address,
                    contract_type = %template.contract_type,
                    error = %e,
                    "deployment rejected"
                );
                return Err(e.into());
            }
        };

        self.store
            .commit_deployment(chain, &plan.records(), &plan.graph.to_serialized())?;

        let DeploymentPlan {
            functions, graph, ..
        } = plan;
        state.graph = graph;

        let keys: Vec<FunctionKey> = functions.keys().cloned().collect();
        if self.config.cache_metadata {
            for (key, metadata) in functions {
                self.cache.insert((chain, key), metadata);
            }
        }

        tracing::info!(
            "Deployed {} at {} on chain {} ({} functions)",
            template.contract_type,
            address,
            chain,
            keys.len()
        );
        Ok(keys)
    }

    /// Get the metadata of a deployed function
    pub fn get_function_metadata(
        &self,
        chain: ChainId,
        function: &FunctionKey,
    ) -> MetadataResult<Option<FunctionMetadata>> {
        let cache_key = (chain, function.clone());
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(Some(cached.value().clone()));
        }

        let metadata = self.store.get_function_metadata(chain, function)?;
        if self.config.cache_metadata {
            if let Some(metadata) = &metadata {
                self.cache.insert(cache_key, metadata.clone());
            }
        }
        Ok(metadata)
    }

    /// Resource footprint of a transaction entering through a function
    pub fn footprint(
        &self,
        chain: ChainId,
        sender: Address,
        function: &FunctionKey,
    ) -> MetadataResult<Option<ResourceFootprint>> {
        Ok(self
            .get_function_metadata(chain, function)?
            .map(|metadata| ResourceFootprint::from_metadata(sender, &metadata)))
    }

    /// Current call graph of a chain in persisted form
    pub fn serialized_graph(&self, chain: ChainId) -> MetadataResult<SerializedCallGraph> {
        let slot = self.chain(chain)?;
        let state = slot.lock();
        Ok(state.graph.to_serialized())
    }

    /// Deployed functions calling a function directly
    pub fn callers_of(
        &self,
        chain: ChainId,
        function: &FunctionKey,
    ) -> MetadataResult<Vec<FunctionKey>> {
        let slot = self.chain(chain)?;
        let state = slot.lock();
        Ok(state.graph.callers_of(function).into_iter().cloned().collect())
    }

    /// Recompute a function's full resource set from persisted records
    ///
    /// Returns whether it matches the stored one.
    pub fn verify_closure(&self, chain: ChainId, function: &FunctionKey) -> MetadataResult<bool> {
        let metadata = self
            .store
            .get_function_metadata(chain, function)?
            .ok_or_else(|| MetadataError::FunctionNotFound(function.clone()))?;

        let mut callee_sets = Vec::with_capacity(metadata.calling_set.len());
        for callee in &metadata.calling_set {
            let callee_metadata = self
                .store
                .get_function_metadata(chain, callee)?
                .ok_or_else(|| MetadataError::FunctionNotFound(callee.clone()))?;
            callee_sets.push(callee_metadata.full_resource_set);
        }

        let expected = full_resource_set(&metadata.local_resource_set, callee_sets.iter());
        Ok(expected == metadata.full_resource_set)
    }

    /// Functions whose persisted record disagrees with the graph or its closure
    pub fn verify_chain(&self, chain: ChainId) -> MetadataResult<Vec<FunctionKey>> {
        let graph = {
            let slot = self.chain(chain)?;
            let state = slot.lock();
            state.graph.clone()
        };

        let mut mismatched = Vec::new();
        for function in graph.vertices() {
            let metadata = self
                .store
                .get_function_metadata(chain, function)?
                .ok_or_else(|| MetadataError::FunctionNotFound(function.clone()))?;
            let callees: BTreeSet<FunctionKey> = graph.callees_of(function).cloned().collect();

            if callees != metadata.calling_set || !self.verify_closure(chain, function)? {
                tracing::warn!(chain = %chain, function = %function, "metadata mismatch");
                mismatched.push(function.clone());
            }
        }
        Ok(mismatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bach_metadata_store::MemoryStore;
    use bach_metadata_types::{AccessMode, FunctionDeclaration, Reference};

    const CHAIN: ChainId = ChainId::new(9);

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn leaf() -> ContractDeclaration {
        ContractDeclaration::new()
            .field("balance", AccessMode::AccountSpecific)
            .function(FunctionDeclaration::new("Get").resource("balance"))
    }

    fn context() -> (MemoryStore, MetadataContext) {
        let mem = MemoryStore::new();
        let ctx = MetadataContext::with_backend(Arc::new(mem.clone()));
        (mem, ctx)
    }

    #[test]
    fn test_register_and_deploy() {
        let (_, ctx) = context();
        ctx.register_template(CHAIN, "Leaf", &leaf()).unwrap();
        let keys = ctx
            .deploy_registered(CHAIN, addr(1), "Leaf", &BTreeMap::new())
            .unwrap();

        assert_eq!(keys, vec![FunctionKey::new(addr(1), "Get")]);
        let meta = ctx.get_function_metadata(CHAIN, &keys[0]).unwrap().unwrap();
        assert_eq!(meta.full_resource_set.len(), 1);
        assert!(ctx.verify_closure(CHAIN, &keys[0]).unwrap());
        assert_eq!(
            ctx.summary(CHAIN).unwrap(),
            ChainSummary {
                templates: 1,
                functions: 1,
                edges: 0
            }
        );
    }

    #[test]
    fn test_deploy_unknown_contract_type() {
        let (_, ctx) = context();
        let err = ctx
            .deploy_registered(CHAIN, addr(1), "Nope", &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            MetadataError::Deployment(DeploymentError::UnknownContractType(_))
        ));
    }

    #[test]
    fn test_chains_are_independent() {
        let (_, ctx) = context();
        ctx.register_template(CHAIN, "Leaf", &leaf()).unwrap();
        assert!(ctx.template(ChainId::new(10), "Leaf").unwrap().is_none());
        assert_eq!(ctx.contract_types(CHAIN).unwrap(), vec!["Leaf".to_string()]);
    }

    #[test]
    fn test_rejected_template_not_persisted() {
        let (mem, ctx) = context();
        let decl = leaf().function(FunctionDeclaration::new("Bad").resource("missing"));
        assert!(ctx.register_template(CHAIN, "Leaf", &decl).is_err());
        assert!(mem.is_empty());
        assert!(ctx.contract_types(CHAIN).unwrap().is_empty());
    }

    #[test]
    fn test_footprint_and_callers() {
        let (_, ctx) = context();
        ctx.register_template(CHAIN, "Leaf", &leaf()).unwrap();
        ctx.register_template(
            CHAIN,
            "User",
            &ContractDeclaration::new()
                .reference("leaf", "Leaf")
                .function(FunctionDeclaration::new("Use").call(Reference::foreign("leaf", "Get"))),
        )
        .unwrap();
        ctx.deploy_registered(CHAIN, addr(1), "Leaf", &BTreeMap::new())
            .unwrap();
        let aliases = BTreeMap::from([("leaf".to_string(), addr(1))]);
        ctx.deploy_registered(CHAIN, addr(2), "User", &aliases).unwrap();

        let get = FunctionKey::new(addr(1), "Get");
        let using = FunctionKey::new(addr(2), "Use");
        assert_eq!(ctx.callers_of(CHAIN, &get).unwrap(), vec![using.clone()]);

        let a = ctx.footprint(CHAIN, addr(0xaa), &using).unwrap().unwrap();
        let b = ctx.footprint(CHAIN, addr(0xbb), &get).unwrap().unwrap();
        assert!(!a.conflicts_with(&b));
        assert!(ctx.verify_chain(CHAIN).unwrap().is_empty());
    }

    #[test]
    fn test_uncached_reads_go_to_store() {
        let mem = MemoryStore::new();
        let ctx = MetadataContext::new(
            MetadataStore::new(Arc::new(mem.clone())),
            MetadataConfig::uncached(),
        );
        ctx.register_template(CHAIN, "Leaf", &leaf()).unwrap();
        let keys = ctx
            .deploy_registered(CHAIN, addr(1), "Leaf", &BTreeMap::new())
            .unwrap();
        assert!(ctx.cache.is_empty());
        assert!(ctx.get_function_metadata(CHAIN, &keys[0]).unwrap().is_some());
        assert!(ctx.cache.is_empty());
    }

    #[test]
    fn test_verify_closure_missing_function() {
        let (_, ctx) = context();
        let err = ctx
            .verify_closure(CHAIN, &FunctionKey::new(addr(3), "F"))
            .unwrap_err();
        assert!(matches!(err, MetadataError::FunctionNotFound(_)));
    }
}
