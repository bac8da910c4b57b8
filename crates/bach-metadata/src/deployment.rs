//! Deployment resolver
//!
//! Turns a template plus concrete addresses into address-scoped metadata.
//! Planning reads the store but never writes it; the caller commits a
//! [`DeploymentPlan`] in one batch and only then adopts its graph.

use crate::closure::{resolve_closures, PendingFunction};
use crate::error::{DeploymentError, DeploymentResult};
use crate::graph::CallGraph;
use bach_metadata_store::MetadataStore;
use bach_metadata_types::{
    Address, ChainId, ContractMetadataTemplate, FunctionKey, FunctionMetadata, Reference,
    ResourceSet,
};
use std::collections::{BTreeMap, BTreeSet};

/// Validated outcome of a deployment, not yet persisted
#[derive(Clone, Debug)]
pub struct DeploymentPlan {
    /// Contract address
    pub address: Address,
    /// Metadata of every new function
    pub functions: BTreeMap<FunctionKey, FunctionMetadata>,
    /// Chain graph including the new functions
    pub graph: CallGraph<FunctionKey>,
}

impl DeploymentPlan {
    /// New function keys
    pub fn function_keys(&self) -> impl Iterator<Item = &FunctionKey> {
        self.functions.keys()
    }

    /// Records to persist, in key order
    pub fn records(&self) -> Vec<(FunctionKey, FunctionMetadata)> {
        self.functions
            .iter()
            .map(|(k, m)| (k.clone(), m.clone()))
            .collect()
    }
}

/// Resolve a template at an address against a chain's graph and store
pub fn plan_deployment(
    chain: ChainId,
    store: &MetadataStore,
    graph: &CallGraph<FunctionKey>,
    address: Address,
    template: &ContractMetadataTemplate,
    aliases: &BTreeMap<String, Address>,
) -> DeploymentResult<DeploymentPlan> {
    let new_keys: BTreeSet<FunctionKey> = template
        .function_templates
        .keys()
        .map(|signature| FunctionKey::new(address, signature.as_str()))
        .collect();
    // One contract per address, whatever its type
    if let Some(existing) = graph.vertices().find(|k| *k.address() == address) {
        return Err(DeploymentError::AlreadyDeployed {
            function: existing.clone(),
        });
    }

    if let Some(alias) = template
        .used_aliases()
        .into_iter()
        .find(|alias| !aliases.contains_key(*alias))
    {
        return Err(DeploymentError::UnresolvedAlias {
            alias: alias.to_string(),
        });
    }

    let mut pending: BTreeMap<FunctionKey, PendingFunction> = BTreeMap::new();
    let mut resolved: BTreeMap<FunctionKey, ResourceSet> = BTreeMap::new();
    let mut edges: Vec<(FunctionKey, FunctionKey)> = Vec::new();

    for (signature, function) in &template.function_templates {
        let caller = FunctionKey::new(address, signature.as_str());
        let mut calling_set = BTreeSet::new();

        for call in &function.calling_set {
            let callee = match call {
                Reference::Local(target) => FunctionKey::new(address, target.as_str()),
                Reference::Foreign { alias, signature } => {
                    let target = aliases
                        .get(alias)
                        .ok_or_else(|| DeploymentError::UnresolvedAlias {
                            alias: alias.clone(),
                        })?;
                    FunctionKey::new(*target, signature.as_str())
                }
            };

            if !new_keys.contains(&callee) && !resolved.contains_key(&callee) {
                let metadata = store.get_function_metadata(chain, &callee)?.ok_or_else(|| {
                    DeploymentError::ForeignFunctionNotDeployed {
                        function: callee.clone(),
                    }
                })?;
                resolved.insert(callee.clone(), metadata.full_resource_set);
            }

            edges.push((caller.clone(), callee.clone()));
            calling_set.insert(callee);
        }

        let local_resource_set: ResourceSet = function
            .local_resource_set
            .iter()
            .map(|r| r.resolve(&address))
            .collect();

        pending.insert(
            caller,
            PendingFunction {
                calling_set,
                local_resource_set,
            },
        );
    }

    let next_graph = graph
        .with_batch(new_keys.iter().cloned(), edges)
        .map_err(|cycle| DeploymentError::NonDagDeployment {
            function: cycle.vertex,
        })?;

    let functions = resolve_closures(&pending, &resolved)?;

    Ok(DeploymentPlan {
        address,
        functions,
        graph: next_graph,
    })
}
