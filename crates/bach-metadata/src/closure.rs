//! Resource closure
//!
//! `full(f) = local(f) ∪ full(callee)` for every direct callee of `f`. New
//! functions are evaluated callees first, so every callee is read from an
//! already computed result.

use crate::error::ClosureError;
use crate::graph::CallGraph;
use bach_metadata_types::{FunctionKey, FunctionMetadata, ResourceSet};
use std::collections::{BTreeMap, BTreeSet};

/// A function whose closure has not been computed yet
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingFunction {
    /// Direct callees
    pub calling_set: BTreeSet<FunctionKey>,
    /// Resources declared by the function itself
    pub local_resource_set: ResourceSet,
}

/// Union of a local set with the full sets of callees
pub fn full_resource_set<'a>(
    local: &ResourceSet,
    callees: impl IntoIterator<Item = &'a ResourceSet>,
) -> ResourceSet {
    let mut full = local.clone();
    for callee in callees {
        full.extend(callee.iter().cloned());
    }
    full
}

/// Compute metadata for a batch of new functions
///
/// `resolved` holds the full resource sets of functions deployed earlier.
/// Callees must be either in `pending` or in `resolved`.
pub fn resolve_closures(
    pending: &BTreeMap<FunctionKey, PendingFunction>,
    resolved: &BTreeMap<FunctionKey, ResourceSet>,
) -> Result<BTreeMap<FunctionKey, FunctionMetadata>, ClosureError> {
    let internal_edges = pending.iter().flat_map(|(caller, function)| {
        function
            .calling_set
            .iter()
            .filter(|callee| pending.contains_key(*callee))
            .map(move |callee| (caller.clone(), callee.clone()))
    });
    let batch = CallGraph::from_parts(pending.keys().cloned(), internal_edges);
    let order = batch
        .topological_order()
        .map_err(|cycle| ClosureError::Cycle(cycle.vertex))?;

    let mut computed: BTreeMap<FunctionKey, FunctionMetadata> = BTreeMap::new();
    for key in order {
        let Some(function) = pending.get(&key) else {
            continue;
        };

        let mut callee_sets = Vec::with_capacity(function.calling_set.len());
        for callee in &function.calling_set {
            let set = computed
                .get(callee)
                .map(|m| &m.full_resource_set)
                .or_else(|| resolved.get(callee))
                .ok_or_else(|| ClosureError::UnresolvedCallee {
                    caller: key.clone(),
                    callee: callee.clone(),
                })?;
            callee_sets.push(set);
        }

        let full = full_resource_set(&function.local_resource_set, callee_sets);
        tracing::debug!(
            function = %key,
            local = function.local_resource_set.len(),
            full = full.len(),
            "resolved resource closure"
        );
        computed.insert(
            key,
            FunctionMetadata {
                calling_set: function.calling_set.clone(),
                local_resource_set: function.local_resource_set.clone(),
                full_resource_set: full,
            },
        );
    }

    Ok(computed)
}
