//! Subcommand handlers
//!
//! Each handler works on an open [`MetadataContext`] and returns what to print.

use crate::manifest::Manifest;
use crate::output::Output;
use anyhow::{bail, Context, Result};
use bach_metadata::{CallGraph, MetadataContext, MetadataError};
use bach_metadata_types::{ChainId, FunctionKey, ResourceSet};
use serde_json::json;

fn resource_lines(resources: &ResourceSet) -> Vec<String> {
    resources
        .iter()
        .map(|r| format!("    {} [{}]", r.key, r.mode))
        .collect()
}

/// Register every contract of a manifest, in order
///
/// Stops at the first rejected declaration; earlier registrations stay.
pub fn register(ctx: &MetadataContext, chain: ChainId, manifest: &Manifest, json: bool) -> Result<Output> {
    let mut registered = Vec::with_capacity(manifest.contracts.len());
    let mut out = Output::new(json);

    for entry in &manifest.contracts {
        let template = ctx
            .register_template(chain, &entry.contract_type, &entry.declaration)
            .with_context(|| format!("registering {}", entry.contract_type))?;
        out = out.line(format!(
            "registered {} ({} functions)",
            template.contract_type,
            template.len()
        ));
        registered.push(template.contract_type);
    }

    Ok(out.field("registered", registered))
}

/// Deploy every instance of a manifest, in order
pub fn deploy(ctx: &MetadataContext, chain: ChainId, manifest: &Manifest, json: bool) -> Result<Output> {
    let mut deployed = Vec::with_capacity(manifest.deployments.len());
    let mut out = Output::new(json);

    for entry in &manifest.deployments {
        let keys = ctx
            .deploy_registered(chain, entry.address, &entry.contract_type, &entry.aliases)
            .with_context(|| format!("deploying {} at {}", entry.contract_type, entry.address))?;
        out = out.line(format!(
            "deployed {} at {} ({} functions)",
            entry.contract_type,
            entry.address,
            keys.len()
        ));
        let functions: Vec<String> = keys.iter().map(ToString::to_string).collect();
        deployed.push(json!({
            "contract_type": entry.contract_type,
            "address": entry.address.to_hex(),
            "functions": functions,
        }));
    }

    Ok(out.field("deployed", deployed))
}

/// Metadata of one deployed function
pub fn show(ctx: &MetadataContext, chain: ChainId, function: &str, json: bool) -> Result<Output> {
    let key: FunctionKey = function
        .parse()
        .with_context(|| format!("invalid function key {:?}", function))?;
    let metadata = ctx
        .get_function_metadata(chain, &key)?
        .ok_or_else(|| MetadataError::FunctionNotFound(key.clone()))?;

    let mut out = Output::new(json)
        .field("function", key.to_string())
        .field(
            "calling_set",
            metadata
                .calling_set
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
        )
        .field("local_resource_set", serde_json::to_value(&metadata.local_resource_set)?)
        .field("full_resource_set", serde_json::to_value(&metadata.full_resource_set)?)
        .line(key.to_string())
        .line("  calls:");
    for callee in &metadata.calling_set {
        out = out.line(format!("    {}", callee));
    }
    out = out.line("  local resources:");
    for line in resource_lines(&metadata.local_resource_set) {
        out = out.line(line);
    }
    out = out.line("  full resources:");
    for line in resource_lines(&metadata.full_resource_set) {
        out = out.line(line);
    }
    Ok(out)
}

/// Registered contract types with their local processing order
pub fn templates(ctx: &MetadataContext, chain: ChainId, json: bool) -> Result<Output> {
    let mut out = Output::new(json);
    let mut listed = Vec::new();

    for contract_type in ctx.contract_types(chain)? {
        let Some(template) = ctx.template(chain, &contract_type)? else {
            continue;
        };
        out = out.line(format!(
            "{}: {}",
            contract_type,
            template.process_order.join(" -> ")
        ));
        listed.push(json!({
            "contract_type": contract_type,
            "process_order": template.process_order,
            "aliases": template.reference_aliases,
        }));
    }

    Ok(out.field("templates", listed))
}

/// Call graph of the chain, callees first
pub fn graph(ctx: &MetadataContext, chain: ChainId, json: bool) -> Result<Output> {
    let serialized = ctx.serialized_graph(chain)?;
    let graph = CallGraph::from_serialized(&serialized);
    let order = graph
        .topological_order()
        .map_err(|cycle| MetadataError::CorruptedCallGraph {
            chain,
            vertex: cycle.vertex,
        })?;

    let mut out = Output::new(json)
        .field("vertices", serialized.vertex_count())
        .field("edges", serialized.edge_count())
        .field(
            "order",
            order.iter().map(ToString::to_string).collect::<Vec<_>>(),
        )
        .line(format!(
            "{} functions, {} calls",
            serialized.vertex_count(),
            serialized.edge_count()
        ));
    for vertex in &order {
        let callees: Vec<String> = graph.callees_of(vertex).map(ToString::to_string).collect();
        if callees.is_empty() {
            out = out.line(format!("{}", vertex));
        } else {
            out = out.line(format!("{} -> {}", vertex, callees.join(", ")));
        }
    }
    Ok(out)
}

/// Recheck every stored closure against the graph
pub fn verify(ctx: &MetadataContext, chain: ChainId, json: bool) -> Result<Output> {
    let summary = ctx.summary(chain)?;
    let mismatched = ctx.verify_chain(chain)?;
    if !mismatched.is_empty() {
        for function in &mismatched {
            tracing::error!("Stored metadata of {} does not match its closure", function);
        }
        bail!("{} of {} functions have inconsistent metadata", mismatched.len(), summary.functions);
    }

    Ok(Output::new(json)
        .field("functions", summary.functions)
        .field("edges", summary.edges)
        .field("consistent", true)
        .line(format!("{} functions verified", summary.functions)))
}
