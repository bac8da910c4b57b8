//! # bach-metadata
//!
//! Static resource metadata of deployed contract functions for BachLedger.
//!
//! The scheduler decides which transactions may run in parallel from the
//! resources their entry functions can reach. This crate produces those facts:
//! - Template registry: validated, address-free contract templates
//! - Deployment resolver: binds a template to an address and its aliases
//! - Call graph: per-chain DAG over every deployed function
//! - Resource closure: full resource set of each function, callees first
//! - Recovery: rebuilds chain state from the store after restart
//!
//! All state is reached through an explicit [`MetadataContext`].

#![warn(missing_docs)]
#![warn(clippy::all)]

mod closure;
mod config;
mod context;
mod deployment;
mod error;
mod graph;
mod registry;

pub use closure::{full_resource_set, resolve_closures, PendingFunction};
pub use config::MetadataConfig;
pub use context::{ChainState, ChainSummary, MetadataContext};
pub use deployment::{plan_deployment, DeploymentPlan};
pub use error::{
    ClosureError, DeploymentError, DeploymentResult, MetadataError, MetadataResult,
    TemplateError, TemplateResult,
};
pub use graph::{CallGraph, CycleError};
pub use registry::TemplateRegistry;
