//! # bach-metadata-types
//!
//! Vocabulary shared by the function metadata pipeline of BachLedger.
//!
//! This crate provides:
//! - Contract addresses and chain identifiers
//! - Resources and their access (sharing) modes
//! - Absolute function keys of deployed contracts
//! - Address-free contract templates produced by the template extractor
//! - Persisted per-function metadata and the serialized call graph
//! - Resource footprints and the conflict rule used by the scheduler

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod footprint;
mod function_key;
mod metadata;
mod reference;
mod resource;
mod template;

pub use address::{Address, AddressError, ChainId};
pub use footprint::ResourceFootprint;
pub use function_key::{FunctionKey, FunctionKeyError};
pub use metadata::{FunctionMetadata, SerializedCallGraph};
pub use reference::{Reference, ReferenceParseError, THIS};
pub use resource::{AccessMode, Resource, ResourceSet, TemplateResource};
pub use template::{
    ContractDeclaration, ContractMetadataTemplate, FieldDeclaration, FunctionDeclaration,
    FunctionMetadataTemplate, ReferenceDeclaration,
};
