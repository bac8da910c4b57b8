//! # bach-metadata-store
//!
//! Persistence for the function metadata pipeline of BachLedger.
//!
//! This crate provides:
//! - Key-value store abstraction with atomic write batches
//! - RocksDB backend and an in-memory backend
//! - Canonical record encoding
//! - Typed access to function metadata, call graphs and templates per chain

#![warn(missing_docs)]
#![warn(clippy::all)]

mod codec;
mod db;
mod error;
pub mod keys;
mod memory;
mod store;
mod traits;

pub use codec::{decode, encode};
pub use db::{cf, DbConfig, RocksStore, ALL_CFS};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use store::{MetadataStore, TemplateMap};
pub use traits::{KeyValueStore, WriteBatch};
