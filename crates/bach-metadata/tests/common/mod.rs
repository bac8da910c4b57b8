//! Shared fixtures: three test contracts where A calls B and C, and B calls C

#![allow(dead_code)]

use bach_metadata::MetadataContext;
use bach_metadata_store::{KeyValueStore, MemoryStore, StorageError, StorageResult, WriteBatch};
use bach_metadata_types::{
    AccessMode, Address, ChainId, ContractDeclaration, FunctionDeclaration, FunctionKey,
    Reference, Resource, ResourceSet,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const CHAIN: ChainId = ChainId::new(1);

pub const TYPE_A: &str = "TestContractA";
pub const TYPE_B: &str = "TestContractB";
pub const TYPE_C: &str = "TestContractC";

pub fn addr_a() -> Address {
    Address::from_bytes([0x0a; 20])
}

pub fn addr_b() -> Address {
    Address::from_bytes([0x0b; 20])
}

pub fn addr_c() -> Address {
    Address::from_bytes([0x0c; 20])
}

pub fn key(address: Address, signature: &str) -> FunctionKey {
    FunctionKey::new(address, signature)
}

pub fn res(address: Address, field: &str, mode: AccessMode) -> Resource {
    Resource::field(&address, field, mode)
}

pub fn set(resources: &[Resource]) -> ResourceSet {
    resources.iter().cloned().collect()
}

pub fn contract_c() -> ContractDeclaration {
    ContractDeclaration::new()
        .field("resource4", AccessMode::AccountSpecific)
        .field("resource5", AccessMode::ReadOnlyAccountSharing)
        .function(FunctionDeclaration::new("Func0").resource("resource4"))
        .function(FunctionDeclaration::new("Func1").resource("resource5"))
}

pub fn contract_b() -> ContractDeclaration {
    ContractDeclaration::new()
        .field("resource2", AccessMode::AccountSpecific)
        .field("resource3", AccessMode::ReadOnlyAccountSharing)
        .reference("ContractC", TYPE_C)
        .function(
            FunctionDeclaration::new("Func0")
                .call(Reference::foreign("ContractC", "Func1"))
                .resource("resource2"),
        )
        .function(FunctionDeclaration::new("Func1").resource("resource3"))
}

pub fn contract_a() -> ContractDeclaration {
    ContractDeclaration::new()
        .field("resource0", AccessMode::AccountSpecific)
        .field("resource1", AccessMode::ReadOnlyAccountSharing)
        .field("resource2", AccessMode::ReadWriteAccountSharing)
        .reference("_contractB", TYPE_B)
        .reference("ContractC", TYPE_C)
        .function(FunctionDeclaration::new("Func0(int)"))
        .function(
            FunctionDeclaration::new("Func0")
                .call(Reference::local("Func1"))
                .resource("resource0"),
        )
        .function(
            FunctionDeclaration::new("Func1")
                .call(Reference::local("Func2"))
                .resource("resource1"),
        )
        .function(
            FunctionDeclaration::new("Func2")
                .resource("resource1")
                .resource("resource2"),
        )
        .function(
            FunctionDeclaration::new("Func3")
                .call(Reference::foreign("_contractB", "Func0"))
                .call(Reference::local("Func0"))
                .call(Reference::foreign("ContractC", "Func0"))
                .resource("resource1"),
        )
        .function(
            FunctionDeclaration::new("Func4")
                .call(Reference::local("Func2"))
                .call(Reference::local("Func2")),
        )
        .function(
            FunctionDeclaration::new("Func5")
                .call(Reference::foreign("_contractB", "Func1"))
                .call(Reference::local("Func3")),
        )
}

pub fn aliases_b() -> BTreeMap<String, Address> {
    BTreeMap::from([("ContractC".to_string(), addr_c())])
}

pub fn aliases_a() -> BTreeMap<String, Address> {
    BTreeMap::from([
        ("_contractB".to_string(), addr_b()),
        ("ContractC".to_string(), addr_c()),
    ])
}

pub fn memory_context() -> (MemoryStore, MetadataContext) {
    let mem = MemoryStore::new();
    let ctx = MetadataContext::with_backend(Arc::new(mem.clone()));
    (mem, ctx)
}

pub fn register_all(ctx: &MetadataContext) {
    ctx.register_template(CHAIN, TYPE_C, &contract_c()).unwrap();
    ctx.register_template(CHAIN, TYPE_B, &contract_b()).unwrap();
    ctx.register_template(CHAIN, TYPE_A, &contract_a()).unwrap();
}

pub fn deploy_all(ctx: &MetadataContext) {
    ctx.deploy_registered(CHAIN, addr_c(), TYPE_C, &BTreeMap::new())
        .unwrap();
    ctx.deploy_registered(CHAIN, addr_b(), TYPE_B, &aliases_b())
        .unwrap();
    ctx.deploy_registered(CHAIN, addr_a(), TYPE_A, &aliases_a())
        .unwrap();
}

/// Memory store whose writes can be switched to fail
#[derive(Clone, Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    fail_writes: Arc<AtomicBool>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, cf_name: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(cf_name, key)
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.write_batch(batch)
    }
}
