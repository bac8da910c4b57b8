//! Restart recovery tests for bach-metadata
//!
//! Deploys into a RocksDB store, drops every in-memory structure, reopens the
//! database and checks the chain comes back identical.

mod common;

use bach_metadata::{ChainSummary, MetadataConfig, MetadataContext, MetadataError};
use bach_metadata_store::{DbConfig, MetadataStore, RocksStore};
use bach_metadata_types::{Address, ChainId, FunctionMetadata, SerializedCallGraph};
use common::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn open_context(path: &Path, config: MetadataConfig) -> (RocksStore, MetadataContext) {
    let db = RocksStore::open_at(path, DbConfig::default()).unwrap();
    let ctx = MetadataContext::new(MetadataStore::new(Arc::new(db.clone())), config);
    (db, ctx)
}

fn snapshot(ctx: &MetadataContext) -> (SerializedCallGraph, BTreeMap<String, FunctionMetadata>) {
    let graph = ctx.serialized_graph(CHAIN).unwrap();
    let metadata = graph
        .vertices
        .iter()
        .map(|f| {
            (
                f.to_string(),
                ctx.get_function_metadata(CHAIN, f).unwrap().unwrap(),
            )
        })
        .collect();
    (graph, metadata)
}

// ==================== Restart ====================

/// Test graph and metadata are identical after reopening the database
#[test]
fn test_restart_restores_identical_state() {
    let dir = TempDir::new().unwrap();

    let before = {
        let (db, ctx) = open_context(dir.path(), MetadataConfig::default());
        register_all(&ctx);
        deploy_all(&ctx);
        let snap = snapshot(&ctx);
        drop(ctx);
        db.close();
        snap
    };

    let (_db, ctx) = open_context(dir.path(), MetadataConfig::default());
    let summary = ctx.recover_chain(CHAIN).unwrap();
    assert_eq!(
        summary,
        ChainSummary {
            templates: 3,
            functions: 11,
            edges: 9,
        }
    );

    let after = snapshot(&ctx);
    assert_eq!(after.0, before.0);
    assert_eq!(after.1, before.1);
    assert!(ctx.verify_chain(CHAIN).unwrap().is_empty());
}

/// Test a chain is recovered lazily on first use
#[test]
fn test_lazy_recovery_on_first_use() {
    let dir = TempDir::new().unwrap();
    {
        let (db, ctx) = open_context(dir.path(), MetadataConfig::uncached());
        register_all(&ctx);
        ctx.deploy_registered(CHAIN, addr_c(), TYPE_C, &BTreeMap::new())
            .unwrap();
        drop(ctx);
        db.close();
    }

    let (_db, ctx) = open_context(dir.path(), MetadataConfig::uncached());
    // Templates survived: B can be deployed against the recovered C
    ctx.deploy_registered(CHAIN, addr_b(), TYPE_B, &aliases_b())
        .unwrap();
    assert_eq!(ctx.summary(CHAIN).unwrap().functions, 4);

    // And the recovered graph still rejects redeployment
    assert!(ctx
        .deploy_registered(CHAIN, addr_c(), TYPE_C, &BTreeMap::new())
        .is_err());
}

/// Test chains recover independently
#[test]
fn test_other_chain_stays_empty() {
    let dir = TempDir::new().unwrap();
    {
        let (db, ctx) = open_context(dir.path(), MetadataConfig::default());
        register_all(&ctx);
        deploy_all(&ctx);
        drop(ctx);
        db.close();
    }

    let (_db, ctx) = open_context(dir.path(), MetadataConfig::default());
    let other = ChainId::new(2);
    assert_eq!(ctx.recover_chain(other).unwrap(), ChainSummary::default());
    assert!(ctx
        .get_function_metadata(other, &key(addr_a(), "Func0"))
        .unwrap()
        .is_none());
}

/// Test recover_chain picks up records written behind the context's back
#[test]
fn test_recover_replaces_in_memory_state() {
    let dir = TempDir::new().unwrap();
    let (db, ctx) = open_context(dir.path(), MetadataConfig::default());
    register_all(&ctx);
    deploy_all(&ctx);

    let writer = MetadataContext::new(
        MetadataStore::new(Arc::new(db.clone())),
        MetadataConfig::default(),
    );
    let extra = Address::from_bytes([0x0d; 20]);
    writer
        .deploy_registered(CHAIN, extra, TYPE_C, &BTreeMap::new())
        .unwrap();

    assert_eq!(ctx.summary(CHAIN).unwrap().functions, 11);
    assert_eq!(ctx.recover_chain(CHAIN).unwrap().functions, 13);
}

/// Test recovery running alongside deployments never drops a committed contract
#[test]
fn test_recover_during_deployments_keeps_graph() {
    const INSTANCES: u8 = 40;
    let (mem, ctx) = memory_context();
    ctx.register_template(CHAIN, TYPE_C, &contract_c()).unwrap();

    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..INSTANCES {
                let address = Address::from_bytes([0x40 + i; 20]);
                ctx.deploy_registered(CHAIN, address, TYPE_C, &BTreeMap::new())
                    .unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..INSTANCES {
                ctx.recover_chain(CHAIN).unwrap();
            }
        });
    });

    let expected = 2 * INSTANCES as usize;
    assert_eq!(ctx.summary(CHAIN).unwrap().functions, expected);

    let persisted = MetadataStore::new(Arc::new(mem.clone()))
        .get_serialized_graph(CHAIN)
        .unwrap()
        .unwrap();
    assert_eq!(persisted.vertex_count(), expected);
    assert_eq!(persisted, ctx.serialized_graph(CHAIN).unwrap());
}

// ==================== Corruption ====================

/// Test a persisted cyclic graph is reported, not accepted
#[test]
fn test_cyclic_graph_is_corruption() {
    let dir = TempDir::new().unwrap();
    let (db, ctx) = open_context(dir.path(), MetadataConfig::default());

    let f = key(addr_a(), "Func0");
    let g = key(addr_a(), "Func1");
    let cyclic = SerializedCallGraph::new(
        vec![f.clone(), g.clone()],
        vec![(f.clone(), g.clone()), (g, f)],
    );
    ctx.store().put_serialized_graph(CHAIN, &cyclic).unwrap();

    let err = ctx.recover_chain(CHAIN).unwrap_err();
    assert!(matches!(err, MetadataError::CorruptedCallGraph { chain, .. } if chain == CHAIN));

    // Without the check the graph loads as stored
    let trusting = MetadataContext::new(
        MetadataStore::new(Arc::new(db.clone())),
        MetadataConfig {
            verify_graph_on_recovery: false,
            ..MetadataConfig::default()
        },
    );
    assert_eq!(trusting.recover_chain(CHAIN).unwrap().edges, 2);
}
