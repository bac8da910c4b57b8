//! In-memory store backend

use crate::db::ALL_CFS;
use crate::error::{StorageError, StorageResult};
use crate::traits::{BatchOp, KeyValueStore, WriteBatch};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

type Entries = BTreeMap<(String, Vec<u8>), Vec<u8>>;

/// Process-local store used by tests and tooling
///
/// Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<Entries>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all column families
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of every entry, for byte-level comparisons
    pub fn snapshot(&self) -> Entries {
        self.entries.read().clone()
    }

    fn check_cf(cf_name: &str) -> StorageResult<()> {
        if ALL_CFS.contains(&cf_name) {
            Ok(())
        } else {
            Err(StorageError::InvalidColumnFamily(cf_name.to_string()))
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, cf_name: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Self::check_cf(cf_name)?;
        Ok(self
            .entries
            .read()
            .get(&(cf_name.to_string(), key.to_vec()))
            .cloned())
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        // Validate before taking the write lock so a bad batch changes nothing
        for op in &batch.operations {
            match op {
                BatchOp::Put { cf_name, .. } | BatchOp::Delete { cf_name, .. } => {
                    Self::check_cf(cf_name)?
                }
            }
        }

        let mut entries = self.entries.write();
        for op in batch.operations {
            match op {
                BatchOp::Put {
                    cf_name,
                    key,
                    value,
                } => {
                    entries.insert((cf_name, key), value);
                }
                BatchOp::Delete { cf_name, key } => {
                    entries.remove(&(cf_name, key));
                }
            }
        }
        Ok(())
    }
}
