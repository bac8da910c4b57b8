//! Key-value store abstraction

use crate::error::StorageResult;

/// Batch operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum BatchOp {
    Put {
        cf_name: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        cf_name: String,
        key: Vec<u8>,
    },
}

/// Ordered set of writes applied atomically by [`KeyValueStore::write_batch`]
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    pub(crate) operations: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create a new write batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a put operation
    pub fn put(&mut self, cf_name: &str, key: &[u8], value: &[u8]) {
        self.operations.push(BatchOp::Put {
            cf_name: cf_name.to_string(),
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Add a delete operation
    pub fn delete(&mut self, cf_name: &str, key: &[u8]) {
        self.operations.push(BatchOp::Delete {
            cf_name: cf_name.to_string(),
            key: key.to_vec(),
        });
    }

    /// Get number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Durable get/set by key, grouped in column families
///
/// Implementations must apply a [`WriteBatch`] all-or-nothing: after an error
/// none of its operations are visible.
pub trait KeyValueStore: Send + Sync {
    /// Get a value from a column family
    fn get(&self, cf_name: &str, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Apply a write batch atomically
    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()>;

    /// Put a single value
    fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(cf_name, key, value);
        self.write_batch(batch)
    }

    /// Check if a key exists
    fn contains(&self, cf_name: &str, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(cf_name, key)?.is_some())
    }
}
