//! Storage error types

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// RocksDB error
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Invalid column family
    #[error("invalid column family: {0}")]
    InvalidColumnFamily(String),

    /// Database not open
    #[error("database not open")]
    NotOpen,

    /// Database already open
    #[error("database already open")]
    AlreadyOpen,

    /// Persisted data violates an invariant
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// Backend I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::CorruptedData("call graph of chain 1 is cyclic".into());
        assert!(err.to_string().contains("cyclic"));

        let err = StorageError::InvalidColumnFamily("nope".into());
        assert!(err.to_string().contains("nope"));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = StorageError::from(io);
        assert!(matches!(err, StorageError::Io(_)));
        assert!(err.to_string().contains("disk gone"));
    }
}
