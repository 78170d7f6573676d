// storage/src/lib.rs

//! Persistent ledger storage
//!
//! This crate provides the durable block log of a chain, backed by RocksDB:
//! - Genesis config and trunk meta records
//! - Block storage indexed by id and height
//! - Transaction lookups by txid
//! - An LRU cache in front of block reads

pub mod cache;
pub mod db;

pub use cache::BlockCache;
pub use db::{open_ledger, ColumnFamily, Database, DatabaseConfig, GENESIS_FILE};

use blockchain_core::BlockchainError;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Genesis error: {0}")]
    Genesis(String),

    #[error("Ledger closed")]
    Closed,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<rocksdb::Error> for StorageError {
    fn from(e: rocksdb::Error) -> Self {
        StorageError::DatabaseError(e.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(e: bincode::Error) -> Self {
        StorageError::SerializationError(e.to_string())
    }
}

impl From<StorageError> for BlockchainError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => BlockchainError::BlockNotFound(what),
            StorageError::Closed => BlockchainError::Closed,
            other => BlockchainError::LedgerError(other.to_string()),
        }
    }
}
