//! Durable key-value storage for deletion requests.
//!
//! The lifecycle manager only ever talks to a [`RecordStore`]. Two backends exist:
//! [`FileStore`], which keeps one JSON file per request, and [`MemoryStore`], which keeps
//! everything in a map and is meant for tests.

use std::fmt;
use std::fs::File;
use std::sync::MutexGuard;

use crate::models::deletion_request::DeletionRequest;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    InvalidKey(String),
}

impl std::error::Error for StorageError {}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "StorageError: I/O failure: {e}"),
            StorageError::Serialization(e) => {
                write!(f, "StorageError: Record could not be (de)serialized: {e}")
            }
            StorageError::InvalidKey(key) => {
                write!(f, "StorageError: Key is not usable for storage: {key:?}")
            }
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        StorageError::Io(error)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::Serialization(error)
    }
}

/// Exclusive access to a store. Released on drop.
pub struct StoreGuard<'a> {
    _local: MutexGuard<'a, ()>,
    // The OS lock lives as long as the file handle stays open
    _os_lock: Option<File>,
}

impl<'a> StoreGuard<'a> {
    pub(crate) fn new(local: MutexGuard<'a, ()>, os_lock: Option<File>) -> Self {
        Self {
            _local: local,
            _os_lock: os_lock,
        }
    }
}

pub trait RecordStore: Send + Sync {
    /// Must not return until the record is durable.
    fn put(&self, key: &str, record: &DeletionRequest) -> Result<(), StorageError>;
    fn get(&self, key: &str) -> Result<Option<DeletionRequest>, StorageError>;
    /// Deleting a key that does not exist is not an error.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
    fn list_all(&self) -> Result<Vec<DeletionRequest>, StorageError>;

    /// Blocks until no other caller, in this process or another process sharing the
    /// same backing storage, holds the guard.
    fn lock_exclusive(&self) -> Result<StoreGuard<'_>, StorageError>;
}
