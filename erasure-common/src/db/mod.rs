use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::storage::{FileStore, MemoryStore, RecordStore, StorageError};
use crate::token::{GenerateToken, RandomTokenGenerator};

pub mod deletion_request;
pub mod job_registry;

/// Shared handle to the record store and the capabilities the lifecycle manager needs
/// from the outside world. Cheap to clone; every clone talks to the same store.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    token_generator: Arc<dyn GenerateToken>,
}

impl StoreHandle {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            token_generator: Arc::new(RandomTokenGenerator),
        }
    }

    pub fn open_file_store<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(FileStore::open(dir)?)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_token_generator(mut self, token_generator: Arc<dyn GenerateToken>) -> Self {
        self.token_generator = token_generator;
        self
    }

    pub fn record_count(&self) -> Result<usize, StorageError> {
        Ok(self.store.list_all()?.len())
    }
}

#[derive(Debug)]
pub enum DaoError {
    Storage(StorageError),
    Validation(String),
    DuplicateActiveRequest,
}

impl std::error::Error for DaoError {}

impl fmt::Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaoError::Storage(e) => write!(f, "DaoError: {e}"),
            DaoError::Validation(msg) => write!(f, "DaoError: Invalid input: {msg}"),
            DaoError::DuplicateActiveRequest => {
                write!(
                    f,
                    "DaoError: An active deletion request already exists for this email"
                )
            }
        }
    }
}

impl From<StorageError> for DaoError {
    fn from(error: StorageError) -> Self {
        DaoError::Storage(error)
    }
}

impl From<std::io::Error> for DaoError {
    fn from(error: std::io::Error) -> Self {
        DaoError::Storage(StorageError::Io(error))
    }
}

impl From<serde_json::Error> for DaoError {
    fn from(error: serde_json::Error) -> Self {
        DaoError::Storage(StorageError::Serialization(error))
    }
}
