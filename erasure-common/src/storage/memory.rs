use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use crate::models::deletion_request::DeletionRequest;
use crate::storage::{RecordStore, StorageError, StoreGuard};

/// In-memory store. Nothing survives the process, so only use this for tests or
/// throwaway deployments.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, DeletionRequest>>,
    lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryStore {
    fn put(&self, key: &str, record: &DeletionRequest) -> Result<(), StorageError> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(String::from(key), record.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<DeletionRequest>, StorageError> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<DeletionRequest>, StorageError> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect())
    }

    fn lock_exclusive(&self) -> Result<StoreGuard<'_>, StorageError> {
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(StoreGuard::new(guard, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::SystemTime;

    fn record(token: &str) -> DeletionRequest {
        DeletionRequest {
            token: String::from(token),
            email: String::from("someone@example.com"),
            reason: String::from("other"),
            reason_text: String::from("Other"),
            feedback: String::new(),
            created_at: SystemTime::now(),
            confirmed: false,
            confirmed_at: None,
        }
    }

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.put("one", &record("one")).unwrap();
        store.put("two", &record("two")).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("one").unwrap().unwrap().token, "one");

        store.delete("one").unwrap();
        store.delete("one").unwrap();
        assert!(store.get("one").unwrap().is_none());

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].token, "two");
    }

    #[test]
    fn test_returned_records_are_copies() {
        let store = MemoryStore::new();
        store.put("one", &record("one")).unwrap();

        let mut copy = store.get("one").unwrap().unwrap();
        copy.confirmed = true;

        assert!(!store.get("one").unwrap().unwrap().confirmed);
    }
}
