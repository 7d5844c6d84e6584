use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::models::deletion_request::DeletionRequest;
use crate::storage::{RecordStore, StorageError, StoreGuard};
use crate::token;

const RECORD_EXTENSION: &str = "json";
const LOCK_FILE_NAME: &str = ".lock";

/// Keeps each request in its own `<token>.json` file inside a single directory.
///
/// Writes land in a hidden temporary file first, get fsynced, and are then renamed over
/// the destination, so readers only ever see complete records. The critical section is
/// guarded by an in-process mutex plus an advisory lock on `<dir>/.lock`, which keeps
/// the server and the job scheduler from interleaving when they share a directory.
pub struct FileStore {
    dir: PathBuf,
    lock_file_path: PathBuf,
    local_lock: Mutex<()>,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let lock_file_path = dir.join(LOCK_FILE_NAME);
        open_lock_file(&lock_file_path)?;

        Ok(Self {
            dir,
            lock_file_path,
            local_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, key: &str) -> Option<PathBuf> {
        if !token::is_well_formed(key) {
            return None;
        }

        Some(self.dir.join(format!("{key}.{RECORD_EXTENSION}")))
    }
}

impl RecordStore for FileStore {
    fn put(&self, key: &str, record: &DeletionRequest) -> Result<(), StorageError> {
        let path = self
            .record_path(key)
            .ok_or_else(|| StorageError::InvalidKey(String::from(key)))?;

        let contents = serde_json::to_vec_pretty(record)?;
        write_atomically(&path, &contents)
    }

    fn get(&self, key: &str) -> Result<Option<DeletionRequest>, StorageError> {
        // A key we would never have written cannot name a stored record
        let Some(path) = self.record_path(key) else {
            return Ok(None);
        };

        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let Some(path) = self.record_path(key) else {
            return Ok(());
        };

        match fs::remove_file(&path) {
            Ok(()) => (),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        sync_parent_dir(&path)?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<DeletionRequest>, StorageError> {
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();

            let is_hidden = entry.file_name().to_string_lossy().starts_with('.');
            let is_record = path.extension().is_some_and(|ext| ext == RECORD_EXTENSION);

            if is_hidden || !is_record || !entry.file_type()?.is_file() {
                continue;
            }

            match fs::read(&path) {
                Ok(bytes) => records.push(serde_json::from_slice(&bytes)?),
                // Removed between listing and reading
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(records)
    }

    fn lock_exclusive(&self) -> Result<StoreGuard<'_>, StorageError> {
        let local = self
            .local_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let lock_file = open_lock_file(&self.lock_file_path)?;
        FileExt::lock_exclusive(&lock_file)?;

        Ok(StoreGuard::new(local, Some(lock_file)))
    }
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
}

/// Replaces `path` with `contents` so that a crash leaves either the old file or the new
/// one, never a partial write.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| StorageError::InvalidKey(path.display().to_string()))?;

    let mut tmp_name = OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    {
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(contents)?;
        tmp_file.sync_all()?;
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    sync_parent_dir(path)?;
    Ok(())
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, SystemTime};

    use crate::token::{GenerateToken, RandomTokenGenerator};

    fn record(token: &str, email: &str) -> DeletionRequest {
        DeletionRequest {
            token: String::from(token),
            email: String::from(email),
            reason: String::from("privacy-concerns"),
            reason_text: String::from("Privacy concerns"),
            feedback: String::from("Too much tracking"),
            created_at: SystemTime::now(),
            confirmed: false,
            confirmed_at: None,
        }
    }

    #[test]
    fn test_put_get_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let token = RandomTokenGenerator.generate();
        let saved = record(&token, "reopen@example.com");

        {
            let store = FileStore::open(dir.path()).unwrap();
            store.put(&token, &saved).unwrap();
            assert_eq!(store.get(&token).unwrap(), Some(saved.clone()));
        }

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.get(&token).unwrap(), Some(saved));
        assert!(dir.path().join(format!("{token}.json")).is_file());
    }

    #[test]
    fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        let mut saved = record("tok", "overwrite@example.com");
        store.put("tok", &saved).unwrap();

        saved.confirmed = true;
        saved.confirmed_at = Some(SystemTime::now());
        store.put("tok", &saved).unwrap();

        let loaded = store.get("tok").unwrap().unwrap();
        assert!(loaded.confirmed);
        assert_eq!(loaded.confirmed_at, saved.confirmed_at);
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_and_unsafe_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert!(store.get("never-stored").unwrap().is_none());
        assert!(store.get("../escape").unwrap().is_none());
        store.delete("never-stored").unwrap();
        store.delete("../escape").unwrap();

        assert!(matches!(
            store.put("../escape", &record("../escape", "x@y.z")),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.put("gone", &record("gone", "delete@example.com")).unwrap();
        store.delete("gone").unwrap();

        assert!(store.get("gone").unwrap().is_none());
        assert!(!dir.path().join("gone.json").exists());
    }

    #[test]
    fn test_list_all_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.put("first", &record("first", "one@example.com")).unwrap();
        store.put("second", &record("second", "two@example.com")).unwrap();

        fs::write(dir.path().join(".third.json.tmp"), b"{ partial").unwrap();
        fs::write(dir.path().join("notes.txt"), b"not a record").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let mut tokens = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.token)
            .collect::<Vec<_>>();
        tokens.sort();

        assert_eq!(tokens, vec!["first", "second"]);
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        fs::write(dir.path().join("broken.json"), b"{ not json").unwrap();

        assert!(matches!(
            store.get("broken"),
            Err(StorageError::Serialization(_))
        ));
        assert!(matches!(
            store.list_all(),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_lock_excludes_other_handles_on_same_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store_a = FileStore::open(dir.path()).unwrap();
        let store_b = FileStore::open(dir.path()).unwrap();

        let acquired = Arc::new(AtomicBool::new(false));
        let guard = store_a.lock_exclusive().unwrap();

        let acquired_ref = Arc::clone(&acquired);
        let waiter = thread::spawn(move || {
            let _guard = store_b.lock_exclusive().unwrap();
            acquired_ref.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(150));
        assert!(!acquired.load(Ordering::SeqCst));

        drop(guard);
        waiter.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_write_atomically_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        write_atomically(&path, b"{}").unwrap();
        write_atomically(&path, b"{\"a\":1}").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"{\"a\":1}");
        assert!(!dir.path().join(".registry.json.tmp").exists());
    }
}
