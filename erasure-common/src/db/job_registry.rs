use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::db::DaoError;
use crate::storage::file::write_atomically;

type Registry = BTreeMap<String, SystemTime>;

/// Last-run timestamps for scheduled jobs, kept as a single JSON object on disk.
pub struct Dao {
    registry_path: PathBuf,
}

impl Dao {
    pub fn new<P: AsRef<Path>>(registry_path: P) -> Self {
        Self {
            registry_path: registry_path.as_ref().to_path_buf(),
        }
    }

    pub fn get_job_last_run_timestamp(&self, name: &str) -> Result<Option<SystemTime>, DaoError> {
        Ok(self.load()?.get(name).copied())
    }

    pub fn set_job_last_run_timestamp(
        &self,
        job_name: &str,
        timestamp: SystemTime,
    ) -> Result<(), DaoError> {
        let mut registry = self.load()?;
        registry.insert(String::from(job_name), timestamp);

        if let Some(parent) = self.registry_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_vec_pretty(&registry)?;
        write_atomically(&self.registry_path, &contents)?;

        Ok(())
    }

    fn load(&self) -> Result<Registry, DaoError> {
        match fs::read(&self.registry_path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Registry::new()),
            Err(e) => Err(e.into()),
        }
    }
}
