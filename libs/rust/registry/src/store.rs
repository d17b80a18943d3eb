//! Whole-document persistence for registry records.
//!
//! The registry is small and human-operated, so every save rewrites the full document. Saves go
//! through a temporary file in the same directory that is then renamed over the target, so a
//! concurrent reader sees either the old or the new document, never a partial one.

use crate::error::{RegistryError, RegistryResult};
use crate::record::ModelRecord;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Records keyed by `"{name}:{version}"`.
pub type RegistryMap = BTreeMap<String, ModelRecord>;

pub trait RegistryStore: Send + Sync {
    /// Read every record. A store that was never written is empty, not an error.
    fn load(&self) -> RegistryResult<RegistryMap>;
    /// Replace the persisted document with `records`.
    fn save(&self, records: &RegistryMap) -> RegistryResult<()>;
}

/// JSON document on the local filesystem.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }

    fn storage_err(&self, source: io::Error) -> RegistryError {
        RegistryError::Storage { path: self.path.clone(), source }
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> RegistryResult<RegistryMap> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RegistryMap::new()),
            Err(e) => return Err(self.storage_err(e)),
        };
        if content.trim().is_empty() {
            return Ok(RegistryMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|source| RegistryError::Corrupt { path: self.path.clone(), source })
    }

    fn save(&self, records: &RegistryMap) -> RegistryResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.storage_err(e))?;
        let mut json = serde_json::to_vec_pretty(records)
            .map_err(|e| self.storage_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        json.push(b'\n');

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.storage_err(e))?;
        tmp.write_all(&json).map_err(|e| self.storage_err(e))?;
        tmp.as_file().sync_all().map_err(|e| self.storage_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.storage_err(e.error))?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "registry saved");
        Ok(())
    }
}

/// Process-local store, handy for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<RegistryMap>,
}

impl InMemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl RegistryStore for InMemoryStore {
    fn load(&self) -> RegistryResult<RegistryMap> { Ok(self.records.read().clone()) }

    fn save(&self, records: &RegistryMap) -> RegistryResult<()> {
        *self.records.write() = records.clone();
        Ok(())
    }
}
