//! Registry semantics over a [`RegistryStore`].
//!
//! Every call re-reads the store; nothing is cached between calls. Mutations run a full
//! load-modify-save cycle under a single writer lock so two concurrent registrations cannot
//! lose each other's update.

use crate::error::{RegistryError, RegistryResult};
use crate::record::{composite_key, validate_key, ArtifactFormat, ModelRecord, ModelRegistration, ModelStatus, LATEST};
use crate::store::{JsonFileStore, RegistryMap, RegistryStore};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::PathBuf;
use tracing::info;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct ModelRegistry<S: RegistryStore = JsonFileStore> {
    store: S,
    writer: Mutex<()>,
    clock: Clock,
}

impl ModelRegistry<JsonFileStore> {
    /// Registry backed by the JSON document at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self { Self::new(JsonFileStore::new(path)) }
}

impl<S: RegistryStore> ModelRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store, writer: Mutex::new(()), clock: Box::new(Utc::now) }
    }

    /// Replace the source of registration timestamps.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &S { &self.store }

    /// Register a model version with status `active` and a fresh timestamp.
    ///
    /// An existing record under the same `name:version` is replaced outright: the new record
    /// keeps nothing from the old one, including its timestamp and status.
    pub fn register(&self, registration: ModelRegistration) -> RegistryResult<ModelRecord> {
        validate_key(&registration.name, &registration.version)?;
        if let Some((metric, value)) = registration.metrics.iter().find(|(_, v)| !v.is_finite()) {
            return Err(RegistryError::InvalidArgument(format!("metric '{metric}' must be finite, got {value}")));
        }

        let _guard = self.writer.lock();
        let mut records = self.store.load()?;
        let record = registration.into_record((self.clock)());
        let key = record.key();
        let replaced = records.insert(key.clone(), record.clone()).is_some();
        self.store.save(&records)?;
        info!(model = %key, model_type = %record.model_type, replaced, "registered model");
        Ok(record)
    }

    /// Look up `name:version`, or the most recently registered version when `version` is
    /// [`LATEST`].
    pub fn get_info(&self, name: &str, version: &str) -> RegistryResult<ModelRecord> {
        let records = self.store.load()?;
        let found = if version == LATEST {
            latest_of(&records, name)
        } else {
            records.get(&composite_key(name, version))
        };
        found.cloned().ok_or_else(|| RegistryError::NotFound(composite_key(name, version)))
    }

    pub fn list_all(&self) -> RegistryResult<RegistryMap> { self.store.load() }

    /// All versions of `name`, oldest registration first.
    pub fn list_versions(&self, name: &str) -> RegistryResult<Vec<ModelRecord>> {
        let records = self.store.load()?;
        let mut versions: Vec<ModelRecord> = versions_of(&records, name).map(|(_, r)| r.clone()).collect();
        versions.sort_by(|a, b| a.registered_at.cmp(&b.registered_at).then_with(|| a.version.cmp(&b.version)));
        Ok(versions)
    }

    /// Change the status of an existing record. `status` must be one of `active`,
    /// `deprecated` or `archived`.
    pub fn update_status(&self, name: &str, version: &str, status: &str) -> RegistryResult<ModelRecord> {
        let status: ModelStatus = status.parse()?;
        self.set_status(name, version, status)
    }

    pub fn set_status(&self, name: &str, version: &str, status: ModelStatus) -> RegistryResult<ModelRecord> {
        let key = composite_key(name, version);
        let _guard = self.writer.lock();
        let mut records = self.store.load()?;
        let record = records.get_mut(&key).ok_or_else(|| RegistryError::NotFound(key.clone()))?;
        let previous = record.status;
        record.status = status;
        let updated = record.clone();
        self.store.save(&records)?;
        info!(model = %key, from = %previous, to = %status, "model status updated");
        Ok(updated)
    }

    /// Path of the stored artifact for `name:version` (or `latest`). The path is not checked.
    pub fn resolve_artifact(&self, name: &str, version: &str) -> RegistryResult<PathBuf> {
        Ok(self.get_info(name, version)?.artifact_path().to_path_buf())
    }

    /// Like [`Self::resolve_artifact`], but also requires the artifact to exist on disk in a
    /// supported format.
    pub fn locate_artifact(&self, name: &str, version: &str) -> RegistryResult<(PathBuf, ArtifactFormat)> {
        let path = self.resolve_artifact(name, version)?;
        if !path.exists() {
            return Err(RegistryError::ArtifactMissing(path));
        }
        let format = ArtifactFormat::from_path(&path)?;
        Ok((path, format))
    }
}

/// Records of `name` only. Versions may contain `:`, so a key prefix alone can also match a
/// different name (`a:b:1` is version `b:1` of `a`, not version `1` of `a:b`).
fn versions_of<'a>(records: &'a RegistryMap, name: &str) -> impl Iterator<Item = (&'a String, &'a ModelRecord)> {
    let prefix = format!("{name}:");
    let name = name.to_string();
    records
        .range(prefix.clone()..)
        .take_while(move |(k, _)| k.starts_with(&prefix))
        .filter(move |(_, r)| r.name == name)
}

/// Greatest `registered_at` wins; equal timestamps fall back to the greater key.
fn latest_of<'a>(records: &'a RegistryMap, name: &str) -> Option<&'a ModelRecord> {
    versions_of(records, name)
        .max_by(|(ka, a), (kb, b)| a.registered_at.cmp(&b.registered_at).then_with(|| ka.cmp(kb)))
        .map(|(_, r)| r)
}
