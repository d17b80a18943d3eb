//! Model records as persisted in the registry document.

use crate::error::{RegistryError, RegistryResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Version token that resolves to the most recently registered version of a name.
pub const LATEST: &str = "latest";

pub type Metrics = BTreeMap<String, f64>;
/// Caller-supplied context; values may be strings, numbers, bools, arrays or nested maps.
pub type Metadata = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Active,
    Deprecated,
    Archived,
}

impl ModelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStatus::Active => "active",
            ModelStatus::Deprecated => "deprecated",
            ModelStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ModelStatus {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ModelStatus::Active),
            "deprecated" => Ok(ModelStatus::Deprecated),
            "archived" => Ok(ModelStatus::Archived),
            other => Err(RegistryError::InvalidArgument(format!(
                "unknown model status '{other}' (expected active, deprecated or archived)"
            ))),
        }
    }
}

/// One registered `(name, version)` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub name: String,
    pub version: String,
    /// Path or URI of the stored artifact. Not checked for existence on registration.
    pub model_path: String,
    pub model_type: String,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(with = "timestamp")]
    pub registered_at: DateTime<Utc>,
    pub status: ModelStatus,
}

impl ModelRecord {
    pub fn key(&self) -> String { composite_key(&self.name, &self.version) }
    pub fn artifact_path(&self) -> &Path { Path::new(&self.model_path) }
}

/// Input to `ModelRegistry::register`.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistration {
    pub name: String,
    pub version: String,
    pub model_path: String,
    pub model_type: String,
    pub metrics: Metrics,
    pub metadata: Metadata,
}

impl ModelRegistration {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        model_path: impl Into<String>,
        model_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            model_path: model_path.into(),
            model_type: model_type.into(),
            ..Default::default()
        }
    }

    pub fn metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub(crate) fn into_record(self, registered_at: DateTime<Utc>) -> ModelRecord {
        ModelRecord {
            name: self.name,
            version: self.version,
            model_path: self.model_path,
            model_type: self.model_type,
            metrics: self.metrics,
            metadata: self.metadata,
            registered_at,
            status: ModelStatus::Active,
        }
    }
}

/// Serialized form an artifact is stored in, derived from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Torch,
    Pickle,
}

impl ArtifactFormat {
    pub fn from_path(path: &Path) -> RegistryResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("pth") => Ok(ArtifactFormat::Torch),
            Some("pkl") => Ok(ArtifactFormat::Pickle),
            Some(ext) => Err(RegistryError::UnsupportedFormat(format!(".{ext}"))),
            None => Err(RegistryError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

pub fn composite_key(name: &str, version: &str) -> String { format!("{name}:{version}") }

/// Names may not contain `:`; `latest` is reserved as a version selector.
pub(crate) fn validate_key(name: &str, version: &str) -> RegistryResult<()> {
    if name.is_empty() {
        return Err(RegistryError::InvalidArgument("model name must not be empty".into()));
    }
    if name.contains(':') {
        return Err(RegistryError::InvalidArgument(format!("model name '{name}' must not contain ':'")));
    }
    if version.is_empty() {
        return Err(RegistryError::InvalidArgument("model version must not be empty".into()));
    }
    if version == LATEST {
        return Err(RegistryError::InvalidArgument(format!("'{LATEST}' is reserved and cannot be registered as a version")));
    }
    Ok(())
}

/// RFC 3339 on write. Also reads naive ISO-8601 timestamps (no offset) as UTC.
///
/// Older documents stored the writer's local wall-clock time without an offset, so on a host
/// whose zone is not UTC those records sit off by the zone offset. `latest` may then rank an
/// old naive record against a new UTC one in the wrong order until the old record is
/// registered again.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => Ok(dt.with_timezone(&Utc)),
            Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()),
        }
    }
}
