use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("model {0} not found in registry")]
    NotFound(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("registry storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("registry document at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("model artifact not found: {0}")]
    ArtifactMissing(PathBuf),
    #[error("unsupported model format: {0}")]
    UnsupportedFormat(String),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool { matches!(self, RegistryError::NotFound(_)) }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
