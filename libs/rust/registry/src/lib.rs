//! Versioned model metadata registry.
//!
//! Records are keyed by `"{name}:{version}"` and persisted as one JSON document. See
//! [`ModelRegistry`] for the operations and [`RegistryStore`] for the persistence seam.

pub mod error;
pub mod record;
pub mod service;
pub mod store;

pub use error::{RegistryError, RegistryResult};
pub use record::{composite_key, ArtifactFormat, Metadata, Metrics, ModelRecord, ModelRegistration, ModelStatus, LATEST};
pub use service::ModelRegistry;
pub use store::{InMemoryStore, JsonFileStore, RegistryMap, RegistryStore};
