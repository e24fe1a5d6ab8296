//! Per-device OTA manifest: document model, schema gate and storage.

pub mod schema;
pub mod store;
pub mod types;

pub use schema::ManifestSchema;
pub use types::{BinaryArtifact, ConfigArtifact, Manifest};
