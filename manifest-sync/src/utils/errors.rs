//! Custom error types for the manifest synchronizer.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Repository unreadable at {path}: {source}")]
    UnreadableRepository {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Unparsable version directory: {0}")]
    UnparsableVersionDirectory(String),

    #[error("No valid version directory under {0}")]
    NoVersionDirectory(PathBuf),

    #[error("Missing artifact: {0}")]
    MissingArtifact(PathBuf),

    #[error("Invalid existing manifest {path}: {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("Schema validation failed: {}", .0.join("; "))]
    SchemaValidation(Vec<String>),

    #[error("min_version {min_version} is above version {version}")]
    MinVersionAboveVersion { min_version: String, version: String },

    #[error("Malformed sha256 digest: {0:?}")]
    InvalidDigest(String),

    #[error("Digest mismatch for {path}: expected {expected}, got {actual}")]
    DigestMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
