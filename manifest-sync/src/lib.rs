//! Manifest Synchronizer Library
//!
//! Rescans the firmware, spiffs and config trees of an OTA distribution
//! repository and rewrites the per-device manifest files.

pub mod config;
pub mod fs;
pub mod manifest;
pub mod ota;
pub mod sync;
pub mod utils;
pub mod version;

// Re-export commonly used types
pub use config::Config;
pub use manifest::Manifest;
pub use sync::{synchronize, SyncReport, Synchronizer};
pub use utils::errors::SyncError;
pub use version::FirmwareVersion;
pub type Result<T> = std::result::Result<T, SyncError>;
