//! Utility modules for the manifest synchronizer.

pub mod errors;
pub mod logger;

pub use errors::{Result, SyncError};
