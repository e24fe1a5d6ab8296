//! Filesystem access: repository layout, device discovery and file digests.

pub mod digest;
pub mod layout;
