//! Device-side view of a manifest.
//!
//! Devices compare their running version against `version` and `min_version`
//! and verify every digest before flashing. These helpers encode that
//! contract so tooling and tests can check manifests the way a device would.

use std::path::Path;

use crate::fs::digest::{digest_file, is_sha256_hex};
use crate::manifest::Manifest;
use crate::utils::{Result, SyncError};
use crate::version::FirmwareVersion;

/// What a device running `running` should do with a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Running version is already at or above the manifest version
    UpToDate,

    /// Download and verify the artifacts, then flash `target`
    Apply { target: FirmwareVersion },

    /// Running version is below `min_version`; the device must first move to
    /// an intermediate release instead of jumping straight to the latest
    NeedsIntermediate { min_version: FirmwareVersion },
}

pub fn plan_update(running: &FirmwareVersion, manifest: &Manifest) -> UpdatePlan {
    if *running >= manifest.version {
        UpdatePlan::UpToDate
    } else if *running < manifest.min_version {
        UpdatePlan::NeedsIntermediate {
            min_version: manifest.min_version.clone(),
        }
    } else {
        UpdatePlan::Apply {
            target: manifest.version.clone(),
        }
    }
}

/// Check a downloaded file against the digest (and size, for binaries) from a manifest.
///
/// A malformed expected digest is rejected before the file is read.
pub fn verify_file(path: &Path, expected_sha256: &str, expected_size: Option<u64>) -> Result<()> {
    if !is_sha256_hex(expected_sha256) {
        return Err(SyncError::InvalidDigest(expected_sha256.to_string()));
    }

    let digest = digest_file(path)?;

    if let Some(size) = expected_size {
        if digest.size != size {
            return Err(SyncError::DigestMismatch {
                path: path.to_path_buf(),
                expected: format!("{} bytes", size),
                actual: format!("{} bytes", digest.size),
            });
        }
    }

    if digest.sha256 != expected_sha256 {
        return Err(SyncError::DigestMismatch {
            path: path.to_path_buf(),
            expected: expected_sha256.to_string(),
            actual: digest.sha256,
        });
    }

    Ok(())
}
