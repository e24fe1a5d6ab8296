//! Firmware version parsing and version-directory selection.
//!
//! Versions are strict `major.minor.patch` triples. Pre-release and build
//! metadata are rejected so ordering is plain numeric precedence.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::fs::layout::list_subdirectories;
use crate::utils::{Result, SyncError};

/// Prefix of every version directory name (`v1.2.3`)
pub const VERSION_DIR_PREFIX: char = 'v';

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FirmwareVersion(semver::Version);

impl FirmwareVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    /// Parse a bare `major.minor.patch` string.
    pub fn parse(raw: &str) -> Result<Self> {
        parse_triple(raw)
            .map(Self)
            .map_err(|reason| SyncError::InvalidVersion(format!("{}: {}", raw, reason)))
    }

    /// Parse a directory name of the form `v<major>.<min>.<patch>`.
    pub fn from_dir_name(name: &str) -> Result<Self> {
        let reason = match name.strip_prefix(VERSION_DIR_PREFIX) {
            Some(rest) => match parse_triple(rest) {
                Ok(version) => return Ok(Self(version)),
                Err(reason) => reason,
            },
            None => format!("missing '{}' prefix", VERSION_DIR_PREFIX),
        };
        Err(SyncError::UnparsableVersionDirectory(format!("{}: {}", name, reason)))
    }

    /// Directory name for this version (`v1.2.3`)
    pub fn dir_name(&self) -> String {
        format!("{}{}", VERSION_DIR_PREFIX, self.0)
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FirmwareVersion {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for FirmwareVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FirmwareVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn parse_triple(raw: &str) -> std::result::Result<semver::Version, String> {
    let version = semver::Version::parse(raw).map_err(|e| e.to_string())?;
    if !version.pre.is_empty() || !version.build.is_empty() {
        return Err("pre-release and build metadata are not supported".to_string());
    }
    Ok(version)
}

/// A selected version directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDir {
    pub version: FirmwareVersion,
    pub path: PathBuf,
}

/// Result of scanning one device directory for version directories
#[derive(Debug, Clone, Default)]
pub struct VersionScan {
    /// Highest valid version, if any
    pub latest: Option<VersionDir>,

    /// Directory names that looked like candidates but failed to parse
    pub rejected: Vec<String>,
}

/// Scan `device_dir` and pick the highest `v<maj>.<min>.<patch>` subdirectory.
///
/// Unparsable names are logged and collected in `rejected`; they never abort
/// the scan.
pub fn scan_version_dirs(device_dir: &Path, exclude_patterns: &[String]) -> Result<VersionScan> {
    let mut scan = VersionScan::default();

    for (name, path) in list_subdirectories(device_dir, exclude_patterns)? {
        match FirmwareVersion::from_dir_name(&name) {
            Ok(version) => {
                debug!("Found version directory {}", path.display());
                let newer = scan
                    .latest
                    .as_ref()
                    .map_or(true, |best| version > best.version);
                if newer {
                    scan.latest = Some(VersionDir { version, path });
                }
            }
            Err(e) => {
                warn!("Ignoring version directory {}: {}", path.display(), e);
                scan.rejected.push(name);
            }
        }
    }

    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_plain_triple() {
        let v = FirmwareVersion::parse("1.10.3").unwrap();
        assert_eq!((v.major(), v.minor(), v.patch()), (1, 10, 3));
        assert_eq!(v.to_string(), "1.10.3");
        assert_eq!(v.dir_name(), "v1.10.3");
    }

    #[test]
    fn test_rejects_extensions_and_garbage() {
        assert!(FirmwareVersion::parse("1.0.0-rc1").is_err());
        assert!(FirmwareVersion::parse("1.0.0+build5").is_err());
        assert!(FirmwareVersion::parse("1.0").is_err());
        assert!(FirmwareVersion::parse("01.0.0").is_err());
        assert!(FirmwareVersion::from_dir_name("1.0.0").is_err());
        assert!(FirmwareVersion::from_dir_name("vlatest").is_err());
    }

    #[test]
    fn test_error_wording_depends_on_source() {
        let err = FirmwareVersion::parse("one").unwrap_err();
        assert!(matches!(err, SyncError::InvalidVersion(_)));
        assert!(!err.to_string().contains("directory"));

        let err = FirmwareVersion::from_dir_name("v1.0.0-rc1").unwrap_err();
        assert!(matches!(err, SyncError::UnparsableVersionDirectory(_)));
        assert!(err.to_string().starts_with("Unparsable version directory: v1.0.0-rc1: "));
    }

    #[test]
    fn test_numeric_ordering() {
        let a = FirmwareVersion::parse("1.2.0").unwrap();
        let b = FirmwareVersion::parse("1.10.0").unwrap();
        let c = FirmwareVersion::parse("2.0.0").unwrap();
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a, FirmwareVersion::new(1, 2, 0));
    }

    #[test]
    fn test_serde_as_string() {
        let v: FirmwareVersion = serde_json::from_str("\"3.1.4\"").unwrap();
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"3.1.4\"");
        assert!(serde_json::from_str::<FirmwareVersion>("\"3.1\"").is_err());
    }

    #[test]
    fn test_scan_picks_numeric_max() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        for name in ["v1.0.0", "v1.2.0", "v1.10.0"] {
            fs::create_dir(temp_dir.path().join(name))?;
        }

        let scan = scan_version_dirs(temp_dir.path(), &[]).unwrap();
        let latest = scan.latest.unwrap();
        assert_eq!(latest.version.to_string(), "1.10.0");
        assert_eq!(latest.path, temp_dir.path().join("v1.10.0"));
        assert!(scan.rejected.is_empty());

        Ok(())
    }

    #[test]
    fn test_scan_skips_malformed_and_files() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::create_dir(temp_dir.path().join("v2.0.0-beta"))?;
        fs::create_dir(temp_dir.path().join("old"))?;
        fs::create_dir(temp_dir.path().join("v0.9.1"))?;
        fs::write(temp_dir.path().join("v9.9.9"), b"not a directory")?;

        let scan = scan_version_dirs(temp_dir.path(), &[]).unwrap();
        assert_eq!(scan.latest.unwrap().version.to_string(), "0.9.1");
        assert_eq!(scan.rejected, vec!["old".to_string(), "v2.0.0-beta".to_string()]);

        Ok(())
    }

    #[test]
    fn test_scan_empty_device() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let scan = scan_version_dirs(temp_dir.path(), &[]).unwrap();
        assert!(scan.latest.is_none());
        Ok(())
    }
}
