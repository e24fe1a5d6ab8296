//! Repository layout and device discovery.
//!
//! The repository is a plain directory tree:
//!
//! ```text
//! firmware/<device>/v<maj>.<min>.<patch>/firmware.bin
//! spiffs/<device>/v<maj>.<min>.<patch>/spiffs.bin
//! config/<device>/config.yaml
//! firmware/<device>.manifest.json
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::LayoutConfig;
use crate::utils::{Result, SyncError};
use crate::version::FirmwareVersion;

/// Suffix appended to a device name to form its manifest file name
pub const MANIFEST_SUFFIX: &str = ".manifest.json";

/// Resolved paths for one repository checkout
#[derive(Debug, Clone)]
pub struct RepoLayout {
    root: PathBuf,
    layout: LayoutConfig,
}

impl RepoLayout {
    pub fn new(root: impl Into<PathBuf>, layout: LayoutConfig) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.layout.exclude_patterns
    }

    pub fn firmware_root(&self) -> PathBuf {
        self.root.join(&self.layout.firmware_dir)
    }

    pub fn spiffs_root(&self) -> PathBuf {
        self.root.join(&self.layout.spiffs_dir)
    }

    pub fn config_root(&self) -> PathBuf {
        self.root.join(&self.layout.config_dir)
    }

    pub fn firmware_device_dir(&self, device: &str) -> PathBuf {
        self.firmware_root().join(device)
    }

    pub fn firmware_binary(&self, device: &str, version: &FirmwareVersion) -> PathBuf {
        self.firmware_device_dir(device)
            .join(version.dir_name())
            .join(&self.layout.firmware_file)
    }

    /// Filesystem image for `device`, versioned in lockstep with the firmware
    pub fn spiffs_image(&self, device: &str, version: &FirmwareVersion) -> PathBuf {
        self.spiffs_root()
            .join(device)
            .join(version.dir_name())
            .join(&self.layout.spiffs_file)
    }

    pub fn config_file(&self, device: &str) -> PathBuf {
        self.config_root().join(device).join(&self.layout.config_file)
    }

    pub fn manifest_path(&self, device: &str) -> PathBuf {
        self.firmware_root().join(format!("{}{}", device, MANIFEST_SUFFIX))
    }

    /// Repository-relative path with `/` separators and each segment
    /// percent-encoded, ready to append to the base URL
    pub fn relative_url_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| urlencoding::encode(&c.as_os_str().to_string_lossy()).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Device names found under the firmware root.
    ///
    /// A missing or unreadable firmware root is fatal for the whole run.
    pub fn firmware_devices(&self) -> Result<Vec<String>> {
        let root = self.firmware_root();
        list_subdirectories(&root, self.exclude_patterns())
            .map(|dirs| dirs.into_iter().map(|(name, _)| name).collect())
            .map_err(|e| match e {
                SyncError::Io(source) => SyncError::UnreadableRepository { path: root, source },
                other => other,
            })
    }

    /// Device names found under the spiffs and config roots, which may be absent.
    pub fn auxiliary_devices(&self) -> Result<BTreeSet<String>> {
        let mut devices = BTreeSet::new();
        for root in [self.spiffs_root(), self.config_root()] {
            if !root.is_dir() {
                continue;
            }
            for (name, _) in list_subdirectories(&root, self.exclude_patterns())? {
                devices.insert(name);
            }
        }
        Ok(devices)
    }
}

/// List the immediate subdirectories of `dir`, sorted by name.
///
/// Symlinks are not followed and names matching an exclude pattern are skipped.
pub fn list_subdirectories(dir: &Path, exclude_patterns: &[String]) -> Result<Vec<(String, PathBuf)>> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    let mut dirs = Vec::new();
    for entry in walker {
        let entry = entry.map_err(walk_error)?;

        if !entry.file_type().is_dir() || should_exclude(&entry, exclude_patterns) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        dirs.push((name, entry.into_path()));
    }

    Ok(dirs)
}

/// Check if a directory entry should be excluded based on patterns
fn should_exclude(entry: &DirEntry, patterns: &[String]) -> bool {
    let file_name = entry.file_name().to_string_lossy();
    patterns.iter().any(|pattern| file_name.contains(pattern.as_str()))
}

fn walk_error(err: walkdir::Error) -> SyncError {
    let message = err.to_string();
    match err.into_io_error() {
        Some(io) => SyncError::Io(io),
        None => SyncError::Io(std::io::Error::other(message)),
    }
}
