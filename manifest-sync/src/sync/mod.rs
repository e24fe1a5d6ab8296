//! Manifest synchronizer - rescans the repository and rewrites manifests.
//!
//! For every device with a firmware directory:
//! - pick the highest `v<maj>.<min>.<patch>` firmware directory
//! - hash the firmware binary, the lockstep spiffs image and the config file
//! - merge with the hand-curated fields of the previous manifest
//! - validate against the schema and write only if the bytes changed
//!
//! Per-device failures are collected in the [`SyncReport`]; only an
//! unreadable repository aborts the run.

pub mod report;

use serde_json::Map;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::fs::digest::{digest_file, FileDigest};
use crate::fs::layout::RepoLayout;
use crate::manifest::store::{load_prior, persist, PriorManifest, WriteOutcome};
use crate::manifest::{BinaryArtifact, ConfigArtifact, Manifest, ManifestSchema};
use crate::utils::{Result, SyncError};
use crate::version::{scan_version_dirs, FirmwareVersion};
pub use report::{DeviceOutcome, DeviceReport, SyncReport};

/// Rescans one repository checkout
#[derive(Debug)]
pub struct Synchronizer {
    config: Config,
    layout: RepoLayout,
    schema: ManifestSchema,
    default_min_version: FirmwareVersion,
    check_only: bool,
}

/// Manifest assembled for one device, before it is persisted
#[derive(Debug, Clone)]
pub struct BuiltManifest {
    pub manifest: Manifest,
    pub prior: Option<PriorManifest>,
    pub bytes_hashed: u64,
}

impl Synchronizer {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Result<Self> {
        let default_min_version = FirmwareVersion::parse(&config.defaults.min_version)
            .map_err(|e| SyncError::Config(format!("defaults.min_version: {}", e)))?;

        Ok(Self {
            layout: RepoLayout::new(root, config.layout.clone()),
            schema: ManifestSchema::new()?,
            default_min_version,
            config,
            check_only: false,
        })
    }

    /// Compute everything but write nothing; differences are reported as stale.
    pub fn check_only(mut self, check_only: bool) -> Self {
        self.check_only = check_only;
        self
    }

    pub fn layout(&self) -> &RepoLayout {
        &self.layout
    }

    /// Run over every device in the repository.
    pub fn run(&self) -> Result<SyncReport> {
        let firmware_devices: BTreeSet<String> = self.layout.firmware_devices()?.into_iter().collect();
        let orphans: Vec<String> = self
            .layout
            .auxiliary_devices()?
            .into_iter()
            .filter(|d| !firmware_devices.contains(d))
            .collect();

        info!(
            "Synchronizing {} device(s) under {}",
            firmware_devices.len(),
            self.layout.root().display()
        );

        let mut report = SyncReport {
            check_only: self.check_only,
            ..Default::default()
        };

        for device in &firmware_devices {
            let mut warnings = Vec::new();
            let outcome = match self.sync_device(device, &mut warnings, &mut report.bytes_hashed) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Device {} skipped: {}", device, e);
                    DeviceOutcome::Failed { reason: e.to_string() }
                }
            };

            report.devices.push(DeviceReport {
                device: device.clone(),
                outcome,
                warnings,
            });
        }

        for device in orphans {
            warn!("Device {} has spiffs/config artifacts but no firmware directory", device);
            report.devices.push(DeviceReport {
                device,
                outcome: DeviceOutcome::Orphaned,
                warnings: Vec::new(),
            });
        }
        report.devices.sort_by(|a, b| a.device.cmp(&b.device));

        Ok(report)
    }

    fn sync_device(&self, device: &str, warnings: &mut Vec<String>, bytes_hashed: &mut u64) -> Result<DeviceOutcome> {
        let built = self.build_manifest(device, warnings)?;
        *bytes_hashed += built.bytes_hashed;

        let version = built.manifest.version.clone();
        let path = self.layout.manifest_path(device);
        let value = serde_json::to_value(&built.manifest)?;
        let previous_text = built.prior.as_ref().map(|p| p.text.as_str());

        let outcome = match persist(&self.schema, &path, &value, previous_text, self.check_only)? {
            WriteOutcome::Unchanged => {
                debug!("{} unchanged at {}", path.display(), version);
                DeviceOutcome::Unchanged { version }
            }
            WriteOutcome::Pending => {
                warn!("{} is out of date (latest firmware {})", path.display(), version);
                DeviceOutcome::Stale {
                    version,
                    created: built.prior.is_none(),
                }
            }
            WriteOutcome::Written => match built.prior {
                None => {
                    info!("Created {} at {} (placeholder chip/min_version)", path.display(), version);
                    DeviceOutcome::Created { version }
                }
                Some(prior) => {
                    info!("Updated {} at {}", path.display(), version);
                    DeviceOutcome::Updated {
                        version,
                        previous: prior.version,
                    }
                }
            },
        };

        Ok(outcome)
    }

    /// Assemble the manifest for `device` from the files on disk and the
    /// previous manifest, without writing anything.
    pub fn build_manifest(&self, device: &str, warnings: &mut Vec<String>) -> Result<BuiltManifest> {
        let device_dir = self.layout.firmware_device_dir(device);
        let scan = scan_version_dirs(&device_dir, self.layout.exclude_patterns())?;
        for name in &scan.rejected {
            warnings.push(format!("ignored unparsable version directory {}", name));
        }

        let latest = scan
            .latest
            .ok_or_else(|| SyncError::NoVersionDirectory(device_dir.clone()))?;
        let version = latest.version;

        let mut bytes_hashed = 0u64;

        let firmware_path = self.layout.firmware_binary(device, &version);
        let firmware_digest = self
            .digest_artifact(&firmware_path)?
            .ok_or_else(|| SyncError::MissingArtifact(firmware_path.clone()))?;
        bytes_hashed += firmware_digest.size;
        let firmware = BinaryArtifact::new(self.artifact_url(&firmware_path), firmware_digest);

        let spiffs_path = self.layout.spiffs_image(device, &version);
        let spiffs = match self.digest_artifact(&spiffs_path)? {
            Some(digest) => {
                bytes_hashed += digest.size;
                Some(BinaryArtifact::new(self.artifact_url(&spiffs_path), digest))
            }
            None => {
                if self.layout.spiffs_root().join(device).is_dir() {
                    warnings.push(format!("no spiffs image for {}; spiffs omitted", version.dir_name()));
                }
                None
            }
        };

        let config_path = self.layout.config_file(device);
        let config = match self.digest_artifact(&config_path)? {
            Some(digest) => {
                bytes_hashed += digest.size;
                Some(ConfigArtifact::new(self.artifact_url(&config_path), digest))
            }
            None => None,
        };

        let prior = load_prior(&self.layout.manifest_path(device))?;
        if let Some(previous) = prior.as_ref().and_then(|p| p.version.as_ref()) {
            if *previous > version {
                warn!("Device {} version goes backwards: {} -> {}", device, previous, version);
                warnings.push(format!("version decreased from {} to {}", previous, version));
            }
        }

        let manifest = self.assemble(device, version, firmware, spiffs, config, prior.as_ref())?;

        Ok(BuiltManifest {
            manifest,
            prior,
            bytes_hashed,
        })
    }

    fn assemble(
        &self,
        device: &str,
        version: FirmwareVersion,
        firmware: BinaryArtifact,
        spiffs: Option<BinaryArtifact>,
        config: Option<ConfigArtifact>,
        prior: Option<&PriorManifest>,
    ) -> Result<Manifest> {
        let schema = prior
            .and_then(|p| p.schema.clone())
            .unwrap_or_else(|| self.config.schema_url());
        let chip = prior
            .and_then(|p| p.chip.clone())
            .unwrap_or_else(|| self.config.defaults.chip.clone());
        let min_version = prior
            .and_then(|p| p.min_version.clone())
            .unwrap_or_else(|| self.default_min_version.clone());
        let extra = prior.map(|p| p.extra.clone()).unwrap_or_else(Map::new);

        if min_version > version {
            return Err(SyncError::MinVersionAboveVersion {
                min_version: min_version.to_string(),
                version: version.to_string(),
            });
        }

        Ok(Manifest {
            schema: Some(schema),
            name: device.to_string(),
            chip,
            version,
            min_version,
            firmware,
            spiffs,
            config,
            extra,
        })
    }

    /// Digest a file if it exists. Anything other than a regular file counts as absent.
    fn digest_artifact(&self, path: &Path) -> Result<Option<FileDigest>> {
        if !path.is_file() {
            return Ok(None);
        }
        let digest = digest_file(path)?;
        debug!("{} sha256={} size={}", path.display(), digest.sha256, digest.size);
        Ok(Some(digest))
    }

    fn artifact_url(&self, path: &Path) -> String {
        format!(
            "{}/{}",
            self.config.publish.base_url,
            self.layout.relative_url_path(path)
        )
    }
}

/// Synchronize every manifest under `root` and return the report.
pub fn synchronize(root: &Path, config: &Config) -> Result<SyncReport> {
    Synchronizer::new(root, config.clone())?.run()
}
