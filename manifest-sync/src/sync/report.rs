//! Per-device outcomes and the end-of-run summary.

use std::fmt;

use crate::version::FirmwareVersion;

/// What happened to one device during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOutcome {
    /// First manifest for this device. `chip` and `min_version` hold
    /// placeholders and need human review.
    Created { version: FirmwareVersion },

    /// Existing manifest rewritten
    Updated {
        version: FirmwareVersion,
        previous: Option<FirmwareVersion>,
    },

    /// Rendered manifest identical to the file on disk; nothing written
    Unchanged { version: FirmwareVersion },

    /// Check mode: the manifest on disk is missing or out of date
    Stale {
        version: FirmwareVersion,
        created: bool,
    },

    /// Spiffs or config directory without any firmware directory
    Orphaned,

    /// Device skipped; its previous manifest (if any) is untouched
    Failed { reason: String },
}

impl DeviceOutcome {
    fn label(&self) -> &'static str {
        match self {
            DeviceOutcome::Created { .. } => "created",
            DeviceOutcome::Updated { .. } => "updated",
            DeviceOutcome::Unchanged { .. } => "unchanged",
            DeviceOutcome::Stale { .. } => "stale",
            DeviceOutcome::Orphaned => "orphaned",
            DeviceOutcome::Failed { .. } => "failed",
        }
    }
}

/// Outcome plus any non-fatal warnings for one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReport {
    pub device: String,
    pub outcome: DeviceOutcome,
    pub warnings: Vec<String>,
}

/// Result of a full synchronization run
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub devices: Vec<DeviceReport>,

    /// Total artifact bytes hashed during the run
    pub bytes_hashed: u64,

    /// Whether the run was in check mode (no writes)
    pub check_only: bool,
}

impl SyncReport {
    pub fn device(&self, name: &str) -> Option<&DeviceReport> {
        self.devices.iter().find(|d| d.device == name)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DeviceReport> {
        self.devices
            .iter()
            .filter(|d| matches!(d.outcome, DeviceOutcome::Failed { .. }))
    }

    pub fn count(&self, label: &str) -> usize {
        self.devices.iter().filter(|d| d.outcome.label() == label).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// True when automation should treat the run as passed.
    ///
    /// In check mode a stale manifest counts as a failure.
    pub fn is_success(&self) -> bool {
        !self.has_failures() && !(self.check_only && self.count("stale") > 0)
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.devices {
            let detail = match &report.outcome {
                DeviceOutcome::Created { version } => {
                    format!("{} (new manifest: review chip and min_version)", version)
                }
                DeviceOutcome::Updated {
                    version,
                    previous: Some(previous),
                } if previous != version => format!("{} -> {}", previous, version),
                DeviceOutcome::Updated { version, .. } | DeviceOutcome::Unchanged { version } => {
                    version.to_string()
                }
                DeviceOutcome::Stale { version, created } => {
                    if *created {
                        format!("{} (manifest missing)", version)
                    } else {
                        format!("{} (manifest out of date)", version)
                    }
                }
                DeviceOutcome::Orphaned => "no firmware directory".to_string(),
                DeviceOutcome::Failed { reason } => reason.clone(),
            };
            writeln!(f, "  [{:<9}] {}: {}", report.outcome.label(), report.device, detail)?;
            for warning in &report.warnings {
                writeln!(f, "              warning: {}", warning)?;
            }
        }

        write!(
            f,
            "Done. {} created, {} updated, {} unchanged, {} stale, {} orphaned, {} failed ({} hashed).",
            self.count("created"),
            self.count("updated"),
            self.count("unchanged"),
            self.count("stale"),
            self.count("orphaned"),
            self.count("failed"),
            format_bytes(self.bytes_hashed),
        )
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(device: &str, outcome: DeviceOutcome) -> DeviceReport {
        DeviceReport {
            device: device.to_string(),
            outcome,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_failure_sets_exit_code() {
        let report = SyncReport {
            devices: vec![
                entry("a", DeviceOutcome::Failed { reason: "Missing artifact".to_string() }),
                entry("b", DeviceOutcome::Unchanged { version: FirmwareVersion::new(1, 0, 0) }),
            ],
            ..Default::default()
        };

        assert!(report.has_failures());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failed().map(|d| d.device.as_str()).collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_orphans_do_not_fail() {
        let report = SyncReport {
            devices: vec![entry("a", DeviceOutcome::Orphaned)],
            ..Default::default()
        };
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_stale_fails_only_in_check_mode() {
        let stale = entry(
            "a",
            DeviceOutcome::Stale {
                version: FirmwareVersion::new(1, 0, 0),
                created: false,
            },
        );

        let mut report = SyncReport {
            devices: vec![stale],
            ..Default::default()
        };
        assert!(report.is_success());

        report.check_only = true;
        assert!(!report.is_success());
    }

    #[test]
    fn test_summary_lines() {
        let report = SyncReport {
            devices: vec![
                entry(
                    "lamp",
                    DeviceOutcome::Updated {
                        version: FirmwareVersion::new(1, 1, 0),
                        previous: Some(FirmwareVersion::new(1, 0, 0)),
                    },
                ),
                entry("fog", DeviceOutcome::Created { version: FirmwareVersion::new(0, 1, 0) }),
            ],
            bytes_hashed: 2048,
            check_only: false,
        };

        let text = report.to_string();
        assert!(text.contains("lamp: 1.0.0 -> 1.1.0"));
        assert!(text.contains("review chip and min_version"));
        assert!(text.ends_with("1 created, 1 updated, 0 unchanged, 0 stale, 0 orphaned, 0 failed (2.00 KB hashed)."));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1023), "1023.00 B");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
    }
}
