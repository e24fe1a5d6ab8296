//! Configuration management for the manifest synchronizer.
//!
//! Loads configuration from an optional TOML file with environment variable
//! overrides. Every field has a default, so an empty file (or none at all)
//! describes the standard repository layout.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::{Result, SyncError};
use crate::version::FirmwareVersion;

/// Environment variable overriding `publish.base_url`.
pub const BASE_URL_ENV: &str = "MANIFEST_SYNC_BASE_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub publish: PublishConfig,
    pub layout: LayoutConfig,
    pub defaults: DefaultsConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// URL prefix under which the repository tree is served
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Root holding `<device>/v<version>/` firmware directories and the manifests
    #[serde(default = "default_firmware_dir")]
    pub firmware_dir: String,

    /// Root holding `<device>/v<version>/` filesystem image directories
    #[serde(default = "default_spiffs_dir")]
    pub spiffs_dir: String,

    /// Root holding `<device>/` config directories
    #[serde(default = "default_config_dir")]
    pub config_dir: String,

    #[serde(default = "default_firmware_file")]
    pub firmware_file: String,

    #[serde(default = "default_spiffs_file")]
    pub spiffs_file: String,

    #[serde(default = "default_config_file")]
    pub config_file: String,

    /// Directory names never treated as devices or versions
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

/// Placeholders written into manifests that are created for the first time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_chip")]
    pub chip: String,

    #[serde(default = "default_min_version")]
    pub min_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_base_url() -> String {
    "https://raw.githubusercontent.com/kubkpower/halloween_dmx_pub/main".to_string()
}

fn default_firmware_dir() -> String {
    "firmware".to_string()
}

fn default_spiffs_dir() -> String {
    "spiffs".to_string()
}

fn default_config_dir() -> String {
    "config".to_string()
}

fn default_firmware_file() -> String {
    "firmware.bin".to_string()
}

fn default_spiffs_file() -> String {
    "spiffs.bin".to_string()
}

fn default_config_file() -> String {
    "config.yaml".to_string()
}

fn default_exclude_patterns() -> Vec<String> {
    vec![".git".to_string(), ".DS_Store".to_string()]
}

fn default_chip() -> String {
    "unknown".to_string()
}

fn default_min_version() -> String {
    "0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            firmware_dir: default_firmware_dir(),
            spiffs_dir: default_spiffs_dir(),
            config_dir: default_config_dir(),
            firmware_file: default_firmware_file(),
            spiffs_file: default_spiffs_file(),
            config_file: default_config_file(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            chip: default_chip(),
            min_version: default_min_version(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.publish.base_url = url;
            }
        }
        self
    }

    /// Check invariants that serde cannot express and normalize the base URL.
    pub fn validate(mut self) -> Result<Self> {
        let trimmed = self.publish.base_url.trim().trim_end_matches('/').to_string();
        if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
            return Err(SyncError::Config(format!(
                "publish.base_url must be an http(s) URL, got {:?}",
                self.publish.base_url
            )));
        }
        self.publish.base_url = trimmed;

        FirmwareVersion::parse(&self.defaults.min_version).map_err(|e| {
            SyncError::Config(format!("defaults.min_version: {}", e))
        })?;

        if self.defaults.chip.trim().is_empty() {
            return Err(SyncError::Config("defaults.chip must not be empty".to_string()));
        }

        for name in [
            &self.layout.firmware_dir,
            &self.layout.spiffs_dir,
            &self.layout.config_dir,
            &self.layout.firmware_file,
            &self.layout.spiffs_file,
            &self.layout.config_file,
        ] {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(SyncError::Config(format!(
                    "layout entries must be single path segments, got {:?}",
                    name
                )));
            }
        }

        Ok(self)
    }

    /// URL of the schema document referenced by the `$schema` key
    pub fn schema_url(&self) -> String {
        format!("{}/manifest.schema.json", self.publish.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap().validate().unwrap();
        assert_eq!(config.layout.firmware_dir, "firmware");
        assert_eq!(config.layout.config_file, "config.yaml");
        assert_eq!(config.defaults.chip, "unknown");
        assert_eq!(config.defaults.min_version, "0.0.0");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [publish]
            base_url = "https://cdn.example.com/ota/"

            [defaults]
            chip = "esp32s3"
            "#,
        )
        .unwrap()
        .validate()
        .unwrap();

        assert_eq!(config.publish.base_url, "https://cdn.example.com/ota");
        assert_eq!(config.schema_url(), "https://cdn.example.com/ota/manifest.schema.json");
        assert_eq!(config.defaults.chip, "esp32s3");
        assert_eq!(config.defaults.min_version, "0.0.0");
        assert_eq!(config.layout.spiffs_file, "spiffs.bin");
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let config = Config::from_toml("[publish]\nbase_url = \"ftp://example.com\"\n").unwrap();
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_default_min_version() {
        let config = Config::from_toml("[defaults]\nmin_version = \"v1\"\n").unwrap();
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_rejects_nested_layout_entry() {
        let config = Config::from_toml("[layout]\nfirmware_dir = \"a/b\"\n").unwrap();
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert!(matches!(Config::from_toml("[publish"), Err(SyncError::Config(_))));
    }
}
