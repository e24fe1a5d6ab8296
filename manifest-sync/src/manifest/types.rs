//! Manifest document types.
//!
//! One manifest per device, serialized as `firmware/<device>.manifest.json`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fs::digest::FileDigest;
use crate::version::FirmwareVersion;

/// Keys owned by the synchronizer; anything else in a manifest is preserved as-is.
pub const KNOWN_KEYS: [&str; 8] = [
    "$schema",
    "name",
    "chip",
    "version",
    "min_version",
    "firmware",
    "spiffs",
    "config",
];

/// Device manifest.
///
/// Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    pub name: String,

    /// Hardware identifier, curated by hand
    pub chip: String,

    pub version: FirmwareVersion,

    /// Devices running below this version must not jump straight to `version`
    pub min_version: FirmwareVersion,

    pub firmware: BinaryArtifact,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spiffs: Option<BinaryArtifact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigArtifact>,

    /// Unrecognized keys carried over from the previous manifest
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A flashable artifact (firmware or filesystem image)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryArtifact {
    pub url: String,
    pub sha256: String,
    pub size: u64,
}

/// The device config file. No size is recorded since it is parsed, not flashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigArtifact {
    pub url: String,
    pub sha256: String,
}

impl BinaryArtifact {
    pub fn new(url: String, digest: FileDigest) -> Self {
        Self {
            url,
            sha256: digest.sha256,
            size: digest.size,
        }
    }
}

impl ConfigArtifact {
    pub fn new(url: String, digest: FileDigest) -> Self {
        Self {
            url,
            sha256: digest.sha256,
        }
    }
}

/// Render any manifest value in the canonical on-disk format.
pub fn render_json(value: &Value) -> serde_json::Result<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        Manifest {
            schema: Some("https://example.com/manifest.schema.json".to_string()),
            name: "lamp".to_string(),
            chip: "esp32".to_string(),
            version: FirmwareVersion::new(1, 2, 0),
            min_version: FirmwareVersion::new(1, 0, 0),
            firmware: BinaryArtifact {
                url: "https://example.com/firmware/lamp/v1.2.0/firmware.bin".to_string(),
                sha256: "a".repeat(64),
                size: 42,
            },
            spiffs: None,
            config: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_key_order_and_trailing_newline() {
        let text = render_json(&serde_json::to_value(sample()).unwrap()).unwrap();
        assert!(text.starts_with("{\n  \"$schema\": "));
        assert!(text.ends_with("}\n"));

        let positions: Vec<usize> = ["\"name\"", "\"chip\"", "\"version\"", "\"min_version\"", "\"firmware\""]
            .iter()
            .map(|k| text.find(k).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_optional_artifacts_are_omitted() {
        let value = serde_json::to_value(sample()).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("spiffs"));
        assert!(!obj.contains_key("config"));
    }

    #[test]
    fn test_extra_keys_survive() {
        let mut manifest = sample();
        manifest
            .extra
            .insert("description".to_string(), Value::String("hallway lamp".to_string()));

        let text = render_json(&serde_json::to_value(&manifest).unwrap()).unwrap();
        let back: Manifest = serde_json::from_str(&text).unwrap();
        assert_eq!(back.extra.get("description"), Some(&Value::String("hallway lamp".to_string())));
        assert_eq!(back, manifest);
    }
}
