//! Manifest JSON schema validation.
//!
//! The schema is compiled into the binary and also published next to the
//! manifests, which reference it through their `$schema` key.

use jsonschema::Validator;
use serde_json::Value;

use crate::utils::{Result, SyncError};

/// Raw schema document
pub const MANIFEST_SCHEMA: &str = include_str!("../../manifest.schema.json");

/// Compiled manifest schema
pub struct ManifestSchema {
    validator: Validator,
}

impl ManifestSchema {
    pub fn new() -> Result<Self> {
        let schema: Value = serde_json::from_str(MANIFEST_SCHEMA)?;
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| SyncError::SchemaValidation(vec![format!("invalid manifest schema: {}", e)]))?;
        Ok(Self { validator })
    }

    /// Validate a manifest document, collecting every violation.
    pub fn validate(&self, instance: &Value) -> Result<()> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SyncError::SchemaValidation(errors))
        }
    }
}

impl std::fmt::Debug for ManifestSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestSchema").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "$schema": "https://example.com/manifest.schema.json",
            "name": "lamp",
            "chip": "esp32",
            "version": "1.2.0",
            "min_version": "1.0.0",
            "firmware": {
                "url": "https://example.com/firmware/lamp/v1.2.0/firmware.bin",
                "sha256": "0".repeat(64),
                "size": 1024
            },
            "config": {
                "url": "https://example.com/config/lamp/config.yaml",
                "sha256": "f".repeat(64)
            },
            "description": "extra keys are allowed"
        })
    }

    #[test]
    fn test_accepts_complete_manifest() {
        let schema = ManifestSchema::new().unwrap();
        schema.validate(&valid()).unwrap();
    }

    #[test]
    fn test_rejects_firmware_without_sha256() {
        let schema = ManifestSchema::new().unwrap();
        let mut manifest = valid();
        manifest["firmware"].as_object_mut().unwrap().remove("sha256");

        match schema.validate(&manifest) {
            Err(SyncError::SchemaValidation(errors)) => {
                assert!(errors.iter().any(|e| e.contains("sha256")));
            }
            other => panic!("expected schema failure, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_fields() {
        let schema = ManifestSchema::new().unwrap();

        let mut bad_version = valid();
        bad_version["version"] = json!("v1.2.0");
        assert!(schema.validate(&bad_version).is_err());

        let mut bad_digest = valid();
        bad_digest["firmware"]["sha256"] = json!("ABC");
        assert!(schema.validate(&bad_digest).is_err());

        let mut negative_size = valid();
        negative_size["firmware"]["size"] = json!(-1);
        assert!(schema.validate(&negative_size).is_err());

        let mut config_with_size = valid();
        config_with_size["config"]["size"] = json!(10);
        assert!(schema.validate(&config_with_size).is_err());

        let mut missing_chip = valid();
        missing_chip.as_object_mut().unwrap().remove("chip");
        assert!(schema.validate(&missing_chip).is_err());
    }
}
