//! Reading the previous manifest and writing the new one.

use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::schema::ManifestSchema;
use super::types::{render_json, KNOWN_KEYS};
use crate::utils::{Result, SyncError};
use crate::version::FirmwareVersion;

/// Hand-curated state recovered from an existing manifest
#[derive(Debug, Clone, Default)]
pub struct PriorManifest {
    pub schema: Option<String>,
    pub chip: Option<String>,
    pub min_version: Option<FirmwareVersion>,
    pub version: Option<FirmwareVersion>,

    /// Keys the synchronizer does not own
    pub extra: Map<String, Value>,

    /// Exact file contents, for change detection
    pub text: String,
}

/// Load the manifest at `path`.
///
/// Returns `Ok(None)` when no manifest exists yet. A manifest that exists but
/// cannot be read as a JSON object, or whose curated fields are malformed, is
/// an error: rewriting it would silently drop hand-maintained values.
pub fn load_prior(path: &Path) -> Result<Option<PriorManifest>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let invalid = |reason: String| SyncError::InvalidManifest {
        path: path.to_path_buf(),
        reason,
    };

    let value: Value = serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(invalid("top level is not an object".to_string()));
    };

    let schema = take_string(&mut object, "$schema").map_err(invalid)?;
    let chip = take_string(&mut object, "chip").map_err(invalid)?;
    let min_version = take_string(&mut object, "min_version")
        .map_err(invalid)?
        .map(|raw| FirmwareVersion::parse(&raw))
        .transpose()
        .map_err(|e| invalid(format!("min_version: {}", e)))?;

    // A stale `version` only feeds a regression warning, so a bad one is dropped.
    let version = take_string(&mut object, "version")
        .ok()
        .flatten()
        .and_then(|raw| FirmwareVersion::parse(&raw).ok());

    // shift_remove keeps the remaining keys in file order.
    for key in KNOWN_KEYS {
        object.shift_remove(key);
    }

    Ok(Some(PriorManifest {
        schema,
        chip,
        min_version,
        version,
        extra: object,
        text,
    }))
}

fn take_string(object: &mut Map<String, Value>, key: &str) -> std::result::Result<Option<String>, String> {
    match object.shift_remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(format!("{} must be a string, found {}", key, other)),
    }
}

/// Result of [`persist`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Rendered text matches the previous file byte for byte
    Unchanged,
    /// File written
    Written,
    /// File differs but `dry_run` prevented the write
    Pending,
}

/// Validate `value` against the manifest schema and write it to `path` if it
/// differs from `previous`.
///
/// Nothing touches the filesystem unless validation passes.
pub fn persist(
    schema: &ManifestSchema,
    path: &Path,
    value: &Value,
    previous: Option<&str>,
    dry_run: bool,
) -> Result<WriteOutcome> {
    schema.validate(value)?;
    let text = render_json(value)?;

    if previous == Some(text.as_str()) {
        return Ok(WriteOutcome::Unchanged);
    }
    if dry_run {
        return Ok(WriteOutcome::Pending);
    }

    write_atomic(path, text.as_bytes())?;
    Ok(WriteOutcome::Written)
}

/// Write via a sibling temporary file and rename, so readers never observe a
/// partially written manifest.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp_path = temp_path_for(path);

    let result = (|| {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
