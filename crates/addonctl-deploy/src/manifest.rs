//! Stamping the store manifest with a new version.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::clasp::VersionId;
use crate::config::VERSION_PLACEHOLDER;
use crate::error::{DeployError, DeployResult};

/// Rewrites `container_info.container_version`, `version`, and
/// `description` in a JSON manifest. Every other field is left alone and
/// keeps its position.
#[derive(Debug, Clone)]
pub struct ManifestPatcher {
    path: PathBuf,
    description_template: String,
}

impl ManifestPatcher {
    pub fn new(path: impl Into<PathBuf>, description_template: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description_template: description_template.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Patches the manifest file in place.
    ///
    /// The file is overwritten directly; no backup is kept.
    pub fn patch(&self, version: &VersionId) -> DeployResult<()> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            DeployError::io(format!("failed to read manifest {:?}", self.path), e)
        })?;

        let patched = patch_manifest(&content, version, &self.description_template)
            .map_err(|message| DeployError::ManifestFormat {
                path: self.path.clone(),
                message,
            })?;

        fs::write(&self.path, patched).map_err(|e| {
            DeployError::io(format!("failed to write manifest {:?}", self.path), e)
        })?;

        debug!("patched {:?} to version {}", self.path, version);
        Ok(())
    }
}

/// Returns `content` with the version fields set, pretty-printed with
/// 4-space indentation and no trailing newline.
pub fn patch_manifest(
    content: &str,
    version: &VersionId,
    description_template: &str,
) -> Result<String, String> {
    let mut manifest: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let root = manifest
        .as_object_mut()
        .ok_or_else(|| "manifest root is not a JSON object".to_string())?;

    let container_info = root
        .entry("container_info")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| "container_info is not a JSON object".to_string())?;
    container_info.insert(
        "container_version".to_string(),
        Value::String(version.to_string()),
    );

    root.insert("version".to_string(), Value::String(version.to_string()));
    root.insert(
        "description".to_string(),
        Value::String(description_template.replace(VERSION_PLACEHOLDER, version.as_str())),
    );

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    manifest.serialize(&mut ser).map_err(|e| e.to_string())?;
    String::from_utf8(buf).map_err(|e| e.to_string())
}
