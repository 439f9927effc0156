//! Run manifest: the one file a caller points the engine at.
//!
//! A manifest names the snapshot (and optional params) by local path and may
//! pin an expected snapshot digest. Paths are resolved relative to the
//! manifest's own directory. URL-style paths are rejected; runs are offline.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{looks_like_url_strict, IoError, IoResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Optional caller-chosen label, echoed into the run record.
    #[serde(default)]
    pub id: Option<String>,
    pub snapshot_path: String,
    #[serde(default)]
    pub params_path: Option<String>,
    #[serde(default)]
    pub expect: Option<Expectations>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectations {
    #[serde(default)]
    pub snapshot_sha256: Option<String>,
}

/// Manifest with its relative paths resolved against the manifest directory.
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub id: Option<String>,
    pub snapshot_path: PathBuf,
    pub params_path: Option<PathBuf>,
    pub expected_snapshot_sha256: Option<String>,
}

/// Parse, validate, and resolve a manifest file.
pub fn load_manifest(path: &Path) -> IoResult<ResolvedManifest> {
    let text = fs::read_to_string(path)
        .map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let man: Manifest = serde_json::from_str(&text)
        .map_err(|e| IoError::Manifest(format!("{}: {e}", path.display())))?;

    let base = path
        .parent()
        .ok_or_else(|| IoError::Manifest("manifest path has no parent".to_string()))?;

    validate_local_path("snapshot_path", &man.snapshot_path)?;
    if let Some(pp) = &man.params_path {
        validate_local_path("params_path", pp)?;
    }
    let expected = match man.expect.as_ref().and_then(|e| e.snapshot_sha256.as_ref()) {
        Some(d) => {
            if !is_sha256_hex(d) {
                return Err(IoError::Manifest(
                    "expect.snapshot_sha256 must be 64 lowercase hex chars".to_string(),
                ));
            }
            Some(d.clone())
        }
        None => None,
    };

    let snapshot_path = resolve_existing_file(base, &man.snapshot_path)?;
    let params_path = match &man.params_path {
        Some(pp) => Some(resolve_existing_file(base, pp)?),
        None => None,
    };

    Ok(ResolvedManifest {
        id: man.id,
        snapshot_path,
        params_path,
        expected_snapshot_sha256: expected,
    })
}

fn validate_local_path(field: &str, value: &str) -> IoResult<()> {
    if value.trim().is_empty() {
        return Err(IoError::Manifest(format!("{field} must not be empty")));
    }
    if looks_like_url_strict(value) {
        return Err(IoError::Manifest(format!(
            "{field} must be a local path, not a URL: '{value}'"
        )));
    }
    Ok(())
}

fn resolve_existing_file(base: &Path, rel: &str) -> IoResult<PathBuf> {
    let p = base.join(rel);
    if !p.is_file() {
        return Err(IoError::Path(format!("not a file: {}", p.display())));
    }
    Ok(p)
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
