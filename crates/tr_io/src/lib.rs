//! tr_io - single-source-of-truth I/O crate for the tally-recon engine.
//!
//! The engine itself is I/O-free; everything that touches the filesystem or
//! raw JSON lives here. This is also the single choke point where hard
//! contract violations (negative counts, non-integer numerics, malformed
//! documents) are rejected before they can reach a downstream component.
//!
//! - Shared error type ([`IoError`]) with `From` conversions used across
//!   the file modules.
//! - No inline implementations: the file modules are the source of truth.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for tr_io (used by canonical_json/hasher/loader/manifest).
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (read, create_dir_all, rename, fsync).
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON shape errors with an optional JSON Pointer.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// JSON Schema validation failures.
    #[error("schema error: {0}")]
    Schema(String),

    /// Manifest shape / offline-policy / digest-expectation failures.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Canonicalization failures.
    #[error("canonicalization error: {0}")]
    Canon(String),

    /// Hashing / ID-builder failures.
    #[error("hash error: {0}")]
    Hash(String),

    /// Generic validation / invariants (e.g. params domain checks).
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type IoResult<T> = Result<T, IoError>;

/* ---------------- From conversions (used by file modules) ---------------- */

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json doesn't keep a pointer; default to root. Callers may
        // enrich this at higher layers.
        IoError::Json {
            pointer: "/".to_string(),
            msg: e.to_string(),
        }
    }
}

/* ---------------- Public modules (single source of truth) ---------------- */

pub mod canonical_json;
pub mod hasher;
pub mod loader;
pub mod manifest;

#[cfg(feature = "schemaval")]
pub mod schema;

/// Returns true if `s` looks like a URL (any `<scheme>://`). The loader
/// follows a strict offline posture and rejects such paths early.
#[inline]
pub fn looks_like_url_strict(s: &str) -> bool {
    s.trim().contains("://")
}

pub mod prelude {
    pub use crate::{looks_like_url_strict, IoError, IoResult};
    pub use crate::loader::{
        load_from_manifest, load_params, load_snapshot, LoadedSnapshot, RawDistrict, RawSnapshot,
        RawSourceBody,
    };
    pub use crate::manifest::{load_manifest, Manifest, ResolvedManifest};
}
