//! Pipeline surface: ingest → normalize → consistency → compare → skew →
//! score → coverage → apportion → build artifacts.
//!
//! This crate stays wire-free: JSON, schema and hashing are delegated to
//! `tr_io`, the math lives in `tr_engine`. Everything here is sequencing
//! and artifact assembly, in deterministic key order.

use std::path::Path;

pub mod ingest;
pub mod reconcile;
pub mod run_record;

pub use ingest::{ingest_snapshot, IngestIssue, IngestedSnapshot};
pub use reconcile::{reconcile, ReconOutputs, RunStats};
pub use run_record::{
    build_result_doc, build_run_record, ResultDoc, RunInputs, RunOutputs, RunRecordDoc,
};

use tr_io::loader::{self, LoadedSnapshot};
use tr_io::manifest;

/// Engine identifiers echoed into every run record.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineMeta {
    pub name: String,
    pub version: String,
    pub build: String,
}

/// Engine identifiers for this build.
pub fn engine_identifiers() -> EngineMeta {
    EngineMeta {
        name: "trecon".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: "dev".to_string(),
    }
}

/// Single error surface for pipeline orchestration.
#[derive(Debug)]
pub enum PipelineError {
    Io(String),
    Schema(String),
    Validate(String),
    Build(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Io(m) => write!(f, "io: {m}"),
            PipelineError::Schema(m) => write!(f, "schema: {m}"),
            PipelineError::Validate(m) => write!(f, "validate: {m}"),
            PipelineError::Build(m) => write!(f, "build: {m}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<tr_io::IoError> for PipelineError {
    fn from(e: tr_io::IoError) -> Self {
        use PipelineError::*;
        match e {
            tr_io::IoError::Schema(m) => Schema(m),
            tr_io::IoError::Json { pointer, msg } => Schema(format!("json {pointer}: {msg}")),
            tr_io::IoError::Manifest(m) => Validate(format!("manifest: {m}")),
            tr_io::IoError::Invalid(m) => Validate(m),
            tr_io::IoError::Canon(m) => Build(format!("canon: {m}")),
            tr_io::IoError::Hash(m) => Build(format!("hash: {m}")),
            tr_io::IoError::Path(m) => Io(m),
        }
    }
}

/// Everything one run produces.
#[derive(Debug)]
pub struct PipelineOutputs {
    pub result: ResultDoc,
    pub run_record: RunRecordDoc,
}

/// Run the full pipeline over an already-loaded snapshot.
///
/// `timestamp_utc` is caller-supplied (strict `YYYY-MM-DDTHH:MM:SSZ`) so
/// that the engine itself stays clock-free and replayable.
pub fn run_loaded(
    loaded: &LoadedSnapshot,
    manifest_id: Option<&str>,
    timestamp_utc: &str,
) -> Result<PipelineOutputs, PipelineError> {
    loaded
        .params
        .validate()
        .map_err(|e| PipelineError::Validate(e.to_string()))?;

    let ingested = ingest_snapshot(&loaded.snapshot);
    let outputs = reconcile(&ingested, &loaded.params);

    let result = build_result_doc(&outputs, &loaded.params)?;
    let run_record = build_run_record(
        engine_identifiers(),
        manifest_id,
        &loaded.snapshot_digest,
        &loaded.params,
        &result,
        timestamp_utc,
    )?;

    Ok(PipelineOutputs { result, run_record })
}

/// Convenience entry: resolve a manifest, load its artifacts, run.
pub fn run_from_manifest_path<P: AsRef<Path>>(
    path: P,
    timestamp_utc: &str,
) -> Result<PipelineOutputs, PipelineError> {
    let resolved = manifest::load_manifest(path.as_ref())?;
    let loaded = loader::load_from_manifest(&resolved)?;
    run_loaded(&loaded, resolved.id.as_deref(), timestamp_utc)
}
