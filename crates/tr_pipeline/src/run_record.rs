//! Artifact assembly: the result document and the run record, each with a
//! content-addressed identifier over canonical bytes.

use serde::Serialize;

use tr_core::params::ReconParams;
use tr_io::{canonical_json, hasher};

use crate::reconcile::ReconOutputs;
use crate::{EngineMeta, PipelineError};

/// The reconciliation result artifact. `id` is `REC:` plus the SHA-256 of
/// the document's canonical bytes without the id field.
#[derive(Debug, Clone, Serialize)]
pub struct ResultDoc {
    pub id: String,
    pub sha256: String,
    pub params: ReconParams,
    pub outputs: ReconOutputs,
}

/// Input digests echoed into the run record.
#[derive(Debug, Clone, Serialize)]
pub struct RunInputs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_id: Option<String>,
    pub snapshot_sha256: String,
}

/// Produced artifacts, by id and digest.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutputs {
    pub result_id: String,
    pub result_sha256: String,
}

/// One run, replayable from its inputs: engine identifiers, input digests,
/// the params actually used, and the produced artifact digests.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecordDoc {
    pub id: String,
    pub timestamp_utc: String,
    pub engine: EngineMeta,
    pub inputs: RunInputs,
    pub params: ReconParams,
    pub outputs: RunOutputs,
}

pub fn build_result_doc(
    outputs: &ReconOutputs,
    params: &ReconParams,
) -> Result<ResultDoc, PipelineError> {
    #[derive(Serialize)]
    struct ResultNoId<'a> {
        params: &'a ReconParams,
        outputs: &'a ReconOutputs,
    }
    let no_id = ResultNoId { params, outputs };
    let bytes = canonical_json::to_canonical_bytes(&no_id).map_err(PipelineError::from)?;
    let sha256 = hasher::sha256_hex(&bytes);
    Ok(ResultDoc {
        id: hasher::result_id_from_canonical_bytes(&bytes),
        sha256,
        params: *params,
        outputs: outputs.clone(),
    })
}

pub fn build_run_record(
    engine: EngineMeta,
    manifest_id: Option<&str>,
    snapshot_sha256: &str,
    params: &ReconParams,
    result: &ResultDoc,
    timestamp_utc: &str,
) -> Result<RunRecordDoc, PipelineError> {
    let inputs = RunInputs {
        manifest_id: manifest_id.map(str::to_string),
        snapshot_sha256: snapshot_sha256.to_string(),
    };
    let outputs = RunOutputs {
        result_id: result.id.clone(),
        result_sha256: result.sha256.clone(),
    };

    #[derive(Serialize)]
    struct RunNoId<'a> {
        timestamp_utc: &'a str,
        engine: &'a EngineMeta,
        inputs: &'a RunInputs,
        params: &'a ReconParams,
        outputs: &'a RunOutputs,
    }
    let no_id = RunNoId {
        timestamp_utc,
        engine: &engine,
        inputs: &inputs,
        params,
        outputs: &outputs,
    };
    let bytes = canonical_json::to_canonical_bytes(&no_id).map_err(PipelineError::from)?;
    let id = hasher::run_id(timestamp_utc, &bytes).map_err(PipelineError::from)?;

    Ok(RunRecordDoc {
        id,
        timestamp_utc: timestamp_utc.to_string(),
        engine,
        inputs,
        params: *params,
        outputs,
    })
}
