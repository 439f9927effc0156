//! Snapshot and params loading: wire types, validation, typed conversion.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use tr_core::keys::FormType;
use tr_core::params::ReconParams;
use tr_core::records::{SourceName, SourceRecord};

use crate::canonical_json::canonical_value_bytes;
use crate::hasher::sha256_hex;
use crate::manifest::ResolvedManifest;
use crate::{IoError, IoResult};

/// Snapshot exactly as it appears on the wire. District keys are still raw;
/// normalization happens in the pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSnapshot {
    pub districts: Vec<RawDistrict>,
    #[serde(default)]
    pub party_names: BTreeMap<u16, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDistrict {
    pub province: String,
    pub district_number: i64,
    pub form_type: FormType,
    #[serde(default)]
    pub primary: Option<RawSourceBody>,
    #[serde(default)]
    pub official: Option<RawSourceBody>,
    #[serde(default)]
    pub volunteer: Option<RawSourceBody>,
    #[serde(default)]
    pub independent: Option<RawSourceBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSourceBody {
    #[serde(default)]
    pub valid_votes: Option<u64>,
    #[serde(default)]
    pub invalid_votes: Option<u64>,
    #[serde(default)]
    pub blank_votes: Option<u64>,
    #[serde(default)]
    pub votes: BTreeMap<u16, u64>,
    #[serde(default)]
    pub weak_flag: bool,
    #[serde(default)]
    pub station_count: Option<u32>,
}

impl RawSourceBody {
    pub fn into_record(self, source: SourceName) -> SourceRecord {
        SourceRecord {
            source,
            valid_votes: self.valid_votes,
            invalid_votes: self.invalid_votes,
            blank_votes: self.blank_votes,
            votes: self.votes,
            weak: self.weak_flag,
            station_count: self.station_count,
        }
    }
}

impl RawDistrict {
    /// Per-source bodies in canonical source order, present ones only.
    pub fn bodies(&self) -> impl Iterator<Item = (SourceName, &RawSourceBody)> {
        [
            (SourceName::Primary, self.primary.as_ref()),
            (SourceName::Official, self.official.as_ref()),
            (SourceName::Volunteer, self.volunteer.as_ref()),
            (SourceName::Independent, self.independent.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, body)| body.map(|b| (name, b)))
    }
}

/// Everything a run needs, loaded and digest-verified.
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub snapshot: RawSnapshot,
    /// SHA-256 of the snapshot's canonical JSON form.
    pub snapshot_digest: String,
    pub params: ReconParams,
}

/// Read and parse a snapshot file, returning it with its canonical digest.
pub fn load_snapshot(path: &Path) -> IoResult<(RawSnapshot, String)> {
    let text = fs::read_to_string(path)
        .map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let doc: Value = serde_json::from_str(&text).map_err(|e| IoError::Json {
        pointer: "/".to_string(),
        msg: format!("{}: {e}", path.display()),
    })?;

    #[cfg(feature = "schemaval")]
    crate::schema::validate_snapshot(&doc)?;

    let digest = sha256_hex(&canonical_value_bytes(&doc));
    let snapshot: RawSnapshot = serde_json::from_value(doc).map_err(|e| IoError::Json {
        pointer: "/".to_string(),
        msg: e.to_string(),
    })?;
    Ok((snapshot, digest))
}

/// Read a params file and run its domain checks.
pub fn load_params(path: &Path) -> IoResult<ReconParams> {
    let text = fs::read_to_string(path)
        .map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let params: ReconParams = serde_json::from_str(&text).map_err(|e| IoError::Json {
        pointer: "/".to_string(),
        msg: format!("{}: {e}", path.display()),
    })?;
    params
        .validate()
        .map_err(|e| IoError::Invalid(e.to_string()))?;
    Ok(params)
}

/// Load snapshot and params through a resolved manifest, checking any
/// pinned digest before returning.
pub fn load_from_manifest(man: &ResolvedManifest) -> IoResult<LoadedSnapshot> {
    let (snapshot, snapshot_digest) = load_snapshot(&man.snapshot_path)?;

    if let Some(expected) = &man.expected_snapshot_sha256 {
        if expected != &snapshot_digest {
            return Err(IoError::Manifest(format!(
                "snapshot digest mismatch: expected {expected}, got {snapshot_digest}"
            )));
        }
    }

    let params = match &man.params_path {
        Some(p) => load_params(p)?,
        None => ReconParams::default(),
    };

    Ok(LoadedSnapshot {
        snapshot,
        snapshot_digest,
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap_text() -> &'static str {
        r#"{
          "districts": [
            {
              "province": "Chiang Mai",
              "district_number": 3,
              "form_type": "party_list",
              "primary": {
                "valid_votes": 1000,
                "invalid_votes": 10,
                "blank_votes": 5,
                "votes": {"2": 600, "5": 400}
              },
              "official": {
                "votes": {"1": 580, "4": 420}
              }
            }
          ],
          "party_names": {"1": "Alpha", "2": "Beta"}
        }"#
    }

    #[test]
    fn loads_snapshot_and_converts_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("snap.json");
        fs::write(&p, snap_text()).unwrap();

        let (snap, digest) = load_snapshot(&p).unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(snap.districts.len(), 1);
        assert_eq!(snap.party_names.get(&1).map(String::as_str), Some("Alpha"));

        let d = &snap.districts[0];
        let sources: Vec<SourceName> = d.bodies().map(|(n, _)| n).collect();
        assert_eq!(sources, vec![SourceName::Primary, SourceName::Official]);

        let rec = d.primary.clone().unwrap().into_record(SourceName::Primary);
        assert_eq!(rec.total(), Some(1015));
        assert_eq!(rec.sum_of_parts(), 1000);
    }

    #[test]
    fn snapshot_digest_ignores_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        fs::write(&a, r#"{"districts": [], "party_names": {}}"#).unwrap();
        fs::write(&b, r#"{"party_names": {},   "districts": []}"#).unwrap();
        assert_eq!(load_snapshot(&a).unwrap().1, load_snapshot(&b).unwrap().1);
    }

    #[test]
    fn manifest_digest_pin_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("snap.json");
        fs::write(&p, snap_text()).unwrap();
        let (_, real) = load_snapshot(&p).unwrap();

        let ok = ResolvedManifest {
            id: None,
            snapshot_path: p.clone(),
            params_path: None,
            expected_snapshot_sha256: Some(real),
        };
        assert!(load_from_manifest(&ok).is_ok());

        let bad = ResolvedManifest {
            id: None,
            snapshot_path: p,
            params_path: None,
            expected_snapshot_sha256: Some("0".repeat(64)),
        };
        assert!(matches!(
            load_from_manifest(&bad).unwrap_err(),
            IoError::Manifest(_)
        ));
    }

    #[test]
    fn bad_params_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("params.json");
        fs::write(&p, r#"{"total_seats": 0}"#).unwrap();
        assert!(matches!(load_params(&p).unwrap_err(), IoError::Invalid(_)));
    }
}
