//! SHA-256 hashing and formatted identifiers.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical_json::to_canonical_bytes;
use crate::{IoError, IoResult};

/// Lowercase hex SHA-256 of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// SHA-256 of the canonical JSON form of a serializable value.
pub fn sha256_canonical<T: Serialize>(value: &T) -> IoResult<String> {
    let bytes = to_canonical_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

/// Streamed SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> IoResult<String> {
    let mut f = File::open(path)?;
    let mut h = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        h.update(&buf[..n]);
    }
    Ok(hex::encode(h.finalize()))
}

/// Reconciliation result identifier: `REC:` + full 64-hex digest.
pub fn result_id_from_canonical_bytes(bytes: &[u8]) -> String {
    format!("REC:{}", sha256_hex(bytes))
}

/// Run identifier: `RUN:<timestamp>-<first 16 hex of digest>`.
///
/// The timestamp must be strict `YYYY-MM-DDTHH:MM:SSZ`.
pub fn run_id(timestamp_utc: &str, bytes: &[u8]) -> IoResult<String> {
    if !is_ts_utc_z(timestamp_utc) {
        return Err(IoError::Hash(format!(
            "run timestamp must be YYYY-MM-DDTHH:MM:SSZ, got '{timestamp_utc}'"
        )));
    }
    let digest = sha256_hex(bytes);
    Ok(format!("RUN:{}-{}", timestamp_utc, &digest[..16]))
}

/// Strict `YYYY-MM-DDTHH:MM:SSZ` shape check (no offsets, no fractions).
pub fn is_ts_utc_z(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() != 20 {
        return false;
    }
    for (i, &c) in b.iter().enumerate() {
        let ok = match i {
            4 | 7 => c == b'-',
            10 => c == b'T',
            13 | 16 => c == b':',
            19 => c == b'Z',
            _ => c.is_ascii_digit(),
        };
        if !ok {
            return false;
        }
    }
    true
}
