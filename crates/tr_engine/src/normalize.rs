//! Source normalization and the party-index shift-correction heuristic.
//!
//! Upstream ingestion occasionally off-by-ones party-list indices. Two
//! narrowly-scoped patterns are corrected here; everything else passes
//! through untouched:
//!
//! 1. *Phantom tail*: a party-list map with ≥ 50 entries all inside 2..=58,
//!    no entry 1 but an entry 58, is a known encoding bug (a phantom 58th
//!    row pushed every index up by one). Shift everything down by 1.
//! 2. *Overlap evidence*: if shifting the numbers down by one makes them
//!    agree with the Official party set for the same key clearly better
//!    (shifted overlap ≥ direct overlap + 2, and ≥ 3 absolute), shift.
//!
//! Thresholds are deliberately strict: corrupting already-correct data is
//! worse than leaving a shifted record unshifted. Every applied shift is
//! returned as a [`ShiftAudit`] - the correction is never silent.

use alloc::collections::{BTreeMap, BTreeSet};
use core::fmt;

use tr_core::keys::{DistrictFormKey, FormType};
use tr_core::records::{SourceName, SourceRecord};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Phantom-tail pattern bounds.
const PHANTOM_MIN_ENTRIES: usize = 50;
const PHANTOM_LOW: u16 = 2;
const PHANTOM_HIGH: u16 = 58;

/// Overlap-evidence margins.
const SHIFT_MARGIN: usize = 2;
const SHIFT_FLOOR: usize = 3;

/// Which rule justified an applied shift.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ShiftRule {
    PhantomTail,
    OverlapEvidence,
}

impl fmt::Display for ShiftRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftRule::PhantomTail => f.write_str("phantom_tail"),
            ShiftRule::OverlapEvidence => f.write_str("overlap_evidence"),
        }
    }
}

/// Audit trail entry for one applied shift.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShiftAudit {
    pub key: DistrictFormKey,
    pub source: SourceName,
    pub rule: ShiftRule,
    pub entries: usize,
    pub direct_overlap: usize,
    pub shifted_overlap: usize,
}

/// Normalize one source record for a key: apply the shift heuristic when the
/// evidence clears the thresholds, otherwise return the record untouched.
///
/// `official_numbers` is the party-number set the Official source reported
/// for the same key (empty when the Official source is absent). The shift
/// only ever applies to party-list forms, and never to the Official source
/// itself.
pub fn normalize_source(
    key: &DistrictFormKey,
    mut record: SourceRecord,
    official_numbers: &BTreeSet<u16>,
) -> (SourceRecord, Option<ShiftAudit>) {
    if key.form != FormType::PartyList
        || record.source == SourceName::Official
        || record.votes.is_empty()
    {
        return (record, None);
    }

    let entries = record.votes.len();
    let direct_overlap = record
        .votes
        .keys()
        .filter(|n| official_numbers.contains(n))
        .count();
    let shifted_overlap = record
        .votes
        .keys()
        .filter(|&&n| n >= 2 && official_numbers.contains(&(n - 1)))
        .count();

    let rule = if is_phantom_tail(&record.votes) {
        Some(ShiftRule::PhantomTail)
    } else if shifted_overlap >= direct_overlap + SHIFT_MARGIN
        && shifted_overlap >= SHIFT_FLOOR
        && record.votes.keys().next().map_or(false, |&n| n >= 2)
    {
        // A present party 0 or 1 would shift below 1, which no ballot form
        // carries; with either on the sheet, the indices cannot all be off
        // by one.
        Some(ShiftRule::OverlapEvidence)
    } else {
        None
    };

    let Some(rule) = rule else {
        return (record, None);
    };

    let mut shifted: BTreeMap<u16, u64> = BTreeMap::new();
    for (&number, &count) in &record.votes {
        shifted.insert(number - 1, count);
    }
    record.votes = shifted;

    let audit = ShiftAudit {
        key: key.clone(),
        source: record.source,
        rule,
        entries,
        direct_overlap,
        shifted_overlap,
    };
    (record, Some(audit))
}

/// The phantom-58-entry encoding bug: every index inside 2..=58, party 1
/// absent, party 58 present, and enough entries that the pattern cannot be
/// coincidence.
fn is_phantom_tail(votes: &BTreeMap<u16, u64>) -> bool {
    votes.len() >= PHANTOM_MIN_ENTRIES
        && !votes.contains_key(&1)
        && votes.contains_key(&PHANTOM_HIGH)
        && votes.keys().all(|&n| (PHANTOM_LOW..=PHANTOM_HIGH).contains(&n))
}
