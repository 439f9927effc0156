//! Skew detection between the paired form types of one district.
//!
//! Both ballot forms of a district are marked by the same voters, so their
//! same-source totals are expected to reconcile up to spoiled-ballot noise.
//! The raw difference is always retained; the *reported* difference is
//! suppressed to zero inside the noise tolerance so small counting noise
//! does not surface as review work.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use tr_core::keys::DistrictKey;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Same-source totals for the two form types of one district. `None` when
/// the source did not report all three ballot counters for that form.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FormTotals {
    pub constituency: Option<u64>,
    pub party_list: Option<u64>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SkewDirection {
    ConstituencyHigher,
    PartyListHigher,
    Balanced,
}

/// One reconciled district pair.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkewRecord {
    pub district: DistrictKey,
    pub constituency_total: u64,
    pub party_list_total: u64,
    /// `constituency − party_list`, kept for transparency.
    pub raw_diff: i64,
    /// Zero when `|raw_diff|` is within the noise tolerance.
    pub reported_diff: i64,
    pub within_tolerance: bool,
    pub direction: SkewDirection,
}

/// Detect skew across districts. Pairs missing either total are excluded.
/// Output is sorted by |reported diff| descending, then district key, for
/// deterministic review order.
pub fn detect_skew(
    totals: &BTreeMap<DistrictKey, FormTotals>,
    noise_tolerance: u64,
) -> Vec<SkewRecord> {
    let mut out: Vec<SkewRecord> = totals
        .iter()
        .filter_map(|(district, pair)| {
            let con = pair.constituency?;
            let pl = pair.party_list?;
            let raw_diff = crate::compare::signed_diff(con, pl);
            let within_tolerance = raw_diff.unsigned_abs() <= noise_tolerance;
            let reported_diff = if within_tolerance { 0 } else { raw_diff };
            let direction = if reported_diff > 0 {
                SkewDirection::ConstituencyHigher
            } else if reported_diff < 0 {
                SkewDirection::PartyListHigher
            } else {
                SkewDirection::Balanced
            };
            Some(SkewRecord {
                district: district.clone(),
                constituency_total: con,
                party_list_total: pl,
                raw_diff,
                reported_diff,
                within_tolerance,
                direction,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.reported_diff
            .unsigned_abs()
            .cmp(&a.reported_diff.unsigned_abs())
            .then_with(|| a.district.cmp(&b.district))
    });
    out
}
