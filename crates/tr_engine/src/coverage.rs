//! Coverage and quality reporting.
//!
//! Per key: which sources reported at all, plus a 0..=100 confidence score.
//! The score starts at 50, earns credit for each present source (Primary
//! weighs double), and pays penalties for a weak Primary extraction or a
//! large Primary↔Independent gap.

use alloc::vec::Vec;

use tr_core::keys::DistrictFormKey;
use tr_core::params::ReconParams;
use tr_core::records::{SourceName, SourceSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const BASE_SCORE: i32 = 50;
const PRIMARY_CREDIT: i32 = 20;
const SECONDARY_CREDIT: i32 = 10;
const WEAK_PRIMARY_PENALTY: i32 = 15;
const GAP_HIGH_PENALTY: i32 = 20;
const GAP_WARN_PENALTY: i32 = 10;

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoverageRecord {
    pub key: DistrictFormKey,
    pub has_primary: bool,
    pub has_official: bool,
    pub has_volunteer: bool,
    pub has_independent: bool,
    pub confidence: u8,
}

impl CoverageRecord {
    pub fn fully_covered(&self) -> bool {
        self.has_primary && self.has_official && self.has_volunteer && self.has_independent
    }
}

/// Coverage summary plus the gap list: keys missing at least one source.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoverageReport {
    pub records: Vec<CoverageRecord>,
    pub gaps: Vec<DistrictFormKey>,
}

/// Assess one key. `gap_primary_independent` comes from the comparator so
/// the same signed gap feeds scoring, coverage and review context.
pub fn assess_coverage(
    key: &DistrictFormKey,
    sources: &SourceSet,
    gap_primary_independent: Option<i64>,
    params: &ReconParams,
) -> CoverageRecord {
    let mut score = BASE_SCORE;

    let has_primary = sources.has(SourceName::Primary);
    if has_primary {
        score += PRIMARY_CREDIT;
    }
    for name in [SourceName::Official, SourceName::Volunteer, SourceName::Independent] {
        if sources.has(name) {
            score += SECONDARY_CREDIT;
        }
    }

    if sources
        .get(SourceName::Primary)
        .map(|r| r.weak)
        .unwrap_or(false)
    {
        score -= WEAK_PRIMARY_PENALTY;
    }

    if let Some(gap) = gap_primary_independent {
        let magnitude = gap.unsigned_abs();
        if magnitude >= params.gap_high {
            score -= GAP_HIGH_PENALTY;
        } else if magnitude >= params.gap_warn {
            score -= GAP_WARN_PENALTY;
        }
    }

    CoverageRecord {
        key: key.clone(),
        has_primary,
        has_official: sources.has(SourceName::Official),
        has_volunteer: sources.has(SourceName::Volunteer),
        has_independent: sources.has(SourceName::Independent),
        confidence: score.clamp(0, 100) as u8,
    }
}

/// Assemble the report: records in key order, gaps for any missing source.
pub fn build_coverage_report(mut records: Vec<CoverageRecord>) -> CoverageReport {
    records.sort_by(|a, b| a.key.cmp(&b.key));
    let gaps = records
        .iter()
        .filter(|r| !r.fully_covered())
        .map(|r| r.key.clone())
        .collect();
    CoverageReport { records, gaps }
}
