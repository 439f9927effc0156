//! Irregularity scoring: severity-tiered, ranked anomaly list.
//!
//! Independent signals accumulate an additive severity per key; the tier
//! buckets the score for human review. The Volunteer distance flag is
//! informational (weight 0) - volunteer coverage is too uneven to push a
//! key into a review tier on its own.

use alloc::vec::Vec;
use core::fmt;

use tr_core::keys::DistrictFormKey;
use tr_core::params::ReconParams;
use tr_core::records::SourceRecord;

use crate::compare::ComparisonResult;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Severity weights per signal.
const SEV_GAP_HIGH: u32 = 3;
const SEV_GAP_WARN: u32 = 2;
const SEV_INVALID_BLANK: u32 = 2;
const SEV_WINNER_DISAGREEMENT: u32 = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IrregularityFlag {
    HighDeltaIndependent,
    DeltaIndependent,
    HighInvalidBlankRatio,
    WinnerDisagreement,
    VolunteerFarFromPrimary,
}

impl IrregularityFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            IrregularityFlag::HighDeltaIndependent => "high_delta_independent",
            IrregularityFlag::DeltaIndependent => "delta_independent",
            IrregularityFlag::HighInvalidBlankRatio => "high_invalid_blank_ratio",
            IrregularityFlag::WinnerDisagreement => "winner_disagreement",
            IrregularityFlag::VolunteerFarFromPrimary => "volunteer_far_from_primary",
        }
    }
}

impl fmt::Display for IrregularityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review priority bucket.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Tier {
    P1,
    P2,
    P3,
}

impl Tier {
    /// Severity 0 carries no tier - the key is excluded from the list.
    fn from_severity(severity: u32) -> Option<Tier> {
        match severity {
            0 => None,
            1..=2 => Some(Tier::P3),
            3..=4 => Some(Tier::P2),
            _ => Some(Tier::P1),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::P1 => f.write_str("P1"),
            Tier::P2 => f.write_str("P2"),
            Tier::P3 => f.write_str("P3"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IrregularityRecord {
    pub key: DistrictFormKey,
    pub severity: u32,
    pub tier: Tier,
    /// Triggered flags in scoring order.
    pub flags: Vec<IrregularityFlag>,
    /// Echoed for ranking and review context.
    pub gap_primary_independent: Option<i64>,
}

/// Score one key. Returns `None` when no scored signal fired (informational
/// flags alone do not produce a record of severity 0 - they do produce a
/// record when attached to a scored one).
pub fn score_key(
    comparison: &ComparisonResult,
    primary: Option<&SourceRecord>,
    params: &ReconParams,
) -> Option<IrregularityRecord> {
    let mut severity = 0u32;
    let mut flags: Vec<IrregularityFlag> = Vec::new();

    if let Some(gap) = comparison.gap_primary_independent {
        let magnitude = gap.unsigned_abs();
        if magnitude >= params.gap_high {
            severity += SEV_GAP_HIGH;
            flags.push(IrregularityFlag::HighDeltaIndependent);
        } else if magnitude >= params.gap_warn {
            severity += SEV_GAP_WARN;
            flags.push(IrregularityFlag::DeltaIndependent);
        }
    }

    if let Some(rec) = primary {
        if invalid_blank_ratio_at_least(rec, params.invalid_blank_ratio_pct) {
            severity += SEV_INVALID_BLANK;
            flags.push(IrregularityFlag::HighInvalidBlankRatio);
        }
    }

    if winners_disagree(comparison) {
        severity += SEV_WINNER_DISAGREEMENT;
        flags.push(IrregularityFlag::WinnerDisagreement);
    }

    if let Some(gap) = comparison.gap_primary_volunteer {
        if gap.unsigned_abs() >= params.volunteer_gap {
            // Informational: recorded, not scored.
            flags.push(IrregularityFlag::VolunteerFarFromPrimary);
        }
    }

    let tier = Tier::from_severity(severity)?;
    Some(IrregularityRecord {
        key: comparison.key.clone(),
        severity,
        tier,
        flags,
        gap_primary_independent: comparison.gap_primary_independent,
    })
}

/// Rank for review: severity desc, |gap(Primary, Independent)| desc, key asc.
pub fn rank_irregularities(mut records: Vec<IrregularityRecord>) -> Vec<IrregularityRecord> {
    records.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| gap_magnitude(b).cmp(&gap_magnitude(a)))
            .then_with(|| a.key.cmp(&b.key))
    });
    records
}

fn gap_magnitude(record: &IrregularityRecord) -> u64 {
    record
        .gap_primary_independent
        .map(|g| g.unsigned_abs())
        .unwrap_or(0)
}

/// Cross-multiplied integer comparison of `(invalid+blank)/valid ≥ pct%`.
/// With zero valid votes the ratio is unbounded: any reported invalid or
/// blank ballots trip the flag.
fn invalid_blank_ratio_at_least(record: &SourceRecord, pct: u32) -> bool {
    let Some(valid) = record.valid_votes else {
        return false;
    };
    let Some(spoiled) = record.invalid_blank() else {
        return false;
    };
    if valid == 0 {
        return spoiled > 0;
    }
    (spoiled as u128) * 100 >= (valid as u128) * (pct as u128)
}

fn winners_disagree(comparison: &ComparisonResult) -> bool {
    use tr_core::records::SourceName;
    match (
        comparison.winner_by_source.get(&SourceName::Primary),
        comparison.winner_by_source.get(&SourceName::Independent),
    ) {
        (Some(p), Some(i)) => p != i,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tr_core::keys::FormType;
    use tr_core::records::{SourceName, SourceSet};

    use crate::compare::compare_sources;

    fn key(district: i64) -> DistrictFormKey {
        DistrictFormKey::resolve("Nan", district, FormType::Constituency).unwrap()
    }

    fn record(
        source: SourceName,
        valid: u64,
        invalid: u64,
        blank: u64,
        votes: &[(u16, u64)],
    ) -> SourceRecord {
        let mut r = SourceRecord::new(source);
        r.valid_votes = Some(valid);
        r.invalid_votes = Some(invalid);
        r.blank_votes = Some(blank);
        for &(n, c) in votes {
            r.votes.insert(n, c);
        }
        r
    }

    /// Gap 1200 + ratio 12% + winner disagreement → severity 7, tier P1.
    #[test]
    fn compound_anomaly_scores_p1() {
        let mut set = SourceSet::default();
        set.insert(record(
            SourceName::Primary,
            10_000,
            900,
            300,
            &[(1, 6_000), (2, 4_000)],
        ));
        set.insert(record(
            SourceName::Independent,
            8_800,
            100,
            50,
            &[(1, 4_000), (2, 4_800)],
        ));

        let cmp = compare_sources(&key(1), &set);
        let rec = score_key(&cmp, set.get(SourceName::Primary), &ReconParams::default()).unwrap();

        assert_eq!(rec.severity, 7);
        assert_eq!(rec.tier, Tier::P1);
        assert_eq!(
            rec.flags,
            vec![
                IrregularityFlag::HighDeltaIndependent,
                IrregularityFlag::HighInvalidBlankRatio,
                IrregularityFlag::WinnerDisagreement,
            ]
        );
    }

    #[test]
    fn warn_band_gap_scores_p3() {
        let mut set = SourceSet::default();
        set.insert(record(SourceName::Primary, 10_000, 0, 0, &[]));
        set.insert(record(SourceName::Independent, 9_700, 0, 0, &[]));

        let cmp = compare_sources(&key(1), &set);
        let rec = score_key(&cmp, set.get(SourceName::Primary), &ReconParams::default()).unwrap();
        assert_eq!(rec.severity, 2);
        assert_eq!(rec.tier, Tier::P3);
        assert_eq!(rec.flags, vec![IrregularityFlag::DeltaIndependent]);
    }

    #[test]
    fn volunteer_flag_alone_scores_nothing() {
        let mut set = SourceSet::default();
        set.insert(record(SourceName::Primary, 10_000, 0, 0, &[]));
        set.insert(record(SourceName::Volunteer, 2_000, 0, 0, &[]));

        let cmp = compare_sources(&key(1), &set);
        assert!(score_key(&cmp, set.get(SourceName::Primary), &ReconParams::default()).is_none());
    }

    #[test]
    fn volunteer_flag_rides_along_on_scored_keys() {
        let mut set = SourceSet::default();
        set.insert(record(SourceName::Primary, 10_000, 0, 0, &[]));
        set.insert(record(SourceName::Independent, 8_000, 0, 0, &[]));
        set.insert(record(SourceName::Volunteer, 1_000, 0, 0, &[]));

        let cmp = compare_sources(&key(1), &set);
        let rec = score_key(&cmp, set.get(SourceName::Primary), &ReconParams::default()).unwrap();
        assert!(rec.flags.contains(&IrregularityFlag::VolunteerFarFromPrimary));
        assert_eq!(rec.severity, 3);
    }

    #[test]
    fn quiet_key_is_excluded() {
        let mut set = SourceSet::default();
        set.insert(record(SourceName::Primary, 10_000, 10, 5, &[(1, 9_000)]));
        set.insert(record(SourceName::Independent, 10_050, 0, 0, &[(1, 9_050)]));

        let cmp = compare_sources(&key(1), &set);
        assert!(score_key(&cmp, set.get(SourceName::Primary), &ReconParams::default()).is_none());
    }

    #[test]
    fn ranking_is_severity_then_gap_then_key() {
        let params = ReconParams::default();
        let mut records = Vec::new();

        let mut mk = |district: i64, primary_valid: u64, independent_valid: u64| {
            let mut set = SourceSet::default();
            set.insert(record(SourceName::Primary, primary_valid, 0, 0, &[]));
            set.insert(record(SourceName::Independent, independent_valid, 0, 0, &[]));
            let cmp = compare_sources(&key(district), &set);
            score_key(&cmp, set.get(SourceName::Primary), &params).unwrap()
        };

        records.push(mk(1, 10_000, 9_700)); // severity 2, gap 300
        records.push(mk(2, 10_000, 8_000)); // severity 3, gap 2000
        records.push(mk(3, 10_000, 7_000)); // severity 3, gap 3000

        let ranked = rank_irregularities(records);
        let order: Vec<u32> = ranked.iter().map(|r| r.key.district).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn zero_valid_with_spoiled_ballots_trips_ratio() {
        let mut r = SourceRecord::new(SourceName::Primary);
        r.valid_votes = Some(0);
        r.invalid_votes = Some(3);
        r.blank_votes = Some(0);
        assert!(invalid_blank_ratio_at_least(&r, 10));
    }
}
