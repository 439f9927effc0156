//! Cross-source comparison for one canonical key.
//!
//! Works with whatever subset of sources is present (1..N); every derived
//! quantity degrades to `None` on missing inputs. The primary spread
//! deliberately excludes the Volunteer feed: its coverage is uneven and
//! would dominate false positives.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use tr_core::keys::DistrictFormKey;
use tr_core::records::{SourceName, SourceSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sources feeding the primary spread signal.
const PRIMARY_SPREAD_SOURCES: [SourceName; 3] = [
    SourceName::Primary,
    SourceName::Official,
    SourceName::Independent,
];

/// Per-key comparison across the available sources.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComparisonResult {
    pub key: DistrictFormKey,
    /// Reported valid votes per present source.
    pub valid_by_source: BTreeMap<SourceName, u64>,
    /// max−min over {Primary, Official, Independent}; `None` when none of
    /// the three reported valid votes.
    pub primary_spread: Option<u64>,
    /// max−min over every present source (diagnostic only).
    pub all_spread: Option<u64>,
    /// Winner per source, where defined.
    pub winner_by_source: BTreeMap<SourceName, u16>,
    /// `Some(true)` iff every source with a defined winner agrees; `None`
    /// when fewer than two winners are defined.
    pub winner_agreement: Option<bool>,
    pub gap_primary_independent: Option<i64>,
    pub gap_primary_volunteer: Option<i64>,
}

/// Signed valid-vote gap `a − b`; `None` if either side is missing.
pub fn gap(sources: &SourceSet, a: SourceName, b: SourceName) -> Option<i64> {
    let va = sources.get(a)?.valid_votes?;
    let vb = sources.get(b)?.valid_votes?;
    Some(signed_diff(va, vb))
}

/// `a − b` widened through i128 and saturated at the i64 range, so counts
/// above `i64::MAX` cannot wrap.
pub(crate) fn signed_diff(a: u64, b: u64) -> i64 {
    let wide = i128::from(a) - i128::from(b);
    wide.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Compare every present source for a key.
pub fn compare_sources(key: &DistrictFormKey, sources: &SourceSet) -> ComparisonResult {
    let mut valid_by_source = BTreeMap::new();
    let mut winner_by_source = BTreeMap::new();
    for (name, record) in sources.iter() {
        if let Some(valid) = record.valid_votes {
            valid_by_source.insert(name, valid);
        }
        if let Some(winner) = record.winner() {
            winner_by_source.insert(name, winner);
        }
    }

    let primary_values: Vec<u64> = PRIMARY_SPREAD_SOURCES
        .iter()
        .filter_map(|&name| valid_by_source.get(&name).copied())
        .collect();
    let all_values: Vec<u64> = valid_by_source.values().copied().collect();

    let winners: Vec<u16> = winner_by_source.values().copied().collect();
    let winner_agreement = if winners.len() < 2 {
        None
    } else {
        Some(winners.windows(2).all(|w| w[0] == w[1]))
    };

    ComparisonResult {
        key: key.clone(),
        primary_spread: spread(&primary_values),
        all_spread: spread(&all_values),
        winner_agreement,
        gap_primary_independent: gap(sources, SourceName::Primary, SourceName::Independent),
        gap_primary_volunteer: gap(sources, SourceName::Primary, SourceName::Volunteer),
        valid_by_source,
        winner_by_source,
    }
}

fn spread(values: &[u64]) -> Option<u64> {
    let max = values.iter().copied().max()?;
    let min = values.iter().copied().min()?;
    Some(max - min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tr_core::keys::FormType;
    use tr_core::records::SourceRecord;

    fn key() -> DistrictFormKey {
        DistrictFormKey::resolve("Nan", 1, FormType::Constituency).unwrap()
    }

    fn record(source: SourceName, valid: Option<u64>, votes: &[(u16, u64)]) -> SourceRecord {
        let mut r = SourceRecord::new(source);
        r.valid_votes = valid;
        for &(n, c) in votes {
            r.votes.insert(n, c);
        }
        r
    }

    #[test]
    fn spreads_exclude_volunteer_from_primary_signal() {
        let mut set = SourceSet::default();
        set.insert(record(SourceName::Primary, Some(1_000), &[]));
        set.insert(record(SourceName::Official, Some(1_050), &[]));
        set.insert(record(SourceName::Independent, Some(990), &[]));
        set.insert(record(SourceName::Volunteer, Some(400), &[]));

        let cmp = compare_sources(&key(), &set);
        assert_eq!(cmp.primary_spread, Some(60));
        assert_eq!(cmp.all_spread, Some(650));
    }

    #[test]
    fn single_source_degrades_gracefully() {
        let mut set = SourceSet::default();
        set.insert(record(SourceName::Primary, Some(1_000), &[(1, 600), (2, 400)]));

        let cmp = compare_sources(&key(), &set);
        assert_eq!(cmp.primary_spread, Some(0));
        assert_eq!(cmp.gap_primary_independent, None);
        assert_eq!(cmp.winner_agreement, None);
        assert_eq!(cmp.winner_by_source.get(&SourceName::Primary), Some(&1));
    }

    #[test]
    fn gap_saturates_instead_of_wrapping() {
        let mut set = SourceSet::default();
        set.insert(record(SourceName::Primary, Some(u64::MAX), &[]));
        set.insert(record(SourceName::Independent, Some(0), &[]));
        assert_eq!(
            gap(&set, SourceName::Primary, SourceName::Independent),
            Some(i64::MAX)
        );
        assert_eq!(
            gap(&set, SourceName::Independent, SourceName::Primary),
            Some(i64::MIN)
        );
    }

    #[test]
    fn empty_set_is_all_none() {
        let cmp = compare_sources(&key(), &SourceSet::default());
        assert_eq!(cmp.primary_spread, None);
        assert_eq!(cmp.all_spread, None);
        assert_eq!(cmp.winner_agreement, None);
        assert!(cmp.valid_by_source.is_empty());
    }

    #[test]
    fn winner_disagreement_detected() {
        let mut set = SourceSet::default();
        set.insert(record(SourceName::Primary, Some(1_000), &[(1, 600), (2, 400)]));
        set.insert(record(SourceName::Independent, Some(995), &[(1, 400), (2, 595)]));

        let cmp = compare_sources(&key(), &set);
        assert_eq!(cmp.winner_agreement, Some(false));
        assert_eq!(cmp.gap_primary_independent, Some(5));
    }

    #[test]
    fn signed_gap_direction() {
        let mut set = SourceSet::default();
        set.insert(record(SourceName::Primary, Some(900), &[]));
        set.insert(record(SourceName::Independent, Some(1_100), &[]));
        assert_eq!(
            gap(&set, SourceName::Primary, SourceName::Independent),
            Some(-200)
        );
    }
}
