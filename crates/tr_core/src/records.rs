//! Uniform per-source record shape and the per-key source set.
//!
//! Every feed is mapped into [`SourceRecord`] at the normalizer boundary.
//! Ballot counters are nullable: absence means the source did not report the
//! field, and it stays absent everywhere downstream (`MissingSource` is a
//! representation, never a failure). All derived quantities mix fields of
//! one source only.

use alloc::collections::BTreeMap;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The four independent feeds, in trust/priority order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SourceName {
    /// Own extraction pipeline - the candidate-of-record.
    Primary,
    /// Authoritative external reference, where available.
    Official,
    /// Crowd-collected feed; uneven coverage, lower trust.
    Volunteer,
    /// Independently produced second extraction, used as a cross-check.
    Independent,
}

impl SourceName {
    pub const ALL: [SourceName; 4] = [
        SourceName::Primary,
        SourceName::Official,
        SourceName::Volunteer,
        SourceName::Independent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceName::Primary => "primary",
            SourceName::Official => "official",
            SourceName::Volunteer => "volunteer",
            SourceName::Independent => "independent",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source's report for one canonical key.
///
/// `votes` maps candidate/party number to a vote count. Sum-of-parts
/// equaling `valid_votes` is a quality signal checked downstream, never an
/// enforced invariant.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceRecord {
    pub source: SourceName,
    pub valid_votes: Option<u64>,
    pub invalid_votes: Option<u64>,
    pub blank_votes: Option<u64>,
    pub votes: BTreeMap<u16, u64>,
    /// Upstream marked this extraction low-confidence.
    pub weak: bool,
    /// Coverage indicator reported by the volunteer feed only.
    pub station_count: Option<u32>,
}

impl SourceRecord {
    pub fn new(source: SourceName) -> Self {
        SourceRecord {
            source,
            valid_votes: None,
            invalid_votes: None,
            blank_votes: None,
            votes: BTreeMap::new(),
            weak: false,
            station_count: None,
        }
    }

    /// Same-source total: `valid + invalid + blank`, defined only when all
    /// three counters were reported by this source. Gaps are never filled
    /// from another source.
    pub fn total(&self) -> Option<u64> {
        match (self.valid_votes, self.invalid_votes, self.blank_votes) {
            (Some(v), Some(i), Some(b)) => Some(v.saturating_add(i).saturating_add(b)),
            _ => None,
        }
    }

    /// Sum over the vote map (u128 accumulation, saturated to u64).
    pub fn sum_of_parts(&self) -> u64 {
        let sum: u128 = self.votes.values().map(|&v| v as u128).sum();
        if sum > u64::MAX as u128 {
            u64::MAX
        } else {
            sum as u64
        }
    }

    /// `invalid + blank`, treating a single missing counter as zero;
    /// `None` when neither was reported.
    pub fn invalid_blank(&self) -> Option<u64> {
        match (self.invalid_votes, self.blank_votes) {
            (None, None) => None,
            (i, b) => Some(i.unwrap_or(0).saturating_add(b.unwrap_or(0))),
        }
    }

    /// Winner = argmax over the vote map, lowest number on ties (BTreeMap
    /// iteration order makes the first strict maximum the lowest number).
    /// `None` when the map is empty or carries no positive count.
    pub fn winner(&self) -> Option<u16> {
        let mut best: Option<(u16, u64)> = None;
        for (&number, &count) in &self.votes {
            if count == 0 {
                continue;
            }
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((number, count)),
            }
        }
        best.map(|(number, _)| number)
    }
}

/// The records available for one canonical key, one slot per source.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceSet {
    pub primary: Option<SourceRecord>,
    pub official: Option<SourceRecord>,
    pub volunteer: Option<SourceRecord>,
    pub independent: Option<SourceRecord>,
}

impl SourceSet {
    pub fn get(&self, source: SourceName) -> Option<&SourceRecord> {
        match source {
            SourceName::Primary => self.primary.as_ref(),
            SourceName::Official => self.official.as_ref(),
            SourceName::Volunteer => self.volunteer.as_ref(),
            SourceName::Independent => self.independent.as_ref(),
        }
    }

    pub fn insert(&mut self, record: SourceRecord) {
        let slot = match record.source {
            SourceName::Primary => &mut self.primary,
            SourceName::Official => &mut self.official,
            SourceName::Volunteer => &mut self.volunteer,
            SourceName::Independent => &mut self.independent,
        };
        *slot = Some(record);
    }

    pub fn has(&self, source: SourceName) -> bool {
        self.get(source).is_some()
    }

    /// Present records in `SourceName::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (SourceName, &SourceRecord)> {
        SourceName::ALL
            .into_iter()
            .filter_map(move |name| self.get(name).map(|rec| (name, rec)))
    }

    pub fn present_count(&self) -> usize {
        self.iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(valid: Option<u64>, invalid: Option<u64>, blank: Option<u64>) -> SourceRecord {
        SourceRecord {
            valid_votes: valid,
            invalid_votes: invalid,
            blank_votes: blank,
            ..SourceRecord::new(SourceName::Primary)
        }
    }

    #[test]
    fn total_requires_all_three_counters() {
        assert_eq!(rec(Some(100), Some(5), Some(2)).total(), Some(107));
        assert_eq!(rec(Some(100), None, Some(2)).total(), None);
        assert_eq!(rec(None, Some(5), Some(2)).total(), None);
    }

    #[test]
    fn winner_breaks_ties_toward_lowest_number() {
        let mut r = SourceRecord::new(SourceName::Primary);
        r.votes.insert(7, 40);
        r.votes.insert(3, 40);
        r.votes.insert(12, 11);
        assert_eq!(r.winner(), Some(3));
    }

    #[test]
    fn winner_needs_a_positive_count() {
        let mut r = SourceRecord::new(SourceName::Primary);
        assert_eq!(r.winner(), None);
        r.votes.insert(4, 0);
        assert_eq!(r.winner(), None);
        r.votes.insert(9, 1);
        assert_eq!(r.winner(), Some(9));
    }

    #[test]
    fn source_set_iterates_in_declared_order() {
        let mut set = SourceSet::default();
        set.insert(SourceRecord::new(SourceName::Independent));
        set.insert(SourceRecord::new(SourceName::Primary));
        let order: Vec<SourceName> = set.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec![SourceName::Primary, SourceName::Independent]);
        assert_eq!(set.present_count(), 2);
    }
}
