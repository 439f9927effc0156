//! Numeric consistency: sum-of-parts vs reported valid votes.
//!
//! A non-zero delta is a quality signal on the record, surfaced as a flag.
//! Nothing is mutated or corrected here.

use tr_core::keys::DistrictFormKey;
use tr_core::records::{SourceName, SourceRecord};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sum-mismatch flag for one record.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsistencyFlag {
    pub key: DistrictFormKey,
    pub source: SourceName,
    pub valid_votes: u64,
    pub sum_of_parts: u64,
    /// `valid_votes - sum_of_parts`; never zero (zero deltas are not flagged).
    pub delta: i64,
}

/// Check one record. `None` when the record has no vote map, reports no
/// valid-vote counter, or the sum matches exactly.
pub fn check_record(key: &DistrictFormKey, record: &SourceRecord) -> Option<ConsistencyFlag> {
    let valid = record.valid_votes?;
    if record.votes.is_empty() {
        return None;
    }
    let sum = record.sum_of_parts();
    let delta = crate::compare::signed_diff(valid, sum);
    if delta == 0 {
        return None;
    }
    Some(ConsistencyFlag {
        key: key.clone(),
        source: record.source,
        valid_votes: valid,
        sum_of_parts: sum,
        delta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tr_core::keys::FormType;

    fn key() -> DistrictFormKey {
        DistrictFormKey::resolve("Nan", 1, FormType::Constituency).unwrap()
    }

    fn record(valid: Option<u64>, parts: &[(u16, u64)]) -> SourceRecord {
        let mut r = SourceRecord::new(SourceName::Primary);
        r.valid_votes = valid;
        for &(n, c) in parts {
            r.votes.insert(n, c);
        }
        r
    }

    #[test]
    fn matching_sum_is_silent() {
        assert!(check_record(&key(), &record(Some(100), &[(1, 60), (2, 40)])).is_none());
    }

    #[test]
    fn mismatch_is_flagged_with_signed_delta() {
        let flag = check_record(&key(), &record(Some(100), &[(1, 60), (2, 30)])).unwrap();
        assert_eq!(flag.delta, 10);
        assert_eq!(flag.sum_of_parts, 90);

        let flag = check_record(&key(), &record(Some(80), &[(1, 60), (2, 30)])).unwrap();
        assert_eq!(flag.delta, -10);
    }

    #[test]
    fn missing_valid_or_empty_map_is_out_of_scope() {
        assert!(check_record(&key(), &record(None, &[(1, 60)])).is_none());
        assert!(check_record(&key(), &record(Some(100), &[])).is_none());
    }
}
