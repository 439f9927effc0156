//! Ingest: turn raw wire districts into canonically keyed source sets.
//!
//! Rows that cannot produce a canonical key are dropped and reported, never
//! silently discarded. Duplicate (key, source) pairs keep the first body
//! seen and report the collision.

use std::collections::BTreeMap;

use serde::Serialize;

use tr_core::keys::DistrictFormKey;
use tr_core::records::SourceSet;
use tr_io::loader::RawSnapshot;

/// One row the ingest stage refused or merged, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IngestIssue {
    /// Province empty after normalization, or district number not positive.
    UnresolvableKey {
        province_raw: String,
        district_number: i64,
    },
    /// Same key and source appeared twice; the first body wins.
    DuplicateSource { key: String, source: String },
}

/// Keyed source sets plus the issue list and party-name directory.
#[derive(Debug, Clone, Default)]
pub struct IngestedSnapshot {
    pub keyed: BTreeMap<DistrictFormKey, SourceSet>,
    pub issues: Vec<IngestIssue>,
    pub party_names: BTreeMap<u16, String>,
    /// Districts present on the wire, before keying.
    pub districts_in: usize,
}

pub fn ingest_snapshot(snapshot: &RawSnapshot) -> IngestedSnapshot {
    let mut keyed: BTreeMap<DistrictFormKey, SourceSet> = BTreeMap::new();
    let mut issues = Vec::new();

    for district in &snapshot.districts {
        let Some(key) = DistrictFormKey::resolve(
            &district.province,
            district.district_number,
            district.form_type,
        ) else {
            issues.push(IngestIssue::UnresolvableKey {
                province_raw: district.province.clone(),
                district_number: district.district_number,
            });
            continue;
        };

        let set = keyed.entry(key.clone()).or_default();
        for (source, body) in district.bodies() {
            if set.has(source) {
                issues.push(IngestIssue::DuplicateSource {
                    key: key.to_string(),
                    source: source.to_string(),
                });
                continue;
            }
            set.insert(body.clone().into_record(source));
        }
    }

    IngestedSnapshot {
        keyed,
        issues,
        party_names: snapshot.party_names.clone(),
        districts_in: snapshot.districts.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tr_core::keys::FormType;
    use tr_core::records::SourceName;
    use tr_io::loader::{RawDistrict, RawSourceBody};

    fn district(province: &str, number: i64, form: FormType) -> RawDistrict {
        RawDistrict {
            province: province.to_string(),
            district_number: number,
            form_type: form,
            primary: Some(RawSourceBody {
                valid_votes: Some(100),
                ..RawSourceBody::default()
            }),
            official: None,
            volunteer: None,
            independent: None,
        }
    }

    #[test]
    fn prefix_variants_of_one_province_share_a_key() {
        let snapshot = RawSnapshot {
            districts: vec![
                district("Chiang Mai", 1, FormType::Constituency),
                {
                    let mut d = district("Province of Chiang Mai", 1, FormType::Constituency);
                    d.primary = None;
                    d.official = Some(RawSourceBody {
                        valid_votes: Some(99),
                        ..RawSourceBody::default()
                    });
                    d
                },
            ],
            party_names: BTreeMap::new(),
        };

        let ingested = ingest_snapshot(&snapshot);
        assert_eq!(ingested.keyed.len(), 1);
        let set = ingested.keyed.values().next().unwrap();
        assert!(set.has(SourceName::Primary));
        assert!(set.has(SourceName::Official));
        assert!(ingested.issues.is_empty());
    }

    #[test]
    fn bad_rows_are_dropped_with_reasons() {
        let snapshot = RawSnapshot {
            districts: vec![
                district("  ", 1, FormType::Constituency),
                district("Phuket", 0, FormType::Constituency),
                district("Phuket", -3, FormType::Constituency),
            ],
            party_names: BTreeMap::new(),
        };
        let ingested = ingest_snapshot(&snapshot);
        assert!(ingested.keyed.is_empty());
        assert_eq!(ingested.issues.len(), 3);
        assert_eq!(ingested.districts_in, 3);
    }

    #[test]
    fn duplicate_source_keeps_first_body() {
        let mut first = district("Phuket", 1, FormType::PartyList);
        first.primary = Some(RawSourceBody {
            valid_votes: Some(100),
            ..RawSourceBody::default()
        });
        let mut second = district("จังหวัดPhuket", 1, FormType::PartyList);
        second.primary = Some(RawSourceBody {
            valid_votes: Some(999),
            ..RawSourceBody::default()
        });

        let snapshot = RawSnapshot {
            districts: vec![first, second],
            party_names: BTreeMap::new(),
        };
        let ingested = ingest_snapshot(&snapshot);
        assert_eq!(ingested.keyed.len(), 1);
        let set = ingested.keyed.values().next().unwrap();
        assert_eq!(set.get(SourceName::Primary).unwrap().valid_votes, Some(100));
        assert_eq!(
            ingested.issues,
            vec![IngestIssue::DuplicateSource {
                key: "Phuket:1:pl".to_string(),
                source: "primary".to_string(),
            }]
        );
    }
}
