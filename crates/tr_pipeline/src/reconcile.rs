//! Reconcile: run every analysis stage over the keyed snapshot, in key
//! order, and collect the outputs into one serializable bundle.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use tr_core::keys::{DistrictFormKey, DistrictKey, FormType};
use tr_core::params::ReconParams;
use tr_core::records::{SourceName, SourceSet};
use tr_engine::{
    apportion_largest_remainder, assess_coverage, build_coverage_report, check_record,
    compare_sources, detect_skew, normalize_source, rank_irregularities, score_key,
    ComparisonResult, ConsistencyFlag, CoverageReport, FormTotals, IrregularityRecord,
    SeatResult, ShiftAudit, SkewRecord,
};

use crate::ingest::{IngestIssue, IngestedSnapshot};

/// Run-level counters for the run record and report header.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub districts_in: usize,
    pub keys: usize,
    pub sources: usize,
    pub dropped_rows: usize,
    pub duplicate_sources: usize,
    pub shifts_applied: usize,
}

/// Everything the analysis stages produce for one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ReconOutputs {
    pub stats: RunStats,
    pub ingest_issues: Vec<IngestIssue>,
    pub shift_audits: Vec<ShiftAudit>,
    pub consistency_flags: Vec<ConsistencyFlag>,
    pub comparisons: Vec<ComparisonResult>,
    pub skew: Vec<SkewRecord>,
    pub irregularities: Vec<IrregularityRecord>,
    pub coverage: CoverageReport,
    pub seats: SeatResult,
    pub party_names: BTreeMap<u16, String>,
}

/// Run all stages. Pure and deterministic: same snapshot and params, same
/// bytes out.
pub fn reconcile(ingested: &IngestedSnapshot, params: &ReconParams) -> ReconOutputs {
    // Normalize party indices per key, against the Official number set.
    let mut keyed: BTreeMap<DistrictFormKey, SourceSet> = BTreeMap::new();
    let mut shift_audits: Vec<ShiftAudit> = Vec::new();
    for (key, sources) in &ingested.keyed {
        let official_numbers: BTreeSet<u16> = sources
            .get(SourceName::Official)
            .map(|r| r.votes.keys().copied().collect())
            .unwrap_or_default();

        let mut normalized = SourceSet::default();
        for (_, record) in sources.iter() {
            let (record, audit) = normalize_source(key, record.clone(), &official_numbers);
            if let Some(audit) = audit {
                shift_audits.push(audit);
            }
            normalized.insert(record);
        }
        keyed.insert(key.clone(), normalized);
    }

    // Per-record internal consistency.
    let mut consistency_flags: Vec<ConsistencyFlag> = Vec::new();
    for (key, sources) in &keyed {
        for (_, record) in sources.iter() {
            if let Some(flag) = check_record(key, record) {
                consistency_flags.push(flag);
            }
        }
    }

    // Cross-source comparison per key.
    let comparisons: Vec<ComparisonResult> = keyed
        .iter()
        .map(|(key, sources)| compare_sources(key, sources))
        .collect();

    // Constituency vs party-list totals per district, Primary source only.
    let mut totals: BTreeMap<DistrictKey, FormTotals> = BTreeMap::new();
    for (key, sources) in &keyed {
        let Some(total) = sources.get(SourceName::Primary).and_then(|r| r.total()) else {
            continue;
        };
        let entry = totals.entry(key.district_key()).or_default();
        match key.form {
            FormType::Constituency => entry.constituency = Some(total),
            FormType::PartyList => entry.party_list = Some(total),
        }
    }
    let skew = detect_skew(&totals, params.noise_tolerance);

    // Irregularity scoring over the comparisons.
    let irregularities = rank_irregularities(
        comparisons
            .iter()
            .filter_map(|cmp| {
                let primary = keyed.get(&cmp.key).and_then(|s| s.get(SourceName::Primary));
                score_key(cmp, primary, params)
            })
            .collect(),
    );

    // Coverage per key, reusing the comparator's Primary↔Independent gap.
    let coverage = build_coverage_report(
        comparisons
            .iter()
            .filter_map(|cmp| {
                keyed
                    .get(&cmp.key)
                    .map(|sources| {
                        assess_coverage(&cmp.key, sources, cmp.gap_primary_independent, params)
                    })
            })
            .collect(),
    );

    // National party-list seat picture from Primary vote maps.
    let mut national: BTreeMap<u16, u64> = BTreeMap::new();
    for (key, sources) in &keyed {
        if key.form != FormType::PartyList {
            continue;
        }
        let Some(primary) = sources.get(SourceName::Primary) else {
            continue;
        };
        for (&party, &count) in &primary.votes {
            let slot = national.entry(party).or_insert(0);
            *slot = slot.saturating_add(count);
        }
    }
    let seats = apportion_largest_remainder(params.total_seats, &national);

    let stats = RunStats {
        districts_in: ingested.districts_in,
        keys: keyed.len(),
        sources: keyed.values().map(SourceSet::present_count).sum(),
        dropped_rows: ingested
            .issues
            .iter()
            .filter(|i| matches!(i, IngestIssue::UnresolvableKey { .. }))
            .count(),
        duplicate_sources: ingested
            .issues
            .iter()
            .filter(|i| matches!(i, IngestIssue::DuplicateSource { .. }))
            .count(),
        shifts_applied: shift_audits.len(),
    };

    ReconOutputs {
        stats,
        ingest_issues: ingested.issues.clone(),
        shift_audits,
        consistency_flags,
        comparisons,
        skew,
        irregularities,
        coverage,
        seats,
        party_names: ingested.party_names.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ingest_snapshot;
    use tr_io::loader::{RawDistrict, RawSnapshot, RawSourceBody};

    fn body(valid: u64, votes: &[(u16, u64)]) -> RawSourceBody {
        RawSourceBody {
            valid_votes: Some(valid),
            invalid_votes: Some(0),
            blank_votes: Some(0),
            votes: votes.iter().copied().collect(),
            weak_flag: false,
            station_count: None,
        }
    }

    fn snapshot() -> RawSnapshot {
        RawSnapshot {
            districts: vec![
                RawDistrict {
                    province: "Nan".to_string(),
                    district_number: 1,
                    form_type: FormType::Constituency,
                    primary: Some(body(110_223, &[(3, 60_000), (8, 50_223)])),
                    official: None,
                    volunteer: None,
                    independent: Some(body(109_000, &[(3, 59_000), (8, 50_000)])),
                },
                RawDistrict {
                    province: "Changwat Nan".to_string(),
                    district_number: 1,
                    form_type: FormType::PartyList,
                    primary: Some(body(110_021, &[(2, 70_021), (5, 40_000)])),
                    official: None,
                    volunteer: None,
                    independent: None,
                },
            ],
            party_names: BTreeMap::new(),
        }
    }

    #[test]
    fn stages_compose_over_a_small_snapshot() {
        let ingested = ingest_snapshot(&snapshot());
        let params = ReconParams::default();
        let out = reconcile(&ingested, &params);

        assert_eq!(out.stats.keys, 2);
        assert_eq!(out.stats.sources, 3);
        assert_eq!(out.stats.dropped_rows, 0);

        // 110_223 vs 110_021: diff 202, above the 200 tolerance.
        assert_eq!(out.skew.len(), 1);
        assert_eq!(out.skew[0].reported_diff, 202);

        // Primary↔Independent gap 1_223 clears gap_high on the con key.
        assert_eq!(out.irregularities.len(), 1);
        assert_eq!(out.irregularities[0].key.form, FormType::Constituency);

        // Seats come only from the party-list Primary map.
        assert_eq!(out.seats.total_votes, 110_021);
        let total: u32 = out.seats.seats.values().map(|a| a.total_seats).sum();
        assert_eq!(total, params.total_seats);
    }

    #[test]
    fn outputs_are_deterministic() {
        let ingested = ingest_snapshot(&snapshot());
        let params = ReconParams::default();
        let a = serde_json::to_string(&reconcile(&ingested, &params)).unwrap();
        let b = serde_json::to_string(&reconcile(&ingested, &params)).unwrap();
        assert_eq!(a, b);
    }
}
