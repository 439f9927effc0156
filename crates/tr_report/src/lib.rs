//! tr_report - pure offline report model + renderers (JSON/HTML).
//!
//! Determinism rules:
//! - No network, no I/O here. Callers supply artifacts already in-memory.
//! - No float arithmetic; percentages and confidence scores arrive as
//!   integers from the engine and are formatted textually.
//! - Stable section order and field names.
//!
//! Inputs are accepted as JSON values (`serde_json::Value`) to avoid tight
//! coupling with tr_pipeline concrete types while keeping signatures stable
//! across the workspace.

#![deny(unsafe_code)]

// ---- Artifact type aliases (loosely-coupled) ----
// Callers pass the already-canonicalized JSON artifacts the engine produced.
pub type ResultArtifact = serde_json::Value;
pub type RunRecordArtifact = serde_json::Value;

// ===== Errors =====
#[derive(Debug)]
pub enum ReportError {
    Template(&'static str),
    MissingField(&'static str),
    Inconsistent(&'static str),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Template(m) => write!(f, "template: {m}"),
            ReportError::MissingField(m) => write!(f, "missing field: {m}"),
            ReportError::Inconsistent(m) => write!(f, "inconsistent artifact: {m}"),
        }
    }
}

impl std::error::Error for ReportError {}

// ===== Model =====
#[derive(Clone, Debug, serde::Serialize)]
pub struct ReportModel {
    pub cover: SectionCover,
    pub run_summary: SectionRunSummary,
    pub irregularities: SectionIrregularities,
    pub skew: SectionSkew,
    pub coverage: SectionCoverage,
    pub seats: SectionSeats,
    pub integrity: SectionIntegrity,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct SectionCover {
    pub title: String,
    pub result_id: String,
    pub generated_utc: String,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct SectionRunSummary {
    pub districts_in: u64,
    pub keys: u64,
    pub sources: u64,
    pub dropped_rows: u64,
    pub duplicate_sources: u64,
    pub shifts_applied: u64,
    pub consistency_flags: u64,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct IrregularityRow {
    pub key: String,
    pub tier: String,
    pub severity: u64,
    pub flags: Vec<String>,
    pub gap_primary_independent: Option<i64>,
}

/// Ranked irregularities, split by review tier. Order within each tier is
/// the engine's review order and is preserved as-is.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct SectionIrregularities {
    pub p1: Vec<IrregularityRow>,
    pub p2: Vec<IrregularityRow>,
    pub p3: Vec<IrregularityRow>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct SkewRow {
    pub district: String,
    pub constituency_total: u64,
    pub party_list_total: u64,
    pub reported_diff: i64,
    pub direction: String,
}

#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct SectionSkew {
    /// Pairs outside the noise tolerance, largest |diff| first.
    pub rows: Vec<SkewRow>,
    /// Pairs reconciled inside the tolerance.
    pub within_tolerance: u64,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct CoverageGapRow {
    pub key: String,
    pub missing: Vec<String>,
    pub confidence: u64,
}

#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct SectionCoverage {
    pub keys_total: u64,
    pub fully_covered: u64,
    pub gaps: Vec<CoverageGapRow>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct SeatRow {
    pub party: u64,
    pub party_name: Option<String>,
    pub base_seats: u64,
    pub remainder_seats: u64,
    pub total_seats: u64,
}

#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct SectionSeats {
    pub total_seats: u64,
    pub total_votes: u64,
    pub quota: u64,
    pub tie_at_cutoff: bool,
    pub rows: Vec<SeatRow>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct SectionIntegrity {
    pub result_id: String,
    pub result_sha256: String,
    pub run_id: String,
    pub snapshot_sha256: String,
    pub engine_name: String,
    pub engine_version: String,
    pub engine_build: String,
    pub timestamp_utc: String,
}

// ===== API =====

/// Build the report model from artifacts (pure, offline).
///
/// Reads only well-known fields. Missing required fields yield
/// `ReportError::MissingField`; optional sections degrade to empty.
pub fn build_model(
    result: &ResultArtifact,
    run: &RunRecordArtifact,
) -> Result<ReportModel, ReportError> {
    let result_id = json_get_str(result, "/id")?;
    let timestamp = json_get_str(run, "/timestamp_utc")?;

    let cover = SectionCover {
        title: "Tally Reconciliation Report".to_string(),
        result_id: result_id.clone(),
        generated_utc: timestamp.clone(),
    };

    let stats = result
        .pointer("/outputs/stats")
        .ok_or(ReportError::MissingField("outputs.stats"))?;
    let run_summary = SectionRunSummary {
        districts_in: json_get_u64(stats, "/districts_in").unwrap_or(0),
        keys: json_get_u64(stats, "/keys").unwrap_or(0),
        sources: json_get_u64(stats, "/sources").unwrap_or(0),
        dropped_rows: json_get_u64(stats, "/dropped_rows").unwrap_or(0),
        duplicate_sources: json_get_u64(stats, "/duplicate_sources").unwrap_or(0),
        shifts_applied: json_get_u64(stats, "/shifts_applied").unwrap_or(0),
        consistency_flags: result
            .pointer("/outputs/consistency_flags")
            .and_then(|v| v.as_array())
            .map(|a| a.len() as u64)
            .unwrap_or(0),
    };

    // ---- Irregularities, grouped by tier, engine order preserved ----
    let mut irregularities = SectionIrregularities::default();
    if let Some(arr) = result
        .pointer("/outputs/irregularities")
        .and_then(|v| v.as_array())
    {
        for rec in arr {
            let tier = json_get_str(rec, "/tier")?;
            let row = IrregularityRow {
                key: key_to_string(rec.pointer("/key"))?,
                tier: tier.clone(),
                severity: json_get_u64(rec, "/severity").unwrap_or(0),
                flags: rec
                    .pointer("/flags")
                    .and_then(|v| v.as_array())
                    .map(|a| {
                        a.iter()
                            .filter_map(|f| f.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default(),
                gap_primary_independent: rec
                    .pointer("/gap_primary_independent")
                    .and_then(|v| v.as_i64()),
            };
            match tier.as_str() {
                "P1" => irregularities.p1.push(row),
                "P2" => irregularities.p2.push(row),
                "P3" => irregularities.p3.push(row),
                _ => return Err(ReportError::Inconsistent("irregularities.tier")),
            }
        }
    }

    // ---- Skew: split reported rows from within-tolerance counts ----
    let mut skew = SectionSkew::default();
    if let Some(arr) = result.pointer("/outputs/skew").and_then(|v| v.as_array()) {
        for rec in arr {
            if rec
                .pointer("/within_tolerance")
                .and_then(|v| v.as_bool())
                .unwrap_or(false)
            {
                skew.within_tolerance += 1;
                continue;
            }
            skew.rows.push(SkewRow {
                district: district_to_string(rec.pointer("/district"))?,
                constituency_total: json_get_u64(rec, "/constituency_total").unwrap_or(0),
                party_list_total: json_get_u64(rec, "/party_list_total").unwrap_or(0),
                reported_diff: rec
                    .pointer("/reported_diff")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0),
                direction: json_get_str(rec, "/direction").unwrap_or_else(|_| "balanced".into()),
            });
        }
    }

    // ---- Coverage: totals plus the gap rows ----
    let mut coverage = SectionCoverage::default();
    if let Some(arr) = result
        .pointer("/outputs/coverage/records")
        .and_then(|v| v.as_array())
    {
        coverage.keys_total = arr.len() as u64;
        for rec in arr {
            let mut missing = Vec::new();
            for (field, label) in [
                ("/has_primary", "primary"),
                ("/has_official", "official"),
                ("/has_volunteer", "volunteer"),
                ("/has_independent", "independent"),
            ] {
                if !rec.pointer(field).and_then(|v| v.as_bool()).unwrap_or(false) {
                    missing.push(label.to_string());
                }
            }
            if missing.is_empty() {
                coverage.fully_covered += 1;
            } else {
                coverage.gaps.push(CoverageGapRow {
                    key: key_to_string(rec.pointer("/key"))?,
                    missing,
                    confidence: json_get_u64(rec, "/confidence").unwrap_or(0),
                });
            }
        }
    }

    // ---- Seats ----
    let seats_doc = result
        .pointer("/outputs/seats")
        .ok_or(ReportError::MissingField("outputs.seats"))?;
    let mut seat_rows = Vec::new();
    if let Some(map) = seats_doc.pointer("/seats").and_then(|v| v.as_object()) {
        // serde_json object keys are strings; party numbers sort numerically.
        let mut parties: Vec<(u64, &serde_json::Value)> = map
            .iter()
            .filter_map(|(k, v)| k.parse::<u64>().ok().map(|p| (p, v)))
            .collect();
        parties.sort_by_key(|(p, _)| *p);
        for (party, alloc) in parties {
            seat_rows.push(SeatRow {
                party,
                party_name: result
                    .pointer(&format!("/outputs/party_names/{party}"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                base_seats: json_get_u64(alloc, "/base_seats").unwrap_or(0),
                remainder_seats: json_get_u64(alloc, "/remainder_seats").unwrap_or(0),
                total_seats: json_get_u64(alloc, "/total_seats").unwrap_or(0),
            });
        }
    }
    let seats = SectionSeats {
        total_seats: json_get_u64(seats_doc, "/total_seats").unwrap_or(0),
        total_votes: json_get_u64(seats_doc, "/total_votes").unwrap_or(0),
        quota: json_get_u64(seats_doc, "/quota").unwrap_or(0),
        tie_at_cutoff: seats_doc
            .pointer("/tie_at_cutoff")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        rows: seat_rows,
    };

    let integrity = SectionIntegrity {
        result_id,
        result_sha256: json_get_str(result, "/sha256")?,
        run_id: json_get_str(run, "/id")?,
        snapshot_sha256: json_get_str(run, "/inputs/snapshot_sha256")?,
        engine_name: json_get_str(run, "/engine/name").unwrap_or_else(|_| "trecon".into()),
        engine_version: json_get_str(run, "/engine/version").unwrap_or_else(|_| "0.1.0".into()),
        engine_build: json_get_str(run, "/engine/build").unwrap_or_else(|_| "dev".into()),
        timestamp_utc: timestamp,
    };

    Ok(ReportModel {
        cover,
        run_summary,
        irregularities,
        skew,
        coverage,
        seats,
        integrity,
    })
}

// ===== Renderers =====

/// Serialize the model as JSON (stable field order courtesy of struct layout).
#[cfg(feature = "render_json")]
pub fn render_json(model: &ReportModel) -> Result<String, ReportError> {
    serde_json::to_string_pretty(model).map_err(|_| ReportError::Template("json_serialize"))
}

/// Render a compact HTML summary using an embedded template (no external assets).
#[cfg(feature = "render_html")]
pub fn render_html(model: &ReportModel) -> Result<String, ReportError> {
    use minijinja::{context, Environment};

    static TEMPLATE: &str = r#"<!doctype html>
<html lang="en"><meta charset="utf-8">
<title>{{ cover.title }} | {{ cover.result_id }}</title>
<h1>{{ cover.title }}</h1>
<p>Generated {{ cover.generated_utc }} for {{ cover.result_id }}</p>

<h2>Run summary</h2>
<p>Districts in: {{ s.districts_in }}, keys: {{ s.keys }}, source records: {{ s.sources }},
dropped rows: {{ s.dropped_rows }}, duplicates: {{ s.duplicate_sources }},
shifts applied: {{ s.shifts_applied }}, consistency flags: {{ s.consistency_flags }}</p>

<h2>Irregularities</h2>
{% for tier in tiers %}
<h3>{{ tier.name }} ({{ tier.rows | length }})</h3>
{% if tier.rows %}
<table border="1">
<tr><th>Key</th><th>Severity</th><th>Flags</th><th>Gap P-I</th></tr>
{% for r in tier.rows %}
<tr><td>{{ r.key }}</td><td>{{ r.severity }}</td><td>{{ r.flags | join(", ") }}</td>
<td>{% if r.gap_primary_independent is not none %}{{ r.gap_primary_independent }}{% else %}n/a{% endif %}</td></tr>
{% endfor %}
</table>
{% else %}<p>None.</p>{% endif %}
{% endfor %}

<h2>Form skew</h2>
<p>{{ skew.within_tolerance }} district(s) reconciled within tolerance.</p>
{% if skew.rows %}
<table border="1">
<tr><th>District</th><th>Constituency</th><th>Party-list</th><th>Diff</th><th>Direction</th></tr>
{% for r in skew.rows %}
<tr><td>{{ r.district }}</td><td>{{ r.constituency_total }}</td><td>{{ r.party_list_total }}</td>
<td>{{ r.reported_diff }}</td><td>{{ r.direction }}</td></tr>
{% endfor %}
</table>
{% endif %}

<h2>Coverage</h2>
<p>{{ coverage.fully_covered }} of {{ coverage.keys_total }} key(s) fully covered.</p>
{% if coverage.gaps %}
<table border="1">
<tr><th>Key</th><th>Missing</th><th>Confidence</th></tr>
{% for g in coverage.gaps %}
<tr><td>{{ g.key }}</td><td>{{ g.missing | join(", ") }}</td><td>{{ g.confidence }}</td></tr>
{% endfor %}
</table>
{% endif %}

<h2>Seats ({{ seats.total_seats }} over {{ seats.total_votes }} votes, quota {{ seats.quota }})</h2>
{% if seats.tie_at_cutoff %}<p><strong>Note:</strong> tie at the remainder cutoff.</p>{% endif %}
<table border="1">
<tr><th>Party</th><th>Name</th><th>Base</th><th>Remainder</th><th>Total</th></tr>
{% for r in seats.rows %}
<tr><td>{{ r.party }}</td><td>{% if r.party_name %}{{ r.party_name }}{% endif %}</td><td>{{ r.base_seats }}</td>
<td>{{ r.remainder_seats }}</td><td>{{ r.total_seats }}</td></tr>
{% endfor %}
</table>

<h2>Integrity</h2>
<p>Engine: {{ integrity.engine_name }} v{{ integrity.engine_version }} ({{ integrity.engine_build }})</p>
<p>Run: {{ integrity.run_id }} at {{ integrity.timestamp_utc }}</p>
<p>Result: {{ integrity.result_id }} (sha256 {{ integrity.result_sha256 }})</p>
<p>Snapshot sha256: {{ integrity.snapshot_sha256 }}</p>
</html>
"#;

    let mut env = Environment::new();
    env.add_template("report.html", TEMPLATE)
        .map_err(|_| ReportError::Template("add_template"))?;
    let tmpl = env
        .get_template("report.html")
        .map_err(|_| ReportError::Template("get_template"))?;

    let ctx = context! {
        cover => &model.cover,
        s => &model.run_summary,
        tiers => vec![
            serde_json::json!({"name": "P1", "rows": &model.irregularities.p1}),
            serde_json::json!({"name": "P2", "rows": &model.irregularities.p2}),
            serde_json::json!({"name": "P3", "rows": &model.irregularities.p3}),
        ],
        skew => &model.skew,
        coverage => &model.coverage,
        seats => &model.seats,
        integrity => &model.integrity,
    };

    tmpl.render(ctx).map_err(|_| ReportError::Template("render_html"))
}

// ===== Helpers (pure) =====

fn json_get_str(root: &serde_json::Value, ptr: &str) -> Result<String, ReportError> {
    root.pointer(ptr)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or(ReportError::MissingField("str field"))
}

fn json_get_u64(root: &serde_json::Value, ptr: &str) -> Result<u64, ReportError> {
    root.pointer(ptr)
        .and_then(|v| v.as_u64())
        .ok_or(ReportError::MissingField("u64 field"))
}

/// Render a `{province, district, form}` key object as `province:district:form`.
fn key_to_string(key: Option<&serde_json::Value>) -> Result<String, ReportError> {
    let key = key.ok_or(ReportError::MissingField("key"))?;
    let province = json_get_str(key, "/province")?;
    let district = json_get_u64(key, "/district")?;
    let form = match json_get_str(key, "/form")?.as_str() {
        "constituency" => "con",
        "party_list" => "pl",
        _ => return Err(ReportError::Inconsistent("key.form")),
    };
    Ok(format!("{province}:{district}:{form}"))
}

fn district_to_string(district: Option<&serde_json::Value>) -> Result<String, ReportError> {
    let d = district.ok_or(ReportError::MissingField("district"))?;
    Ok(format!(
        "{}:{}",
        json_get_str(d, "/province")?,
        json_get_u64(d, "/district")?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_fixture() -> serde_json::Value {
        json!({
            "id": "REC:abc",
            "sha256": "abc",
            "params": {"total_seats": 10},
            "outputs": {
                "stats": {
                    "districts_in": 3, "keys": 2, "sources": 5,
                    "dropped_rows": 1, "duplicate_sources": 0, "shifts_applied": 1
                },
                "consistency_flags": [
                    {"key": {"province": "Nan", "district": 1, "form": "constituency"},
                     "source": "primary", "valid_votes": 10, "sum_of_parts": 9, "delta": -1}
                ],
                "irregularities": [
                    {"key": {"province": "Nan", "district": 1, "form": "constituency"},
                     "severity": 5, "tier": "P1",
                     "flags": ["high_delta_independent", "winner_disagreement"],
                     "gap_primary_independent": 5000},
                    {"key": {"province": "Nan", "district": 2, "form": "party_list"},
                     "severity": 2, "tier": "P3",
                     "flags": ["delta_independent"],
                     "gap_primary_independent": 300}
                ],
                "skew": [
                    {"district": {"province": "Nan", "district": 1},
                     "constituency_total": 110223, "party_list_total": 110021,
                     "raw_diff": 202, "reported_diff": 202,
                     "within_tolerance": false, "direction": "constituency_higher"},
                    {"district": {"province": "Nan", "district": 2},
                     "constituency_total": 100, "party_list_total": 100,
                     "raw_diff": 0, "reported_diff": 0,
                     "within_tolerance": true, "direction": "balanced"}
                ],
                "coverage": {
                    "records": [
                        {"key": {"province": "Nan", "district": 1, "form": "constituency"},
                         "has_primary": true, "has_official": true,
                         "has_volunteer": true, "has_independent": true, "confidence": 100},
                        {"key": {"province": "Nan", "district": 2, "form": "party_list"},
                         "has_primary": true, "has_official": false,
                         "has_volunteer": false, "has_independent": true, "confidence": 60}
                    ],
                    "gaps": [
                        {"province": "Nan", "district": 2, "form": "party_list"}
                    ]
                },
                "seats": {
                    "seats": {
                        "2": {"base_seats": 6, "remainder_seats": 0, "total_seats": 6},
                        "5": {"base_seats": 3, "remainder_seats": 1, "total_seats": 4}
                    },
                    "total_votes": 100000, "total_seats": 10, "quota": 10000,
                    "tie_at_cutoff": false
                },
                "party_names": {"2": "Alpha"}
            }
        })
    }

    fn run_fixture() -> serde_json::Value {
        json!({
            "id": "RUN:2026-02-01T10:00:00Z-0011223344556677",
            "timestamp_utc": "2026-02-01T10:00:00Z",
            "engine": {"name": "trecon", "version": "0.1.0", "build": "dev"},
            "inputs": {"snapshot_sha256": "f".repeat(64)},
            "outputs": {"result_id": "REC:abc", "result_sha256": "abc"}
        })
    }

    #[test]
    fn model_groups_tiers_and_counts_tolerated_skew() {
        let model = build_model(&result_fixture(), &run_fixture()).unwrap();
        assert_eq!(model.irregularities.p1.len(), 1);
        assert!(model.irregularities.p2.is_empty());
        assert_eq!(model.irregularities.p3.len(), 1);
        assert_eq!(model.irregularities.p1[0].key, "Nan:1:con");

        assert_eq!(model.skew.rows.len(), 1);
        assert_eq!(model.skew.within_tolerance, 1);

        assert_eq!(model.coverage.keys_total, 2);
        assert_eq!(model.coverage.fully_covered, 1);
        assert_eq!(model.coverage.gaps.len(), 1);
        assert_eq!(
            model.coverage.gaps[0].missing,
            vec!["official".to_string(), "volunteer".to_string()]
        );

        assert_eq!(model.seats.rows.len(), 2);
        assert_eq!(model.seats.rows[0].party_name.as_deref(), Some("Alpha"));
        assert_eq!(model.run_summary.consistency_flags, 1);
    }

    #[cfg(feature = "render_json")]
    #[test]
    fn json_render_is_stable() {
        let model = build_model(&result_fixture(), &run_fixture()).unwrap();
        let a = render_json(&model).unwrap();
        let b = render_json(&model).unwrap();
        assert_eq!(a, b);
        let v: serde_json::Value = serde_json::from_str(&a).unwrap();
        assert_json_diff::assert_json_include!(
            actual: v,
            expected: serde_json::json!({"cover": {"result_id": "REC:abc"}})
        );
    }

    #[cfg(feature = "render_html")]
    #[test]
    fn html_render_includes_sections() {
        let model = build_model(&result_fixture(), &run_fixture()).unwrap();
        let html = render_html(&model).unwrap();
        assert!(html.contains("Tally Reconciliation Report"));
        assert!(html.contains("Nan:1:con"));
        assert!(html.contains("winner_disagreement"));
        assert!(html.contains("quota 10000"));
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let mut result = result_fixture();
        result.as_object_mut().unwrap().remove("id");
        assert!(matches!(
            build_model(&result, &run_fixture()),
            Err(ReportError::MissingField(_))
        ));
    }
}
