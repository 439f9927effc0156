//! Canonical key resolution.
//!
//! Identity of a record is `(province, district_number, form_type)`. Source
//! feeds spell provinces inconsistently (administrative prefixes, stray
//! whitespace), so every key goes through [`normalize_province`] first.
//! Records whose identity cannot be resolved are out of scope for the whole
//! engine - resolution returns `None`, never an error.

use alloc::string::String;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Administrative prefixes that appear in front of province names in the
/// wild. Stripping is repeated until the name is stable, which also makes
/// normalization idempotent for doubled prefixes.
const PROVINCE_PREFIXES: &[&str] = &["จังหวัด", "จ.", "Changwat", "Province of", "Province"];

/// Normalize a raw province spelling: trim, collapse internal whitespace to
/// single spaces, and strip known administrative prefixes until stable.
/// Idempotent: `normalize_province(&normalize_province(x)) == normalize_province(x)`.
pub fn normalize_province(raw: &str) -> String {
    let mut s = collapse_whitespace(raw);
    loop {
        let mut changed = false;
        for prefix in PROVINCE_PREFIXES {
            if let Some(rest) = s.strip_prefix(prefix) {
                // Word-boundary guard for Latin prefixes: "Changwat Nan" strips,
                // "Changwatna" does not. Thai script has no word spacing.
                let prefix_ends_alpha = prefix.ends_with(|c: char| c.is_ascii_alphabetic());
                let rest_starts_alpha = rest.starts_with(|c: char| c.is_ascii_alphabetic());
                if prefix_ends_alpha && rest_starts_alpha {
                    continue;
                }
                s = collapse_whitespace(rest);
                changed = true;
            }
        }
        if !changed {
            return s;
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for ch in s.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

/// Ballot form counted for a district. One district produces both forms,
/// with distinct canonical keys but shared district identity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FormType {
    Constituency,
    PartyList,
}

impl FormType {
    /// Short code used in canonical key rendering.
    pub fn code(self) -> &'static str {
        match self {
            FormType::Constituency => "con",
            FormType::PartyList => "pl",
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// District identity: `(province, district_number)`. Shared by both form
/// types; used to pair their totals in the skew detector.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistrictKey {
    pub province: String,
    pub district: u32,
}

impl DistrictKey {
    /// Resolve from raw inputs. `None` when the normalized province is empty
    /// or the district number is non-positive - such records are simply out
    /// of scope, not errors.
    pub fn resolve(raw_province: &str, district: i64) -> Option<Self> {
        let province = normalize_province(raw_province);
        if province.is_empty() {
            return None;
        }
        let district = u32::try_from(district).ok()?;
        if district == 0 {
            return None;
        }
        Some(DistrictKey { province, district })
    }
}

impl fmt::Display for DistrictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.province, self.district)
    }
}

/// Full canonical key: `(province, district_number, form_type)`. Unique per
/// form; stable across runs.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistrictFormKey {
    pub province: String,
    pub district: u32,
    pub form: FormType,
}

impl DistrictFormKey {
    pub fn resolve(raw_province: &str, district: i64, form: FormType) -> Option<Self> {
        let DistrictKey { province, district } = DistrictKey::resolve(raw_province, district)?;
        Some(DistrictFormKey { province, district, form })
    }

    /// The district identity shared with the paired form type.
    pub fn district_key(&self) -> DistrictKey {
        DistrictKey {
            province: self.province.clone(),
            district: self.district,
        }
    }
}

impl fmt::Display for DistrictFormKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.province, self.district, self.form.code())
    }
}
