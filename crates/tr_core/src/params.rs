//! Engine parameters.
//!
//! Every numeric threshold in the engine was chosen empirically from one
//! observed dataset. They are configuration, not law: all of them live here
//! with serde defaults so a params file can override any subset.

use crate::errors::CoreError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const DEFAULT_NOISE_TOLERANCE: u64 = 200;
pub const DEFAULT_GAP_HIGH: u64 = 1_000;
pub const DEFAULT_GAP_WARN: u64 = 200;
pub const DEFAULT_INVALID_BLANK_RATIO_PCT: u32 = 10;
pub const DEFAULT_VOLUNTEER_GAP: u64 = 5_000;
pub const DEFAULT_TOTAL_SEATS: u32 = 100;

/// Tunable thresholds shared by the skew detector, irregularity scorer,
/// coverage reporter and seat apportionment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ReconParams {
    /// |raw diff| at or under this reports as zero skew (raw kept for audit).
    pub noise_tolerance: u64,
    /// Primary↔Independent gap scoring +3 and the heavy coverage penalty.
    pub gap_high: u64,
    /// Primary↔Independent gap scoring +2 and the light coverage penalty.
    pub gap_warn: u64,
    /// (invalid+blank)/valid percentage that flags the Primary record.
    pub invalid_blank_ratio_pct: u32,
    /// Primary↔Volunteer gap worth an informational flag.
    pub volunteer_gap: u64,
    /// Seats distributed by the largest-remainder calculator.
    pub total_seats: u32,
}

impl Default for ReconParams {
    fn default() -> Self {
        ReconParams {
            noise_tolerance: DEFAULT_NOISE_TOLERANCE,
            gap_high: DEFAULT_GAP_HIGH,
            gap_warn: DEFAULT_GAP_WARN,
            invalid_blank_ratio_pct: DEFAULT_INVALID_BLANK_RATIO_PCT,
            volunteer_gap: DEFAULT_VOLUNTEER_GAP,
            total_seats: DEFAULT_TOTAL_SEATS,
        }
    }
}

impl ReconParams {
    /// Domain checks applied once at the boundary, before any run.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.total_seats == 0 {
            return Err(CoreError::ZeroSeats);
        }
        if self.gap_warn > self.gap_high {
            return Err(CoreError::DomainOutOfRange("gap_warn > gap_high"));
        }
        if self.invalid_blank_ratio_pct > 100 {
            return Err(CoreError::DomainOutOfRange("invalid_blank_ratio_pct > 100"));
        }
        Ok(())
    }
}
