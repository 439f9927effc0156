// crates/tr_engine/src/lib.rs
#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

//! tr_engine - the algorithmic layer of the tally-recon engine.
//!
//! Pure, deterministic, I/O-free batch computation over an in-memory
//! snapshot. Every function here is a function of its inputs: no shared
//! state, no clock, no RNG. Anomalies are the *output* of this crate, never
//! errors; data-quality problems flow through as records, and the only
//! rejected inputs are hard contract violations handled upstream in `tr_io`.
//!
//! Components (leaf-first):
//! - [`normalize`]   - per-source normalization + party-index shift heuristic
//! - [`consistency`] - sum-of-parts vs reported valid votes
//! - [`compare`]     - per-key deltas, spreads, winner agreement
//! - [`skew`]        - paired form-type totals within a noise tolerance
//! - [`irregularity`] - severity-tiered, ranked anomaly list
//! - [`apportion`]   - largest-remainder (Hare) seat allocation
//! - [`coverage`]    - presence/absence summary + confidence score

extern crate alloc;

pub mod apportion;
pub mod compare;
pub mod consistency;
pub mod coverage;
pub mod irregularity;
pub mod normalize;
pub mod skew;

// Tight, explicit re-exports (avoid wildcard export drift).
pub use apportion::{apportion_largest_remainder, SeatAllocation, SeatResult};
pub use compare::{compare_sources, gap, ComparisonResult};
pub use consistency::{check_record, ConsistencyFlag};
pub use coverage::{assess_coverage, build_coverage_report, CoverageRecord, CoverageReport};
pub use irregularity::{rank_irregularities, score_key, IrregularityFlag, IrregularityRecord, Tier};
pub use normalize::{normalize_source, ShiftAudit, ShiftRule};
pub use skew::{detect_skew, FormTotals, SkewDirection, SkewRecord};
