//! tr_core - Core types for the tally-recon engine.
//!
//! This crate is **I/O-free**. It defines the stable types/APIs used across
//! the engine (`tr_io`, `tr_engine`, `tr_pipeline`, `tr_report`, `tr_cli`):
//!
//! - Canonical keys: province normalization, `DistrictKey`, `DistrictFormKey`
//! - Source identity (`SourceName`) and the uniform `SourceRecord` shape
//! - Engine parameters (`ReconParams`) - empirical thresholds as configuration
//! - Integer-first helpers (no float arithmetic in the core)
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod keys;
pub mod params;
pub mod records;

pub use keys::{normalize_province, DistrictFormKey, DistrictKey, FormType};
pub use params::ReconParams;
pub use records::{SourceName, SourceRecord, SourceSet};

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain validation.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum CoreError {
        /// A `ReconParams` field is outside its domain.
        DomainOutOfRange(&'static str),
        /// Seat apportionment asked for with zero configured seats.
        ZeroSeats,
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
                CoreError::ZeroSeats => write!(f, "total_seats must be >= 1"),
            }
        }
    }
}
