//! Largest-remainder (Hare quota) seat apportionment.
//!
//! Contract:
//! - Quota: `floor(V / m)` for `V` total votes and `m` seats.
//! - Floors are `v_i / q` (integer div); remainders are `v_i % q`.
//! - If `q == 0` (tiny totals), floors are 0 and remainders are raw votes.
//! - If `sum_floors < seats` → distribute leftovers by largest remainder
//!   (tie keys: remainder ↓, raw votes ↓, party number ↑).
//! - If `sum_floors > seats` (degenerate quota) → trim from smallest
//!   remainder (remainder ↑, raw votes ↑, party number ↑).
//! - A remainder tie across the award cutoff is *surfaced* via
//!   `tie_at_cutoff`, never resolved beyond the deterministic ranking:
//!   a lawful tiebreak procedure lives outside this engine.
//! - `V == 0` returns an explicit zero result without dividing.
//!
//! Determinism: integer math only; remainder ordering is identical to the
//! fractional-remainder ordering (`v % q` vs `(v % q)/q`), so cutoff ties
//! are exact integer equality with no epsilon.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-party seat split.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeatAllocation {
    pub base_seats: u32,
    pub remainder_seats: u32,
    pub total_seats: u32,
}

/// Apportionment outcome.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeatResult {
    pub seats: BTreeMap<u16, SeatAllocation>,
    pub total_votes: u64,
    pub total_seats: u32,
    /// Hare quota, `floor(total_votes / total_seats)`.
    pub quota: u64,
    /// The last awarded and first excluded remainders were equal.
    pub tie_at_cutoff: bool,
}

/// Allocate `total_seats` across `votes` (party number → vote count).
/// Zero total votes (or an empty map) yields the explicit zero result.
pub fn apportion_largest_remainder(
    total_seats: u32,
    votes: &BTreeMap<u16, u64>,
) -> SeatResult {
    let total_votes: u64 = {
        let sum: u128 = votes.values().map(|&v| v as u128).sum();
        if sum > u64::MAX as u128 { u64::MAX } else { sum as u64 }
    };

    if total_seats == 0 || total_votes == 0 {
        return SeatResult {
            seats: BTreeMap::new(),
            total_votes,
            total_seats,
            quota: 0,
            tie_at_cutoff: false,
        };
    }

    let quota = total_votes / total_seats as u64;

    // Floors and remainders (q == 0 handled: floors 0, remainders raw).
    let mut alloc: BTreeMap<u16, SeatAllocation> = BTreeMap::new();
    let mut remainders: BTreeMap<u16, u64> = BTreeMap::new();
    for (&party, &v) in votes {
        let (base, rem) = if quota == 0 {
            (0u32, v)
        } else {
            let f = v / quota;
            let f = if f > u32::MAX as u64 { u32::MAX } else { f as u32 };
            (f, v % quota)
        };
        alloc.insert(party, SeatAllocation { base_seats: base, remainder_seats: 0, total_seats: base });
        remainders.insert(party, rem);
    }

    let sum_floors: u64 = alloc.values().map(|a| a.base_seats as u64).sum();
    let mut tie_at_cutoff = false;

    if sum_floors < total_seats as u64 {
        let needed = (total_seats as u64 - sum_floors) as u32;
        tie_at_cutoff = distribute_leftovers(needed, &mut alloc, &remainders, votes);
    } else if sum_floors > total_seats as u64 {
        trim_over_allocation(total_seats, &mut alloc, &remainders, votes);
    }

    let awarded: u64 = alloc.values().map(|a| a.total_seats as u64).sum();
    debug_assert_eq!(awarded, total_seats as u64);

    SeatResult {
        seats: alloc,
        total_votes,
        total_seats,
        quota,
        tie_at_cutoff,
    }
}

/// Award `needed` leftover seats by the static largest-remainder ranking.
/// Returns whether the cutoff boundary was tied on remainder.
fn distribute_leftovers(
    needed: u32,
    alloc: &mut BTreeMap<u16, SeatAllocation>,
    remainders: &BTreeMap<u16, u64>,
    votes: &BTreeMap<u16, u64>,
) -> bool {
    if needed == 0 || remainders.is_empty() {
        return false;
    }

    // remainder desc, votes desc, party number asc
    let mut ranking: Vec<(u16, u64, u64)> = remainders
        .iter()
        .map(|(&party, &rem)| (party, rem, *votes.get(&party).unwrap_or(&0)))
        .collect();
    ranking.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| a.0.cmp(&b.0))
    });

    let n = ranking.len();
    let cutoff = needed as usize;
    let tie_at_cutoff = cutoff < n && ranking[cutoff - 1].1 == ranking[cutoff].1;

    let mut given = 0u32;
    let mut idx = 0usize;
    while given < needed {
        let party = ranking[idx].0;
        if let Some(a) = alloc.get_mut(&party) {
            a.remainder_seats += 1;
            a.total_seats += 1;
        }
        given += 1;
        idx += 1;
        if idx == n {
            idx = 0; // cycle if more seats than parties (degenerate quotas)
        }
    }

    tie_at_cutoff
}

/// Remove seats when floors over-allocate (degenerate small quotas),
/// taking from the smallest remainder first: remainder ↑, votes ↑, party ↑.
fn trim_over_allocation(
    target_seats: u32,
    alloc: &mut BTreeMap<u16, SeatAllocation>,
    remainders: &BTreeMap<u16, u64>,
    votes: &BTreeMap<u16, u64>,
) {
    let mut total: u64 = alloc.values().map(|a| a.total_seats as u64).sum();
    if total <= target_seats as u64 {
        return;
    }

    let mut ranking: Vec<(u16, u64, u64)> = alloc
        .iter()
        .filter(|(_, a)| a.total_seats > 0)
        .map(|(&party, _)| {
            (
                party,
                *remainders.get(&party).unwrap_or(&0),
                *votes.get(&party).unwrap_or(&0),
            )
        })
        .collect();
    ranking.sort_by(|a, b| {
        a.1.cmp(&b.1)
            .then_with(|| a.2.cmp(&b.2))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut idx = 0usize;
    while total > target_seats as u64 {
        let party = ranking[idx].0;
        if let Some(a) = alloc.get_mut(&party) {
            if a.total_seats > 0 {
                a.total_seats -= 1;
                if a.remainder_seats > 0 {
                    a.remainder_seats -= 1;
                } else {
                    a.base_seats -= 1;
                }
                total -= 1;
            }
        }
        idx += 1;
        if idx == ranking.len() {
            idx = 0;
        }
    }
}
