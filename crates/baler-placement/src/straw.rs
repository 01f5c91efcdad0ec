//! Weighted straw selection strategies.
//!
//! Both strategies turn a hash of (object id, item id, round) into a
//! per-item draw, combine it with the item's weight, and pick the extreme
//! draw. Each item's draw depends only on that item's own id and weight,
//! which is what keeps data movement minimal when weights change: altering
//! one item's weight can only change decisions whose previous winner
//! scored close to that item, never shuffle objects between two unrelated
//! items.
//!
//! The fixed-point constants below (16-bit draw domain, `2^44` log scale,
//! `2^48` bias, the `0xa5a5a5a5` re-mix, the 510 lane recenter, the
//! 42-bit shift) were tuned empirically for distribution quality and are
//! part of the contract. The two strategies deliberately use opposite
//! comparison directions (arg-max vs arg-min); do not unify them.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::bucket::{Item, ObjectId};
use crate::error::{PlacementError, Result};
use crate::hash::{mix1, mix3};

/// Default cap on reject-and-retry attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Bias subtracted from log-table entries so draws span `[-2^48, 0]`.
const LN_BIAS: i64 = 1 << 48;

/// Fixed-point scale of the log table (16.44 style fixed point).
const LN_SCALE: f64 = (1u64 << 44) as f64;

/// Constant re-mixed into the first hash to derive independent randomness
/// for the second Straw2Plus lane.
const REMIX: u32 = 0xa5a5_a5a5;

/// Center of the sum of four uniform bytes; recentering makes each
/// 16-bit lane zero-mean.
const LANE_CENTER: i64 = 4 * 255 / 2;

/// Selection strategy for a bucket.
///
/// Chosen once at bucket construction; the two strategies must not be
/// mixed within one bucket, since their draws use opposite sign
/// conventions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Log-transform draw ("longest straw wins").
    ///
    /// Maps a 16-bit uniform value through a fixed-point logarithm table
    /// to get a pseudo-exponential draw, divides by weight, and takes the
    /// maximum. Best distribution quality.
    #[default]
    Straw2,
    /// Moment-approximation draw.
    ///
    /// Approximates an exponential variate as a sum of squares of two
    /// recentered byte-sum lanes, avoiding the log table at the cost of a
    /// coarser approximation. Takes the minimum.
    Straw2Plus,
}

/// Scaled logarithm lookup, `u` in `0..=0xffff`.
///
/// Entry `u` is `trunc(log2(u + 1) * 2^44)`: monotonic over the domain,
/// 0 at `u = 0`, exactly `2^48` at `u = 0xffff`. Built once on first use.
fn ln_fixed(u: u32) -> i64 {
    static LN_TABLE: OnceLock<Vec<i64>> = OnceLock::new();
    let table = LN_TABLE
        .get_or_init(|| (0u32..=0xffff).map(|v| (f64::from(v + 1).log2() * LN_SCALE) as i64).collect());
    table[u as usize]
}

/// Select among eligible items, skipping disabled and zero-weight items
/// inline. Returns the winning item's index, or `None` when nothing is
/// eligible.
pub(crate) fn select(strategy: Strategy, items: &[Item], object: ObjectId, round: u32) -> Option<usize> {
    match strategy {
        Strategy::Straw2 => straw2(items, object, round, true),
        Strategy::Straw2Plus => straw2_plus(items, object, round, true),
    }
    .map(|(idx, _)| idx)
}

/// Reject-and-retry selection, reporting the number of attempts taken.
///
/// Scores every weighted item regardless of its disabled flag; if the
/// overall winner is disabled, the whole selection restarts with the next
/// round folded into the hash. The steady-state distribution among enabled
/// items matches inline filtering; this variant only exists to surface
/// attempt counts (expected attempts are `1 / (1 - disabled weight
/// fraction)`).
///
/// # Errors
///
/// `NoEligibleItem` immediately when no enabled item with positive weight
/// exists (the unguarded formulation would spin forever on that input),
/// `RetryExhausted` if `max_attempts` rounds all land on disabled items.
pub(crate) fn select_with_attempts(
    strategy: Strategy,
    items: &[Item],
    object: ObjectId,
    max_attempts: u32,
) -> Result<(usize, u32)> {
    if !items.iter().any(Item::is_eligible) {
        return Err(PlacementError::NoEligibleItem);
    }
    for round in 0..max_attempts {
        let winner = match strategy {
            Strategy::Straw2 => straw2(items, object, round, false),
            Strategy::Straw2Plus => straw2_plus(items, object, round, false),
        };
        if let Some((idx, _)) = winner {
            if !items[idx].disabled() {
                return Ok((idx, round + 1));
            }
        }
    }
    Err(PlacementError::RetryExhausted { attempts: max_attempts })
}

/// Log-transform draw: maximum of `ln(u) / weight` wins.
fn straw2(items: &[Item], object: ObjectId, round: u32, filter_disabled: bool) -> Option<(usize, i64)> {
    let mut best = None;
    let mut high = i64::MIN;
    for (idx, item) in items.iter().enumerate() {
        if item.weight() == 0 || (filter_disabled && item.disabled()) {
            continue;
        }
        let u = mix3(object, item.id(), round) & 0xffff;
        let ln = ln_fixed(u) - LN_BIAS;
        let draw = ln / i64::from(item.weight());
        if draw > high {
            high = draw;
            best = Some((idx, draw));
        }
    }
    best
}

/// Moment-approximation draw: minimum of the squared-lane statistic over
/// weight wins.
fn straw2_plus(
    items: &[Item],
    object: ObjectId,
    round: u32,
    filter_disabled: bool,
) -> Option<(usize, i64)> {
    let mut best = None;
    let mut low = i64::MAX;
    for (idx, item) in items.iter().enumerate() {
        if item.weight() == 0 || (filter_disabled && item.disabled()) {
            continue;
        }
        let rnd1 = mix3(object, item.id(), round);
        let rnd2 = mix1(rnd1 ^ REMIX);

        // Two 16-bit lanes, each holding the sum of four bytes. The lane
        // sums stay under 2^16, so the additions never carry across lanes.
        let s = (rnd1 & 0x00ff_00ff)
            .wrapping_add((rnd1 >> 8) & 0x00ff_00ff)
            .wrapping_add(rnd2 & 0x00ff_00ff)
            .wrapping_add((rnd2 >> 8) & 0x00ff_00ff);

        let sum1 = i64::from(s & 0xffff) - LANE_CENTER;
        let sum2 = i64::from(s >> 16) - LANE_CENTER;
        // Sum of squares of two zero-mean lanes approximates an
        // exponential variate without a log table.
        let mut draw = sum1 * sum1 + sum2 * sum2;
        draw <<= 42;
        draw /= i64::from(item.weight());
        if draw < low {
            low = draw;
            best = Some((idx, draw));
        }
    }
    best
}
