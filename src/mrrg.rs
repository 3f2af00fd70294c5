//! Shared constants and iteration helpers for the modulo routing resource
//! graph (MRRG).
//!
//! The MRRG is not a distinct data structure in this crate: it is the
//! collective, time-expanded occupancy state owned by [`crate::cgra::Tile`]
//! and [`crate::cgra::Link`], periodic with stride `II` (invariant I1). This
//! module only holds the handful of quantities and helpers both of those
//! types need to stay consistent with each other.

/// Upper bound on the cycle axis for a fabric of `tile_count` tiles at the
/// given `II`. Every occupancy table is sized to this many slots.
///
/// Mirrors the original mapper's `tileCount * II * II`: large enough that a
/// value can traverse the whole fabric and wrap the II period many times
/// over before the search gives up.
pub fn cycle_boundary(tile_count: usize, ii: u32) -> usize {
    tile_count * ii as usize * ii as usize
}

/// Iterates the periodic copies of `cycle`'s residue (`cycle`, `cycle+II`,
/// `cycle+2*II`, ...) up to `bound` (exclusive).
///
/// In static-elastic mode (invariant I1's degenerate case) occupancy is not
/// periodic at all: callers pass `static_elastic = true` to get a single-shot
/// iterator over just `cycle` itself instead of wrapping every `ii` slots.
pub fn periodic_slots(cycle: u32, ii: u32, bound: usize, static_elastic: bool) -> impl Iterator<Item = u32> {
    let stride = ii.max(1);
    let start = if static_elastic { cycle } else { cycle % stride };
    std::iter::successors(Some(start), move |c| {
        if static_elastic {
            None
        } else {
            Some(c + stride)
        }
    })
    .take_while(move |c| (*c as usize) < bound)
}
