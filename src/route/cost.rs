//! Placement cost model: ranks candidate `(tile, path)` pairs for a DFG node.
//!
//! Grounded on `Mapper::getOrderedPotentialPaths`/`calculateCost` in the
//! original mapper. The formula is preserved literally, typo included (see
//! spec's Open Questions on the `cols/2 - x` / `rows/2 - x` term): this is a
//! direct, weighted-sum port, not a redesign.

use rustc_hash::FxHashMap;

use crate::cgra::{Cgra, TileId};
use crate::dfg::{Capability, CapabilitySet, Dfg, DfgNodeData, NodeId};
use crate::route::RoutedPath;

/// A scored candidate placement: a tile to host `v` plus the path that would
/// route data onto it, and the scalar cost used to rank it against siblings.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub tile: TileId,
    pub path: RoutedPath,
    pub cost: f64,
}

/// The weighted sum from spec §4.4, computed for one candidate `(tile, path)`.
///
/// `placement` is the mapper session's committed-so-far `NodeId -> TileId`
/// map, needed for the producer-colocation bonus and the crowd-the-hubs
/// penalty, both of which scan nodes already mapped onto neighboring tiles.
pub fn calculate_cost<D: Dfg>(
    dfg: &D,
    fabric: &Cgra,
    placement: &FxHashMap<NodeId, TileId>,
    node: &DfgNodeData,
    tile: TileId,
    path: &RoutedPath,
    ii: u32,
) -> f64 {
    let t = fabric.tile(tile);
    let (_, last_arrival) = path.target();

    let mut cost = last_arrival as f64 + 1.0;

    // Forced stalls: gaps > 1 cycle between consecutive hops along the path.
    let mut gaps = 0usize;
    for w in path.hops.windows(2) {
        let (_, c0) = w[0];
        let (_, c1) = w[1];
        if c1.saturating_sub(c0) > 1 {
            gaps += 1;
        }
    }
    cost += 1.5 * gaps as f64;

    if path.hops.len() == 1 {
        cost += 2.0;
    }

    cost += t.ctrl_mem_items() as f64 / 2.0;

    if node.succs.len() > 1 {
        let rows = fabric.rows() as i32;
        let cols = fabric.cols() as i32;
        let x = t.x();
        // Preserved literally from the original: both terms use `x`, not `y`.
        cost += 4.0 - t.out_links().len() as f64
            + (cols / 2 - x).unsigned_abs() as f64
            + (rows / 2 - x).unsigned_abs() as f64;
    }

    for &pred in &node.preds {
        if dfg.node(pred).succs.len() > 2 {
            if let Some(&pred_tile) = placement.get(&pred) {
                if pred_tile == tile {
                    cost -= 0.5;
                }
            }
        }
    }

    for neighbor in fabric.neighbors(tile) {
        for n in dfg.nodes() {
            if placement.get(n) == Some(&neighbor) && dfg.node(*n).succs.len() > 2 {
                cost += 0.4;
            }
        }
    }

    let can_load = t.capabilities().contains(CapabilitySet::LOAD);
    let can_store = t.capabilities().contains(CapabilitySet::STORE);
    let is_load = matches!(node.capability, Capability::Load);
    let is_store = matches!(node.capability, Capability::Store);
    if (!is_load && can_load) || (!is_store && can_store) {
        cost += 2.0;
    }

    // Multicast-reuse bonus: an already-booked slot on a hop this path reuses.
    for w in path.hops.windows(2) {
        let (left, left_cycle) = w[0];
        let (right, _) = w[1];
        if let Some(link) = fabric.get_link(left, right) {
            if fabric.link(link).is_reused(left_cycle) {
                cost -= 0.5;
            }
        }
    }

    let (target_tile, target_cycle) = path.target();
    debug_assert_eq!(target_tile, tile);
    let free_in = fabric.occupiable_in_links(tile, target_cycle, ii).len();
    let free_out = fabric.occupiable_out_links(tile, target_cycle, ii).len();
    cost -= 0.3 * (free_in + free_out) as f64;

    cost
}

/// Picks the minimum-cost candidate from a non-empty slice, ties broken by
/// iteration order (first minimum wins), matching spec §4.4.
pub fn pick_best(candidates: &[Candidate]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cost.partial_cmp(&b.1.cost).unwrap())
        .map(|(i, _)| i)
}
