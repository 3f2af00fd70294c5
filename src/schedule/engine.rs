//! The per-node scheduler: candidate enumeration, commit, and the
//! predecessor/successor stitching that keeps every DFG edge routed.
//!
//! Grounded on `Mapper::calculateCost`/`schedule`/`tryToRoute` in the
//! original mapper. `calculateCost` there does two jobs at once (compute a
//! candidate path *and* implicitly gate on capability); this port splits
//! candidate enumeration (`candidates_for_node`) from committing one chosen
//! candidate (`schedule`), matching spec §4.5/§4.6's separation between the
//! placement loop and the scheduler.

use tracing::{debug, trace};

use crate::cgra::TileId;
use crate::dfg::{Dfg, DfgNodeData, NodeId};
use crate::error::MapperError;
use crate::route::cost::{self, Candidate};
use crate::route::{dijkstra, RoutedPath};
use crate::session::MappingSession;

/// `(a - b) mod ii`, normalized into `[0, ii)` regardless of sign
/// (`Mapper::schedule`/`tryToRoute` lean on C++'s `(II + x % II) % II` idiom
/// for the same purpose; this is the well-defined Rust equivalent).
fn modulo_delta(a: u32, b: u32, ii: u32) -> u32 {
    if ii == 0 {
        return 0;
    }
    (a as i64 - b as i64).rem_euclid(ii as i64) as u32
}

/// Enumerates every tile that can legally host `node` right now and scores
/// each with the §4.4 cost model (`Mapper::heuristicMap`'s inner double loop
/// plus `calculateCost`).
///
/// Tiles are visited in row-major (y-major) order, matching spec §5's
/// ordering rule; neighbor/out-link iteration inside the router follows the
/// fabric's own declared order.
pub fn candidates_for_node<D: Dfg>(dfg: &D, session: &MappingSession, node_id: NodeId) -> Vec<Candidate> {
    let node = dfg.node(node_id);
    let fabric = session.fabric();
    let mut out = Vec::new();

    for row in 0..fabric.rows() {
        for col in 0..fabric.cols() {
            let tile = fabric.tile_id(row, col);
            if let Some(path) = candidate_path(dfg, session, node, tile) {
                let cost = cost::calculate_cost(
                    dfg,
                    fabric,
                    session.placement(),
                    node,
                    tile,
                    &path,
                    session.ii(),
                );
                out.push(Candidate { tile, path, cost });
            }
        }
    }
    out
}

/// One tile's candidate path, or `None` if `node` cannot land there at all.
///
/// Mirrors `calculateCost`: if any predecessor of `node` is already placed,
/// route from every such predecessor and keep the path with the *latest*
/// arrival cycle on `tile` (the slowest predecessor gates the join); a
/// routing failure from *any* placed predecessor, or a failed capability
/// check, aborts this tile entirely rather than just skipping that
/// predecessor. If no predecessor is placed, fall back to the earliest idle
/// cycle `tile` offers.
fn candidate_path<D: Dfg>(
    dfg: &D,
    session: &MappingSession,
    node: &DfgNodeData,
    tile: TileId,
) -> Option<RoutedPath> {
    let fabric = session.fabric();
    let placed_preds: Vec<NodeId> = node
        .preds
        .iter()
        .copied()
        .filter(|p| session.is_placed(*p))
        .collect();

    if placed_preds.is_empty() {
        if !fabric.tile(tile).can_support(node) {
            return None;
        }
        let earliest = fabric.tile(tile).min_idle_cycle(node, 0, session.ii());
        if earliest as usize >= session.cycle_boundary() {
            return None;
        }
        return Some(RoutedPath::single(tile, earliest));
    }

    if !fabric.tile(tile).can_support(node) {
        return None;
    }

    let mut best: Option<RoutedPath> = None;
    for pred in placed_preds {
        let pred_node = dfg.node(pred);
        let pred_tile = session.placement_of(pred)?;
        let pred_start = session.start_cycle_of(pred)?;
        let path = dijkstra::shortest_path(
            fabric,
            session.ii(),
            session.cycle_boundary(),
            pred_node,
            pred_tile,
            pred_start,
            node,
            tile,
        )?;
        let (_, arrival) = path.target();
        if arrival as usize >= session.cycle_boundary() {
            return None;
        }
        let better = match &best {
            None => true,
            Some(b) => arrival > b.target().1,
        };
        if better {
            best = Some(path);
        }
    }
    best
}

/// Commits `node` at the chosen candidate: writes its tile occupancy, routes
/// every hop of the candidate path, and stitches in any already-placed
/// predecessors/successors so every incident DFG edge stays routed
/// (`Mapper::schedule`).
pub fn schedule<D: Dfg>(
    dfg: &D,
    session: &mut MappingSession,
    node_id: NodeId,
    candidate: &Candidate,
) -> Result<(), MapperError> {
    let ii = session.ii();
    let static_elastic = session.static_elastic();
    let (tile, start_cycle) = candidate.path.target();
    let node = dfg.node(node_id).clone();

    debug!(node = ?node_id, tile = ?tile, cycle = start_cycle, ii, "schedule");

    session
        .fabric_mut()
        .tile_mut(tile)
        .set_dfg_node(&node, start_cycle, ii, static_elastic);
    session.commit_placement(node_id, tile, start_cycle);

    // Walk the path source -> sink, occupying each link hop. The path's
    // first tile is either `node`'s own tile (single-hop candidate, no
    // routing needed) or an already-placed predecessor's tile whose output
    // is being delivered here.
    let hops = &candidate.path.hops;
    if hops.len() > 1 {
        let (first_tile, first_cycle) = hops[0];
        let producer = session
            .fabric()
            .tile(first_tile)
            .get_mapped_dfg_node(first_cycle)
            .expect("a multi-hop candidate path always starts on a placed predecessor's tile");
        let mut generated_out = true;
        for w in hops.windows(2) {
            let (prev_tile, prev_cycle) = w[0];
            let (cur_tile, cur_cycle) = w[1];
            let link = session
                .fabric()
                .get_link(prev_tile, cur_tile)
                .expect("adjacent hops on a routed path are always linked");

            let is_bypass = cur_tile != tile && prev_cycle + 1 == cur_cycle;
            let duration = if is_bypass {
                modulo_delta(cur_cycle, prev_cycle, ii)
            } else {
                modulo_delta(start_cycle, prev_cycle, ii)
            };
            session.fabric_mut().link_mut(link).occupy(
                producer,
                prev_cycle,
                duration,
                ii,
                is_bypass,
                generated_out,
                static_elastic,
            );
            generated_out = false;
        }
    }

    // Predecessor stitching: route in every other already-placed predecessor
    // whose edge wasn't the one just walked above.
    let (path_src_tile, path_src_cycle) = hops[0];
    for &pred in &node.preds {
        let Some(pred_tile) = session.placement_of(pred) else {
            continue;
        };
        if pred_tile == path_src_tile
            && session
                .fabric()
                .tile(pred_tile)
                .get_mapped_dfg_node(path_src_cycle)
                == Some(pred)
        {
            trace!(pred = ?pred, "skip predecessor routing, already on committed path");
            continue;
        }
        try_to_route(dfg, session, pred, pred_tile, node_id, tile, start_cycle, false)?;
    }

    // Successor stitching: route out to every already-placed successor.
    for &succ in &node.succs {
        let Some(succ_tile) = session.placement_of(succ) else {
            continue;
        };
        let succ_start = session
            .start_cycle_of(succ)
            .expect("placed successor always has a start cycle");
        let succ_node = dfg.node(succ);
        let is_backedge = dfg.shares_cycle(node_id, succ) && node.is_critical && succ_node.is_critical;
        try_to_route(dfg, session, node_id, tile, succ, succ_tile, succ_start, is_backedge)?;
    }

    Ok(())
}

/// Routes an edge between two nodes that are *both already placed*, booking
/// an additional path beyond the one `schedule` walked for the node it just
/// committed (`Mapper::tryToRoute`).
///
/// Prechecks I6 (recurrence timing) whenever `src`/`dst` co-occur on a DFG
/// cycle, and refuses a zero-duration back-edge hop (which would silently
/// double the effective II).
#[allow(clippy::too_many_arguments)]
pub fn try_to_route<D: Dfg>(
    dfg: &D,
    session: &mut MappingSession,
    src: NodeId,
    src_tile: TileId,
    dst: NodeId,
    dst_tile: TileId,
    dst_cycle: u32,
    is_backedge: bool,
) -> Result<(), MapperError> {
    let ii = session.ii();
    let static_elastic = session.static_elastic();
    let src_node = dfg.node(src);
    let dst_node = dfg.node(dst);
    let src_start = session
        .start_cycle_of(src)
        .expect("try_to_route requires a placed source node");

    if dfg.shares_cycle(src, dst) {
        check_recurrence_bound(dfg, session, ii)?;
    }

    let path = dijkstra::shortest_path(
        session.fabric(),
        ii,
        session.cycle_boundary(),
        src_node,
        src_tile,
        src_start,
        dst_node,
        dst_tile,
    )
    .ok_or(MapperError::RouteUnreachable { src, dst, ii })?;

    let hops = &path.hops;
    if hops.len() == 1 {
        let (_, last_cycle) = hops[0];
        let duration = modulo_delta(dst_cycle, last_cycle, ii);
        session.fabric_mut().tile_mut(src_tile).allocate_reg(last_cycle, duration, ii);
    }

    let mut generated_out = true;
    for w in hops.windows(2) {
        let (prev_tile, prev_cycle) = w[0];
        let (cur_tile, cur_cycle) = w[1];
        let link = session
            .fabric()
            .get_link(prev_tile, cur_tile)
            .expect("adjacent hops on a routed path are always linked");

        let is_bypass = cur_tile != dst_tile && prev_cycle + 1 == cur_cycle;
        let mut duration = if is_bypass {
            modulo_delta(cur_cycle, prev_cycle, ii)
        } else {
            modulo_delta(dst_cycle, prev_cycle, ii)
        };
        if duration == 0 {
            if is_backedge {
                return Err(MapperError::BackedgeTimingViolation { cycle_node: dst, ii });
            }
            duration = ii;
        }
        session
            .fabric_mut()
            .link_mut(link)
            .occupy(src, prev_cycle, duration, ii, is_bypass, generated_out, static_elastic);
        generated_out = false;
    }

    if !static_elastic && is_backedge {
        let (_, first_cycle) = hops[0];
        let (_, last_cycle) = hops[hops.len() - 1];
        if last_cycle.saturating_sub(first_cycle) >= ii {
            return Err(MapperError::BackedgeTimingViolation { cycle_node: dst, ii });
        }
    }

    Ok(())
}

/// I6: for every DFG cycle containing both `src` and `dst` that is fully
/// placed, the sum of `(consumer.start - producer.start) mod II` around the
/// cycle must not exceed `II` (`Mapper::tryToRoute`'s pre-check).
fn check_recurrence_bound<D: Dfg>(dfg: &D, session: &MappingSession, ii: u32) -> Result<(), MapperError> {
    for cycle in dfg.cycle_lists() {
        if cycle.len() < 2 {
            continue;
        }
        let mut total = 0u32;
        let mut complete = true;
        let mut last = *cycle.last().unwrap();
        for &n in cycle {
            let (Some(t1), Some(t2)) = (session.start_cycle_of(last), session.start_cycle_of(n)) else {
                complete = false;
                break;
            };
            let mut t2 = t2;
            while t1 >= t2 {
                t2 += ii;
            }
            total += t2 - t1;
            last = n;
        }
        if complete && total > ii {
            return Err(MapperError::BackedgeTimingViolation {
                cycle_node: *cycle.first().unwrap(),
                ii,
            });
        }
    }
    Ok(())
}
