//! The per-edge Dijkstra router.
//!
//! Grounded on `Mapper::dijkstra_search`/`Mapper::tryToRoute`, which share
//! one relaxation loop; this module is the single place that loop lives.
//! The neighbor relaxation deliberately probes cycle by cycle rather than
//! computing a closed-form earliest slot, because the cost later assigned to
//! an edge (`distance[minNode] + (cycle - timing[minNode]) + 1`) depends on
//! how many probe steps were needed, not just on the slot it lands on.

use crate::cgra::{Cgra, TileId};
use crate::dfg::DfgNodeData;
use crate::route::RoutedPath;

/// Finds the lowest-cost path from `src_node` (already occupying `src_tile`
/// from `src_start_cycle`) to `dst_node` on `dst_tile`.
///
/// Returns `None` if the search pool empties without reaching `dst_tile`, or
/// if the tile is reached but fails its own `can_occupy` check there.
pub fn shortest_path(
    fabric: &Cgra,
    ii: u32,
    cycle_boundary: usize,
    src_node: &DfgNodeData,
    src_tile: TileId,
    src_start_cycle: u32,
    dst_node: &DfgNodeData,
    dst_tile: TileId,
) -> Option<RoutedPath> {
    let n = fabric.rows() * fabric.cols();
    let boundary = cycle_boundary as u32;

    let mut distance = vec![boundary; n];
    let mut timing = vec![0u32; n];
    let mut previous: Vec<Option<TileId>> = vec![None; n];
    let mut in_pool = vec![true; n];

    for idx in 0..n {
        timing[idx] = src_start_cycle + src_node.exec_latency - 1;
    }
    distance[src_tile.0 as usize] = 0;

    let mut remaining = n;
    while remaining > 0 {
        let mut min_idx = None;
        let mut min_dist = boundary + 1;
        for idx in 0..n {
            if in_pool[idx] && distance[idx] < min_dist {
                min_dist = distance[idx];
                min_idx = Some(idx);
            }
        }
        let cur_idx = match min_idx {
            Some(i) => i,
            None => break,
        };
        in_pool[cur_idx] = false;
        remaining -= 1;
        let cur_tile = TileId(cur_idx as u32);

        if cur_tile == dst_tile {
            timing[cur_idx] = fabric.tile(cur_tile).min_idle_cycle(dst_node, timing[cur_idx], ii);
            break;
        }

        for neighbor in fabric.neighbors(cur_tile) {
            let link_id = match fabric.get_link(cur_tile, neighbor) {
                Some(l) => l,
                None => continue,
            };
            let mut cycle = timing[cur_idx];
            loop {
                if cycle > boundary {
                    break;
                }
                if fabric.link(link_id).can_occupy(src_node.id, cycle, ii, false) {
                    let cost = distance[cur_idx] + (cycle - timing[cur_idx]) + 1;
                    let nidx = neighbor.0 as usize;
                    if cost < distance[nidx] {
                        distance[nidx] = cost;
                        timing[nidx] = cycle + 1;
                        previous[nidx] = Some(cur_tile);
                    }
                    break;
                }
                cycle += 1;
            }
        }
    }

    if timing[dst_tile.0 as usize] > boundary {
        return None;
    }
    if !fabric
        .tile(dst_tile)
        .can_occupy(dst_node, timing[dst_tile.0 as usize], ii)
    {
        return None;
    }

    let mut hops = vec![(dst_tile, timing[dst_tile.0 as usize])];
    let mut cur = dst_tile;
    while cur != src_tile {
        match previous[cur.0 as usize] {
            Some(prev) => {
                hops.push((prev, timing[prev.0 as usize]));
                cur = prev;
            }
            None => return None,
        }
    }
    hops.reverse();
    Some(RoutedPath { hops })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfg::{Capability, CapabilitySet, DfgNodeData, NodeId};

    fn single_cycle(id: u32, capability: Capability) -> DfgNodeData {
        DfgNodeData {
            id: NodeId(id),
            capability,
            exec_latency: 1,
            is_pipelinable: false,
            preds: Vec::new(),
            succs: Vec::new(),
            is_critical: false,
            is_predicater: false,
            is_predicatee: false,
            predicatees: Vec::new(),
        }
    }

    /// A value produced on one tile of a 2x2 mesh at cycle 0 must reach the
    /// diagonal tile in exactly two hops, landing no earlier than cycle 2.
    #[test]
    fn two_hop_route_across_a_mesh_corner() {
        let mut fabric = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let ii = 4;
        fabric.construct_mrrg(ii, false);

        let src_tile = fabric.tile_id(0, 0);
        let dst_tile = fabric.tile_id(1, 1);
        let src_node = single_cycle(0, Capability::Add);
        let dst_node = single_cycle(1, Capability::Add);

        let path = shortest_path(&fabric, ii, fabric.fu_count() * ii as usize * ii as usize, &src_node, src_tile, 0, &dst_node, dst_tile)
            .expect("a 2x2 mesh always routes corner to corner");
        assert_eq!(path.hops.len(), 2);
        assert_eq!(path.target().0, dst_tile);
        assert!(path.target().1 >= 1);
    }

    /// No route exists once every link into the destination is disabled.
    #[test]
    fn unreachable_destination_returns_none() {
        let mut fabric = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        fabric.construct_mrrg(4, false);
        let dst = fabric.tile_id(1, 1);
        fabric.disable_tile(dst);

        let src_node = single_cycle(0, Capability::Add);
        let dst_node = single_cycle(1, Capability::Add);
        let result = shortest_path(&fabric, 4, 64, &src_node, fabric.tile_id(0, 0), 0, &dst_node, dst);
        assert!(result.is_none());
    }
}
