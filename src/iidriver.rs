//! The outer II-sweep driver: computes the initial II, runs the chosen
//! search strategy, and retries at `II+1` on failure.
//!
//! Grounded on `Mapper::getResMII`/`getRecMII`/`heuristicMap`/`exhaustiveMap`/
//! `DFSMap`. Per spec §5, every retry (and every DFS backtrack) reconstructs
//! the MRRG from scratch rather than attempting incremental rollback.

use tracing::{info, instrument, warn};

use crate::cgra::Cgra;
use crate::config::{MapperConfig, SearchMode};
use crate::dfg::{Dfg, NodeId};
use crate::error::MapperError;
use crate::route::cost::{self, Candidate};
use crate::schedule;
use crate::session::MappingSession;

/// The outcome of a successful mapping: the II it succeeded at, and the
/// session holding the final placement/start-cycle/occupancy state.
pub struct MapResult {
    pub ii: u32,
    pub session: MappingSession,
}

/// Resource-bound initiation interval: `ceil(|nodes| / |usable tiles|)`.
pub fn res_mii<D: Dfg>(dfg: &D, fabric: &Cgra) -> u32 {
    let usable = fabric.fu_count().max(1);
    ((dfg.nodes().len() + usable - 1) / usable) as u32
}

/// Recurrence-bound initiation interval: the longest recurrence cycle
/// length (distance-1 approximation per spec §4.6).
pub fn rec_mii<D: Dfg>(dfg: &D) -> u32 {
    dfg.cycle_lists().iter().map(|c| c.len() as u32).max().unwrap_or(0)
}

/// Runs the II sweep to completion: repeatedly constructs a fresh MRRG at
/// increasing II and attempts a full placement with the configured search
/// strategy, until one succeeds or the configured attempt cap is hit.
#[instrument(skip(dfg, fabric, config), fields(search_mode = ?config.search_mode))]
pub fn run<D: Dfg>(dfg: &D, fabric: Cgra, config: &MapperConfig) -> Result<MapResult, MapperError> {
    let seed = config
        .ii_seed
        .unwrap_or_else(|| res_mii(dfg, &fabric).max(rec_mii(dfg)).max(1));

    let mut ii = seed;
    let mut session = MappingSession::new(fabric, config.static_elastic);
    let mut attempts: u32 = 0;

    loop {
        if let Some(cap) = config.max_ii_attempts {
            if attempts >= cap {
                warn!(ii, cap, "II sweep exceeded configured attempt cap");
                return Err(MapperError::IiCapExceeded { cap });
            }
        }
        attempts += 1;
        session.reset(ii);

        let outcome = match config.search_mode {
            SearchMode::Heuristic => heuristic_attempt(dfg, &mut session),
            SearchMode::Exhaustive => exhaustive_attempt(dfg, &mut session),
        };

        match outcome {
            Ok(()) => {
                info!(ii, attempts, "mapping succeeded");
                return Ok(MapResult { ii, session });
            }
            Err(e) => {
                if config.static_elastic {
                    // Spec §4.6: static-elastic architectures are not
                    // modulo-scheduled, so there is no "next II" to retry.
                    return Err(e);
                }
                warn!(ii, error = %e, "II attempt failed, retrying at II+1");
                ii += 1;
            }
        }
    }
}

/// One greedy pass over every DFG node in presentation order
/// (`Mapper::heuristicMap`'s inner loop): rank candidates, commit the
/// cheapest, bail out on the first node with no legal placement.
fn heuristic_attempt<D: Dfg>(dfg: &D, session: &mut MappingSession) -> Result<(), MapperError> {
    let ii = session.ii();
    for &node_id in dfg.nodes() {
        let candidates = schedule::engine::candidates_for_node(dfg, session, node_id);
        if candidates.is_empty() {
            return Err(MapperError::InfeasibleAtII { ii });
        }
        let best = cost::pick_best(&candidates).expect("non-empty candidate list always has a minimum");
        if schedule::engine::schedule(dfg, session, node_id, &candidates[best]).is_err() {
            return Err(MapperError::InfeasibleAtII { ii });
        }
    }
    Ok(())
}

/// Exhaustive DFS with backtracking (`Mapper::DFSMap`): on a failed branch,
/// reconstruct the MRRG and replay the surviving committed prefix rather
/// than trying to undo a single commit (spec §5: occupancy logs don't carry
/// enough history for incremental rollback).
fn exhaustive_attempt<D: Dfg>(dfg: &D, session: &mut MappingSession) -> Result<(), MapperError> {
    let nodes: Vec<NodeId> = dfg.nodes().to_vec();
    let mut committed: Vec<(NodeId, Candidate)> = Vec::with_capacity(nodes.len());
    let ii = session.ii();
    if dfs_map(dfg, session, &nodes, 0, &mut committed) {
        Ok(())
    } else {
        Err(MapperError::ExhaustiveSearchExhausted { ii })
    }
}

fn dfs_map<D: Dfg>(
    dfg: &D,
    session: &mut MappingSession,
    nodes: &[NodeId],
    idx: usize,
    committed: &mut Vec<(NodeId, Candidate)>,
) -> bool {
    if idx == nodes.len() {
        return true;
    }
    let node_id = nodes[idx];
    let mut candidates = schedule::engine::candidates_for_node(dfg, session, node_id);
    candidates.sort_by(|a, b| a.cost.partial_cmp(&b.cost).unwrap());

    for candidate in candidates {
        let committed_ok = schedule::engine::schedule(dfg, session, node_id, &candidate).is_ok();
        if committed_ok {
            committed.push((node_id, candidate));
            if dfs_map(dfg, session, nodes, idx + 1, committed) {
                return true;
            }
            #[cfg(feature = "verbose-backtrack")]
            tracing::trace!(node = ?node_id, depth = idx, "backtracking out of dead branch");
            committed.pop();
        }
        replay_prefix(dfg, session, committed);
    }
    false
}

/// Rebuilds a fresh MRRG at the session's current II and replays every
/// previously-committed node in order (`Mapper::constructMRRG` + the replay
/// loop at the top of `DFSMap`).
fn replay_prefix<D: Dfg>(dfg: &D, session: &mut MappingSession, committed: &[(NodeId, Candidate)]) {
    let ii = session.ii();
    session.reset(ii);
    for (node_id, candidate) in committed {
        schedule::engine::schedule(dfg, session, *node_id, candidate)
            .expect("replaying a previously successful prefix must succeed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgra::Cgra;
    use crate::dfg::{Capability, CapabilitySet, DfgNodeData};

    struct FixtureDfg {
        nodes: Vec<NodeId>,
        data: Vec<DfgNodeData>,
        cycles: Vec<Vec<NodeId>>,
    }

    fn node(
        id: u32,
        capability: Capability,
        preds: &[u32],
        succs: &[u32],
        exec_latency: u32,
        is_pipelinable: bool,
        is_critical: bool,
    ) -> DfgNodeData {
        DfgNodeData {
            id: NodeId(id),
            capability,
            exec_latency,
            is_pipelinable,
            preds: preds.iter().map(|&n| NodeId(n)).collect(),
            succs: succs.iter().map(|&n| NodeId(n)).collect(),
            is_critical,
            is_predicater: false,
            is_predicatee: false,
            predicatees: Vec::new(),
        }
    }

    impl Dfg for FixtureDfg {
        fn nodes(&self) -> &[NodeId] {
            &self.nodes
        }
        fn node(&self, id: NodeId) -> &DfgNodeData {
            &self.data[id.0 as usize]
        }
        fn cycle_lists(&self) -> &[Vec<NodeId>] {
            &self.cycles
        }
    }

    /// S1: 2x2 fully-connected mesh, linear chain a->b->c->d, all single-cycle
    /// add. resMII=1; heuristic-map must land on II=1, one node per tile, and
    /// every consumer one cycle after its producer.
    #[test]
    fn s1_linear_chain_gets_ii_one() {
        let dfg = FixtureDfg {
            nodes: (0..4).map(NodeId).collect(),
            data: vec![
                node(0, Capability::Add, &[], &[1], 1, false, false),
                node(1, Capability::Add, &[0], &[2], 1, false, false),
                node(2, Capability::Add, &[1], &[3], 1, false, false),
                node(3, Capability::Add, &[2], &[], 1, false, false),
            ],
            cycles: vec![],
        };
        let fabric = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let config = MapperConfig::default();
        let result = run(&dfg, fabric, &config).expect("S1 must map");
        assert_eq!(result.ii, 1);

        let mut tiles = std::collections::HashSet::new();
        for n in 0..4u32 {
            let tile = result.session.placement_of(NodeId(n)).unwrap();
            assert!(tiles.insert(tile), "node {n} shares a tile with an earlier node");
        }
        for (u, v) in [(0u32, 1u32), (1, 2), (2, 3)] {
            let cu = result.session.start_cycle_of(NodeId(u)).unwrap();
            let cv = result.session.start_cycle_of(NodeId(v)).unwrap();
            assert_eq!(cv, cu + 1);
        }
    }

    /// S2: 2x2 mesh, single 3-node recurrence a->b->c->a. resMII=1, recMII=3;
    /// heuristic-map must land on II=3 with the cycle's deltas summing to
    /// exactly II.
    #[test]
    fn s2_three_node_recurrence_gets_ii_three() {
        let dfg = FixtureDfg {
            nodes: (0..3).map(NodeId).collect(),
            data: vec![
                node(0, Capability::Add, &[2], &[1], 1, false, true),
                node(1, Capability::Add, &[0], &[2], 1, false, true),
                node(2, Capability::Add, &[1], &[0], 1, false, true),
            ],
            cycles: vec![vec![NodeId(0), NodeId(1), NodeId(2)]],
        };
        let fabric = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let config = MapperConfig::default();
        let result = run(&dfg, fabric, &config).expect("S2 must map");
        assert_eq!(result.ii, 3);

        let ii = result.ii;
        let mut total = 0u32;
        let order = [NodeId(0), NodeId(1), NodeId(2)];
        for w in 0..order.len() {
            let a = order[w];
            let b = order[(w + 1) % order.len()];
            let ca = result.session.start_cycle_of(a).unwrap();
            let mut cb = result.session.start_cycle_of(b).unwrap();
            while cb <= ca {
                cb += ii;
            }
            total += cb - ca;
        }
        assert_eq!(total, ii);
    }

    /// S3: only tile (0,0) carries LOAD; the DFG's one load-tagged node must
    /// land there and the mapping must still succeed.
    #[test]
    fn s3_load_node_pinned_to_only_capable_tile() {
        let dfg = FixtureDfg {
            nodes: (0..2).map(NodeId).collect(),
            data: vec![
                node(0, Capability::Load, &[], &[1], 1, false, false),
                node(1, Capability::Add, &[0], &[], 1, false, false),
            ],
            cycles: vec![],
        };
        let mut fabric = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let origin = fabric.tile_id(0, 0);
        fabric.tile_mut(origin).set_capabilities(CapabilitySet::ADD | CapabilitySet::LOAD);
        let config = MapperConfig::default();
        let result = run(&dfg, fabric, &config).expect("S3 must map");
        let load_tile = result.session.placement_of(NodeId(0)).unwrap();
        assert_eq!(load_tile, result.session.fabric().tile_id(0, 0));
    }

    /// S5: tile (1,1) disabled, 5 independent add nodes on a 2x2 mesh (3
    /// usable tiles). resMII=ceil(5/3)=2; mapper must land on II=2 with no
    /// node on the disabled tile.
    #[test]
    fn s5_disabled_tile_excluded_and_ii_matches_res_mii() {
        let dfg = FixtureDfg {
            nodes: (0..5).map(NodeId).collect(),
            data: (0..5).map(|i| node(i, Capability::Add, &[], &[], 1, false, false)).collect(),
            cycles: vec![],
        };
        let mut fabric = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let disabled = fabric.tile_id(1, 1);
        fabric.disable_tile(disabled);
        let config = MapperConfig::default();
        let result = run(&dfg, fabric, &config).expect("S5 must map");
        assert_eq!(result.ii, 2);
        for n in 0..5u32 {
            let tile = result.session.placement_of(NodeId(n)).unwrap();
            assert_ne!(tile, disabled);
        }
    }

    /// S6: ctrlMemSize=2 on the sole capability-eligible tile, 3 contending
    /// nodes. No II lets all three land (ctrlMemSize caps *distinct* node
    /// commits, not cycles), so the sweep must increment II until the
    /// configured attempt cap is hit rather than ever succeeding.
    #[test]
    fn s6_ctrl_mem_cap_never_admits_a_third_node() {
        let dfg = FixtureDfg {
            nodes: (0..3).map(NodeId).collect(),
            data: (0..3).map(|i| node(i, Capability::Add, &[], &[], 1, false, false)).collect(),
            cycles: vec![],
        };
        let fabric = Cgra::mesh(1, 1, CapabilitySet::ADD, 2, 2);
        let config = MapperConfig {
            max_ii_attempts: Some(5),
            ..MapperConfig::default()
        };
        let err = run(&dfg, fabric, &config).expect_err("ctrlMemSize=2 can never host 3 nodes");
        assert!(matches!(err, MapperError::IiCapExceeded { cap: 5 }));
    }

    /// P8: heuristic-map never returns an II below max(resMII, recMII).
    #[test]
    fn p8_ii_monotonicity() {
        let dfg = FixtureDfg {
            nodes: (0..3).map(NodeId).collect(),
            data: vec![
                node(0, Capability::Add, &[2], &[1], 1, false, true),
                node(1, Capability::Add, &[0], &[2], 1, false, true),
                node(2, Capability::Add, &[1], &[0], 1, false, true),
            ],
            cycles: vec![vec![NodeId(0), NodeId(1), NodeId(2)]],
        };
        let fabric = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let floor = res_mii(&dfg, &fabric).max(rec_mii(&dfg));
        let config = MapperConfig::default();
        let result = run(&dfg, fabric, &config).expect("must map");
        assert!(result.ii >= floor);
    }

    /// P1: a node's periodic occupancy copies agree with its slot at its own
    /// start cycle, for every copy within the cycle boundary.
    #[test]
    fn p1_occupancy_is_modulo_ii_periodic() {
        let dfg = FixtureDfg {
            nodes: (0..3).map(NodeId).collect(),
            data: vec![
                node(0, Capability::Add, &[2], &[1], 1, false, true),
                node(1, Capability::Add, &[0], &[2], 1, false, true),
                node(2, Capability::Add, &[1], &[0], 1, false, true),
            ],
            cycles: vec![vec![NodeId(0), NodeId(1), NodeId(2)]],
        };
        let fabric = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let config = MapperConfig::default();
        let result = run(&dfg, fabric, &config).expect("S2-shaped fixture must map");
        let ii = result.ii;
        let boundary = result.session.cycle_boundary() as u32;

        for n in 0..3u32 {
            let tile = result.session.placement_of(NodeId(n)).unwrap();
            let c0 = result.session.start_cycle_of(NodeId(n)).unwrap();
            let mut k = 1u32;
            while c0 + k * ii < boundary {
                let cycle = c0 + k * ii;
                assert_eq!(
                    result.session.fabric().tile(tile).get_mapped_dfg_node(cycle),
                    result.session.fabric().tile(tile).get_mapped_dfg_node(c0),
                    "node {n}'s occupancy at period {k} must match its occupancy at c0"
                );
                k += 1;
            }
        }
    }

    /// P2/I1: independent single-cycle nodes sharing a tile (because more
    /// nodes exist than tiles) never land on the same cycle residue.
    #[test]
    fn p2_no_two_colocated_nodes_share_a_cycle_residue() {
        let dfg = FixtureDfg {
            nodes: (0..5).map(NodeId).collect(),
            data: (0..5).map(|i| node(i, Capability::Add, &[], &[], 1, false, false)).collect(),
            cycles: vec![],
        };
        let fabric = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let config = MapperConfig::default();
        let result = run(&dfg, fabric, &config).expect("5 independent adds on 2x2 must map");
        let ii = result.ii;

        for a in 0..5u32 {
            for b in (a + 1)..5u32 {
                let ta = result.session.placement_of(NodeId(a)).unwrap();
                let tb = result.session.placement_of(NodeId(b)).unwrap();
                if ta == tb {
                    let ca = result.session.start_cycle_of(NodeId(a)).unwrap();
                    let cb = result.session.start_cycle_of(NodeId(b)).unwrap();
                    assert_ne!(
                        ca % ii,
                        cb % ii,
                        "nodes {a} and {b} share tile {ta:?} and must not share a cycle residue"
                    );
                }
            }
        }
    }

    /// P4: every DFG edge whose endpoints land on different tiles has at
    /// least one link booked to the producer's id (i.e. routing actually
    /// happened rather than being silently skipped).
    #[test]
    fn p4_every_cross_tile_edge_has_a_routed_link() {
        let dfg = FixtureDfg {
            nodes: (0..4).map(NodeId).collect(),
            data: vec![
                node(0, Capability::Add, &[], &[1], 1, false, false),
                node(1, Capability::Add, &[0], &[2], 1, false, false),
                node(2, Capability::Add, &[1], &[3], 1, false, false),
                node(3, Capability::Add, &[2], &[], 1, false, false),
            ],
            cycles: vec![],
        };
        let fabric = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let config = MapperConfig::default();
        let result = run(&dfg, fabric, &config).expect("S1 fixture must map");
        let ii = result.ii;

        for (u, v) in [(0u32, 1u32), (1, 2), (2, 3)] {
            let tu = result.session.placement_of(NodeId(u)).unwrap();
            let tv = result.session.placement_of(NodeId(v)).unwrap();
            if tu == tv {
                continue;
            }
            let routed = result
                .session
                .fabric()
                .links_iter()
                .any(|l| (0..ii).any(|c| l.get_mapped_dfg_node(c) == Some(NodeId(u))));
            assert!(routed, "edge {u}->{v} crosses tiles and must have a booked link");
        }
    }

    /// P6: every placed node's tile supports its capability tag.
    #[test]
    fn p6_placement_respects_capability() {
        let dfg = FixtureDfg {
            nodes: (0..2).map(NodeId).collect(),
            data: vec![
                node(0, Capability::Mul, &[], &[1], 1, false, false),
                node(1, Capability::Add, &[0], &[], 1, false, false),
            ],
            cycles: vec![],
        };
        let mut fabric = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let mul_tile = fabric.tile_id(0, 0);
        fabric.tile_mut(mul_tile).set_capabilities(CapabilitySet::ADD | CapabilitySet::MUL);
        let config = MapperConfig::default();
        let result = run(&dfg, fabric, &config).expect("mixed-capability fixture must map");

        for n in 0..2u32 {
            let node_data = dfg.node(NodeId(n));
            let tile = result.session.placement_of(NodeId(n)).unwrap();
            assert!(
                result.session.fabric().tile(tile).capabilities().contains(node_data.capability.as_flag()),
                "node {n}'s tile must carry its capability"
            );
        }
    }

    /// P7: a disabled tile's incident links never carry occupancy, since
    /// `can_occupy`/`can_support` reject the tile outright and routing can
    /// never pass through its disabled links.
    #[test]
    fn p7_disabled_tile_links_carry_no_occupancy() {
        let dfg = FixtureDfg {
            nodes: (0..4).map(NodeId).collect(),
            data: vec![
                node(0, Capability::Add, &[], &[1], 1, false, false),
                node(1, Capability::Add, &[0], &[2], 1, false, false),
                node(2, Capability::Add, &[1], &[3], 1, false, false),
                node(3, Capability::Add, &[2], &[], 1, false, false),
            ],
            cycles: vec![],
        };
        let mut fabric = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let disabled = fabric.tile_id(1, 1);
        fabric.disable_tile(disabled);
        let config = MapperConfig::default();
        let result = run(&dfg, fabric, &config).expect("chain on a 2x2 mesh minus one tile must map");
        let ii = result.ii;

        for link in result.session.fabric().links_iter() {
            if link.is_disabled() {
                for c in 0..ii {
                    assert!(link.get_mapped_dfg_node(c).is_none(), "a disabled link must never carry occupancy");
                }
            }
        }
    }

    /// P9: replaying the same DFG/fabric through the heuristic search twice
    /// reproduces an identical placement and start-cycle assignment.
    #[test]
    fn p9_idempotent_replay_of_the_same_inputs() {
        let make_dfg = || FixtureDfg {
            nodes: (0..4).map(NodeId).collect(),
            data: vec![
                node(0, Capability::Add, &[], &[1], 1, false, false),
                node(1, Capability::Add, &[0], &[2], 1, false, false),
                node(2, Capability::Add, &[1], &[3], 1, false, false),
                node(3, Capability::Add, &[2], &[], 1, false, false),
            ],
            cycles: vec![],
        };
        let config = MapperConfig::default();

        let fabric_a = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let result_a = run(&make_dfg(), fabric_a, &config).expect("first run must map");

        let fabric_b = Cgra::mesh(2, 2, CapabilitySet::ADD, 4, 2);
        let result_b = run(&make_dfg(), fabric_b, &config).expect("second run must map");

        assert_eq!(result_a.ii, result_b.ii);
        for n in 0..4u32 {
            assert_eq!(
                result_a.session.placement_of(NodeId(n)),
                result_b.session.placement_of(NodeId(n))
            );
            assert_eq!(
                result_a.session.start_cycle_of(NodeId(n)),
                result_b.session.start_cycle_of(NodeId(n))
            );
        }
    }
}
