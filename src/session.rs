//! The mapping session: the arena of mutable state a single II attempt owns.
//!
//! Grounded on the `Mapper` class's member fields (`m_mapping`,
//! `m_mappingTiming`, `m_maxMappingCycle`) in the original, re-architected per
//! spec §9's REDESIGN FLAGS as integer handles over arena vectors rather than
//! raw-pointer-keyed maps. `constructMRRG` is `MappingSession::reset`: it
//! drops and rebuilds every piece of this state wholesale, which is the arena
//! allocation discipline spec §5 calls for (no incremental rollback).

use rustc_hash::FxHashMap;

use crate::cgra::{Cgra, TileId};
use crate::dfg::NodeId;

/// Owns one II attempt's worth of mutable mapping state: the fabric (with its
/// time-expanded occupancy), the placement map, and start cycles.
///
/// A [`MappingSession`] is constructed once per [`crate::iidriver::run`] call
/// and `reset` wholesale on every II retry; it is never shared across
/// sessions.
pub struct MappingSession {
    fabric: Cgra,
    ii: u32,
    static_elastic: bool,
    cycle_boundary: usize,
    placement: FxHashMap<NodeId, TileId>,
    start_cycle: FxHashMap<NodeId, u32>,
}

impl MappingSession {
    pub fn new(fabric: Cgra, static_elastic: bool) -> Self {
        MappingSession {
            fabric,
            ii: 0,
            static_elastic,
            cycle_boundary: 0,
            placement: FxHashMap::default(),
            start_cycle: FxHashMap::default(),
        }
    }

    pub fn fabric(&self) -> &Cgra {
        &self.fabric
    }
    pub fn fabric_mut(&mut self) -> &mut Cgra {
        &mut self.fabric
    }

    pub fn ii(&self) -> u32 {
        self.ii
    }
    pub fn static_elastic(&self) -> bool {
        self.static_elastic
    }
    pub fn cycle_boundary(&self) -> usize {
        self.cycle_boundary
    }

    pub fn placement(&self) -> &FxHashMap<NodeId, TileId> {
        &self.placement
    }
    pub fn start_cycle(&self) -> &FxHashMap<NodeId, u32> {
        &self.start_cycle
    }

    pub fn placement_of(&self, node: NodeId) -> Option<TileId> {
        self.placement.get(&node).copied()
    }
    pub fn start_cycle_of(&self, node: NodeId) -> Option<u32> {
        self.start_cycle.get(&node).copied()
    }
    pub fn is_placed(&self, node: NodeId) -> bool {
        self.placement.contains_key(&node)
    }

    /// Fresh MRRG for a new II attempt (`Mapper::constructMRRG`): clears the
    /// placement and start-cycle maps and rebuilds every tile/link's
    /// time-expanded occupancy from scratch.
    pub fn reset(&mut self, ii: u32) {
        self.ii = ii;
        self.placement.clear();
        self.start_cycle.clear();
        self.cycle_boundary = self.fabric.construct_mrrg(ii, self.static_elastic);
    }

    pub(crate) fn commit_placement(&mut self, node: NodeId, tile: TileId, start_cycle: u32) {
        self.placement.insert(node, tile);
        self.start_cycle.insert(node, start_cycle);
    }
}
