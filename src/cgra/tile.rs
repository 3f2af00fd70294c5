//! A single functional-unit tile and its time-expanded occupancy table.
//!
//! Grounded on `CGRANode::canOccupy`/`setDFGNode`/`allocateReg` in the
//! original mapper: a tile tracks, per cycle slot, which DFG node (if any)
//! occupies it and in which [`Phase`] of a possibly multi-cycle op.

use crate::cgra::{LinkId, TileId};
use crate::dfg::{CapabilitySet, DfgNodeData, NodeId};
use crate::mrrg;

/// Which part of a (possibly pipelined) multi-cycle operation a slot holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Phase {
    /// A single-cycle op, or a non-pipelinable multi-cycle op's only slot.
    Single,
    /// First cycle of a pipelined multi-cycle op.
    PipeStart,
    /// An interior cycle of a pipelined multi-cycle op.
    PipeIn,
    /// Last cycle of a pipelined multi-cycle op.
    PipeEnd,
}

#[derive(Copy, Clone, Debug)]
struct Occupant {
    node: NodeId,
    phase: Phase,
    /// The occupying node's FU class and pipelinability, carried alongside
    /// the phase so a later boundary-slot check can test `sharesFU` and
    /// "both pipelinable" against the node already sitting in the slot, not
    /// just the node being tested (`CGRANode::canOccupy`'s
    /// `t_opt->shareFU(p.first)`/`p.first->isPipelinable()`).
    capability: CapabilitySet,
    is_pipelinable: bool,
}

/// A functional-unit tile: capability set, control-memory budget, register
/// file, and the occupancy slots that make it part of the MRRG.
#[derive(Debug)]
pub struct Tile {
    id: TileId,
    x: i32,
    y: i32,
    capabilities: CapabilitySet,
    ctrl_mem_size: u32,
    register_count: u32,
    disabled: bool,

    in_links: Vec<LinkId>,
    out_links: Vec<LinkId>,

    cycle_boundary: usize,
    occupancy: Vec<Vec<Occupant>>,
    ctrl_mem_items: u32,
    /// `regs_timing[reg][cycle]` / duration, `-1` meaning free. Indexed
    /// `[register][cycle]` to mirror the original's per-register scan.
    regs_timing: Vec<Vec<i32>>,
    regs_duration: Vec<Vec<i32>>,
}

impl Tile {
    pub fn new(
        id: TileId,
        x: i32,
        y: i32,
        capabilities: CapabilitySet,
        ctrl_mem_size: u32,
        register_count: u32,
    ) -> Self {
        Tile {
            id,
            x,
            y,
            capabilities,
            ctrl_mem_size,
            register_count,
            disabled: false,
            in_links: Vec::new(),
            out_links: Vec::new(),
            cycle_boundary: 0,
            occupancy: Vec::new(),
            ctrl_mem_items: 0,
            regs_timing: Vec::new(),
            regs_duration: Vec::new(),
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }
    pub fn x(&self) -> i32 {
        self.x
    }
    pub fn y(&self) -> i32 {
        self.y
    }
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }
    /// Overrides this tile's capability set after construction, for hosts
    /// assembling a heterogeneous fabric on top of [`crate::cgra::Cgra::mesh`]'s
    /// uniform starting point.
    pub fn set_capabilities(&mut self, capabilities: CapabilitySet) {
        self.capabilities = capabilities;
    }
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
    pub fn in_links(&self) -> &[LinkId] {
        &self.in_links
    }
    pub fn out_links(&self) -> &[LinkId] {
        &self.out_links
    }
    pub fn ctrl_mem_items(&self) -> u32 {
        self.ctrl_mem_items
    }

    pub(crate) fn push_in_link(&mut self, link: LinkId) {
        self.in_links.push(link);
    }
    pub(crate) fn push_out_link(&mut self, link: LinkId) {
        self.out_links.push(link);
    }

    /// Resets all time-expanded state for a fresh II attempt.
    pub fn construct_mrrg(&mut self, cycle_boundary: usize) {
        self.cycle_boundary = cycle_boundary;
        self.occupancy = vec![Vec::new(); cycle_boundary];
        self.ctrl_mem_items = 0;
        let regs = self.register_count.max(1) as usize;
        self.regs_timing = vec![vec![-1; cycle_boundary]; regs];
        self.regs_duration = vec![vec![-1; cycle_boundary]; regs];
    }

    /// Cascading disable: the fabric also disables this tile's incident
    /// links (`CGRANode::disable` propagates to every in/out link).
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    /// Capability check only, ignoring occupancy (`CGRANode::canSupport`).
    pub fn can_support(&self, node: &DfgNodeData) -> bool {
        !self.disabled && self.capabilities.contains(node.capability.as_flag())
    }

    /// Full placement feasibility check for `node` starting at `cycle`
    /// (`CGRANode::canOccupy`).
    pub fn can_occupy(&self, node: &DfgNodeData, cycle: u32, ii: u32) -> bool {
        if self.disabled || !self.can_support(node) {
            return false;
        }
        if self.ctrl_mem_items + 1 > self.ctrl_mem_size {
            return false;
        }

        if !node.is_multi_cycle() {
            return mrrg::periodic_slots(cycle, ii, self.cycle_boundary, false)
                .all(|c| self.slot_free_for_single(c as usize));
        }

        let last = node.exec_latency - 1;
        for start in mrrg::periodic_slots(cycle, ii, self.cycle_boundary, false) {
            if !self.slot_free_for_start(start as usize, node) {
                return false;
            }
            let end = start + last;
            if (end as usize) >= self.cycle_boundary {
                // No more periodic copies can fit their end slot inside the
                // boundary either (end only grows with start); accept what
                // has been checked so far and stop scanning further copies
                // (`CGRANode::canOccupy`'s "if(end < cycleBoundary) ...").
                break;
            }
            if !self.slot_free_for_end(end as usize, node) {
                return false;
            }
        }
        true
    }

    fn slot_free_for_single(&self, cycle: usize) -> bool {
        self.occupancy[cycle]
            .iter()
            .all(|o| o.phase == Phase::PipeIn)
    }

    /// Whether `node` and an existing `occupant` may legally share a slot:
    /// they must target different FU classes, or both be pipelinable
    /// (`CGRANode::canOccupy`'s `shareFU(...) and (not isPipelinable() or
    /// not isPipelinable())` guard, tested against the occupant actually
    /// sitting in the slot rather than just `node`).
    fn coexists_with(node: &DfgNodeData, occupant: &Occupant) -> bool {
        let shares_fu = occupant.capability == node.capability.as_flag();
        !shares_fu || (occupant.is_pipelinable && node.is_pipelinable)
    }

    /// The start slot of a multi-cycle op: conflicts with any `Single` or
    /// `PipeStart` occupant outright; a `PipeIn`/`PipeEnd` occupant is only a
    /// conflict if it shares `node`'s FU class and the two aren't both
    /// pipelinable.
    fn slot_free_for_start(&self, cycle: usize, node: &DfgNodeData) -> bool {
        self.occupancy[cycle].iter().all(|o| match o.phase {
            Phase::Single | Phase::PipeStart => false,
            Phase::PipeIn | Phase::PipeEnd => Self::coexists_with(node, o),
        })
    }

    /// The end slot of a multi-cycle op: conflicts with any `Single` or
    /// `PipeEnd` occupant outright; a `PipeIn`/`PipeStart` occupant is only a
    /// conflict under the same FU-class/pipelinability rule as the start
    /// slot.
    fn slot_free_for_end(&self, cycle: usize, node: &DfgNodeData) -> bool {
        self.occupancy[cycle].iter().all(|o| match o.phase {
            Phase::Single | Phase::PipeEnd => false,
            Phase::PipeIn | Phase::PipeStart => Self::coexists_with(node, o),
        })
    }

    /// Scans `cycle, cycle+II, cycle+2*II, …` for a `Single`/`PipeStart`
    /// occupant, starting at `cycle` itself rather than its `II`-residue
    /// (`CGRANode::isOccupied` walks forward from the cycle it's asked
    /// about, it does not fold back to an earlier periodic copy).
    pub fn is_occupied(&self, cycle: u32, ii: u32) -> bool {
        let stride = ii.max(1);
        let mut c = cycle;
        while (c as usize) < self.cycle_boundary {
            if self.occupancy[c as usize]
                .iter()
                .any(|o| matches!(o.phase, Phase::Single | Phase::PipeStart))
            {
                return true;
            }
            c += stride;
        }
        false
    }

    /// Commits `node` at `cycle`, writing the periodic occupancy pattern and
    /// incrementing the control-memory counter exactly once regardless of
    /// how many periodic copies get written (`CGRANode::setDFGNode`).
    pub fn set_dfg_node(&mut self, node: &DfgNodeData, cycle: u32, ii: u32, static_elastic: bool) {
        for start in mrrg::periodic_slots(cycle, ii, self.cycle_boundary, static_elastic) {
            if !node.is_multi_cycle() {
                self.occupancy[start as usize].push(Occupant {
                    node: node.id,
                    phase: Phase::Single,
                    capability: node.capability.as_flag(),
                    is_pipelinable: node.is_pipelinable,
                });
                continue;
            }
            let last = node.exec_latency - 1;
            for offset in 0..=last {
                let cyc = (start + offset) as usize;
                if cyc >= self.cycle_boundary {
                    break;
                }
                let phase = if offset == 0 {
                    Phase::PipeStart
                } else if offset == last {
                    Phase::PipeEnd
                } else {
                    Phase::PipeIn
                };
                self.occupancy[cyc].push(Occupant {
                    node: node.id,
                    phase,
                    capability: node.capability.as_flag(),
                    is_pipelinable: node.is_pipelinable,
                });
            }
        }
        self.ctrl_mem_items += 1;
    }

    pub fn get_mapped_dfg_node(&self, cycle: u32) -> Option<NodeId> {
        self.occupancy
            .get(cycle as usize)?
            .iter()
            .find(|o| matches!(o.phase, Phase::Single | Phase::PipeEnd))
            .map(|o| o.node)
    }

    /// Deliberately narrow scan (`0..2*II`, not the full cycle boundary):
    /// mirrors `CGRANode::containMappedDFGNode`.
    pub fn contains_mapped_node_within_ii(&self, node: NodeId, ii: u32) -> bool {
        let bound = (2 * ii as usize).min(self.cycle_boundary);
        self.occupancy[..bound]
            .iter()
            .any(|slot| slot.iter().any(|o| o.node == node))
    }

    /// Linear forward scan for the earliest idle cycle (`CGRANode::getMinIdleCycle`).
    pub fn min_idle_cycle(&self, node: &DfgNodeData, from_cycle: u32, ii: u32) -> u32 {
        let mut cycle = from_cycle;
        while (cycle as usize) < self.cycle_boundary {
            if self.can_occupy(node, cycle, ii) {
                return cycle;
            }
            cycle += 1;
        }
        self.cycle_boundary as u32
    }

    /// Best-effort register binding for a single-tile routed hop
    /// (`CGRANode::allocateReg`). Scans both forward and backward periodic
    /// windows for a register with `duration` consecutive free slots in
    /// both directions; silently does nothing if none is free (the original
    /// gives the caller no success/failure signal either).
    pub fn allocate_reg(&mut self, cycle: u32, duration: u32, ii: u32) {
        if self.regs_timing.is_empty() || duration == 0 {
            return;
        }
        let boundary = self.cycle_boundary as u32;
        'reg: for reg in 0..self.regs_timing.len() {
            let mut forward = cycle;
            while forward < boundary {
                for d in 0..duration {
                    let c = forward + d;
                    if c >= boundary || self.regs_timing[reg][c as usize] != -1 {
                        continue 'reg;
                    }
                }
                forward += ii.max(1);
            }
            let mut backward = cycle as i64;
            while backward >= 0 {
                for d in 0..duration as i64 {
                    let c = backward - d;
                    if c < 0 || self.regs_timing[reg][c as usize] != -1 {
                        continue 'reg;
                    }
                }
                backward -= ii.max(1) as i64;
            }
            // Found a register free in both windows: bind it.
            let mut forward = cycle;
            while forward < boundary {
                for d in 0..duration {
                    let c = (forward + d) as usize;
                    self.regs_timing[reg][c] = cycle as i32;
                    self.regs_duration[reg][c] = duration as i32;
                }
                forward += ii.max(1);
            }
            let mut backward = cycle as i64;
            while backward >= 0 {
                for d in 0..duration as i64 {
                    let c = (backward - d) as usize;
                    self.regs_timing[reg][c] = cycle as i32;
                    self.regs_duration[reg][c] = duration as i32;
                }
                backward -= ii.max(1) as i64;
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfg::Capability;

    fn mac(id: u32, exec_latency: u32, is_pipelinable: bool) -> DfgNodeData {
        DfgNodeData {
            id: NodeId(id),
            capability: Capability::Mul,
            exec_latency,
            is_pipelinable,
            preds: Vec::new(),
            succs: Vec::new(),
            is_critical: false,
            is_predicater: false,
            is_predicatee: false,
            predicatees: Vec::new(),
        }
    }

    /// S4: a pipelinable latency-3 mul admits three staggered instances onto
    /// the same tile at cycles 0, 1, 2 under II=3 — each instance's
    /// PipeStart/PipeIn/PipeEnd window overlaps the others' by one phase, and
    /// pipelinable phases are defined to coexist.
    #[test]
    fn pipelined_multi_cycle_instances_share_one_tile() {
        let mut tile = Tile::new(TileId(0), 0, 0, CapabilitySet::MUL, 8, 2);
        let ii = 3;
        let boundary = crate::mrrg::cycle_boundary(1, ii);
        tile.construct_mrrg(boundary);
        let op = mac(0, 3, true);

        for start in 0..3u32 {
            assert!(tile.can_occupy(&op, start, ii), "cycle {start} should still be free");
            tile.set_dfg_node(&op, start, ii, false);
        }
    }

    /// A non-pipelinable multi-cycle op must not admit a second instance that
    /// overlaps its latency window.
    #[test]
    fn non_pipelinable_multi_cycle_rejects_overlap() {
        let mut tile = Tile::new(TileId(0), 0, 0, CapabilitySet::MUL, 8, 2);
        let ii = 4;
        let boundary = crate::mrrg::cycle_boundary(1, ii);
        tile.construct_mrrg(boundary);
        let op = mac(0, 3, false);

        assert!(tile.can_occupy(&op, 0, ii));
        tile.set_dfg_node(&op, 0, ii, false);
        assert!(!tile.can_occupy(&op, 1, ii));
    }

    /// P3: ctrlMemSize bounds the number of distinct node commits a tile ever
    /// accepts, independent of how many cycles remain free.
    #[test]
    fn ctrl_mem_size_caps_distinct_commits() {
        let mut tile = Tile::new(TileId(0), 0, 0, CapabilitySet::MUL, 1, 2);
        let ii = 4;
        let boundary = crate::mrrg::cycle_boundary(1, ii);
        tile.construct_mrrg(boundary);
        let a = mac(0, 1, false);
        let b = mac(1, 1, false);

        assert!(tile.can_occupy(&a, 0, ii));
        tile.set_dfg_node(&a, 0, ii, false);
        assert!(!tile.can_occupy(&b, 1, ii), "ctrlMemSize=1 already spent by node 0");
    }

    /// `is_occupied` must scan forward from the cycle it's given, not fold
    /// back to that cycle's `II`-residue first: with a boundary small enough
    /// that only the first two periodic copies of a commit fit, querying the
    /// cycle just past the last written copy must report "free" even though
    /// an earlier copy at the same residue was occupied.
    #[test]
    fn is_occupied_scans_forward_from_the_given_cycle_not_its_residue() {
        let mut tile = Tile::new(TileId(0), 0, 0, CapabilitySet::MUL, 8, 2);
        let ii = 4;
        tile.construct_mrrg(9);
        let op = mac(0, 1, false);

        // Periodic copies land at cycles 1 and 5; the boundary (9) cuts off
        // before the next copy at 9 would be written.
        tile.set_dfg_node(&op, 1, ii, false);

        assert!(tile.is_occupied(1, ii));
        assert!(tile.is_occupied(5, ii));
        assert!(
            !tile.is_occupied(9, ii),
            "cycle 9 is at the boundary and nothing is committed at or after it, even though \
             an earlier periodic copy (cycle 1) shares its residue"
        );
    }
}
