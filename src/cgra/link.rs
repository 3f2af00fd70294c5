//! A directed link between two adjacent tiles and its occupancy slots.
//!
//! A link's occupancy is simpler than a tile's: one optional occupant per
//! cycle slot (invariant I2), with a `bypass` flag distinguishing a hop that
//! merely forwards a value in transit from one that also drives the
//! destination tile's datapath, and `emits_output` marking the one hop per
//! routed edge that actually produces the value (as opposed to a later
//! multicast reuse of the same booked slot).

use crate::cgra::TileId;
use crate::dfg::NodeId;
use crate::mrrg;

#[derive(Copy, Clone, Debug, serde::Serialize)]
pub struct LinkOccupancy {
    pub node: NodeId,
    pub is_bypass: bool,
    pub emits_output: bool,
}

#[derive(Debug)]
pub struct Link {
    id: crate::cgra::LinkId,
    src: TileId,
    dst: TileId,
    disabled: bool,
    cycle_boundary: usize,
    occupancy: Vec<Option<LinkOccupancy>>,
}

impl Link {
    pub fn new(id: crate::cgra::LinkId, src: TileId, dst: TileId) -> Self {
        Link {
            id,
            src,
            dst,
            disabled: false,
            cycle_boundary: 0,
            occupancy: Vec::new(),
        }
    }

    pub fn id(&self) -> crate::cgra::LinkId {
        self.id
    }
    pub fn src(&self) -> TileId {
        self.src
    }
    pub fn dst(&self) -> TileId {
        self.dst
    }
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn construct_mrrg(&mut self, cycle_boundary: usize) {
        self.cycle_boundary = cycle_boundary;
        self.occupancy = vec![None; cycle_boundary];
    }

    pub fn disable(&mut self) {
        self.disabled = true;
    }

    /// Free at every periodic copy of `cycle`, or already booked by the same
    /// producer node (multicast reuse is not a conflict, invariant I2).
    pub fn can_occupy(&self, node: NodeId, cycle: u32, ii: u32, static_elastic: bool) -> bool {
        if self.disabled {
            return false;
        }
        mrrg::periodic_slots(cycle, ii, self.cycle_boundary, static_elastic).all(|c| {
            match self.occupancy.get(c as usize).and_then(|o| *o) {
                None => true,
                Some(occ) => occ.node == node,
            }
        })
    }

    pub fn occupy(
        &mut self,
        node: NodeId,
        cycle: u32,
        duration: u32,
        ii: u32,
        is_bypass: bool,
        emits_output: bool,
        static_elastic: bool,
    ) {
        let mut first = true;
        for start in mrrg::periodic_slots(cycle, ii, self.cycle_boundary, static_elastic) {
            for offset in 0..duration {
                let c = (start + offset) as usize;
                if c >= self.cycle_boundary {
                    break;
                }
                self.occupancy[c] = Some(LinkOccupancy {
                    node,
                    is_bypass,
                    emits_output: emits_output && first,
                });
            }
            first = false;
        }
    }

    pub fn is_occupied(&self, cycle: u32) -> bool {
        self.occupancy
            .get(cycle as usize)
            .map(|o| o.is_some())
            .unwrap_or(false)
    }

    /// True if some occupant is already booked at `cycle`; used by the cost
    /// model's multicast-reuse bonus.
    pub fn is_reused(&self, cycle: u32) -> bool {
        self.is_occupied(cycle)
    }

    pub fn get_mapped_dfg_node(&self, cycle: u32) -> Option<NodeId> {
        self.occupancy.get(cycle as usize).and_then(|o| o.map(|o| o.node))
    }

    pub fn occupancy_at(&self, cycle: u32) -> Option<LinkOccupancy> {
        self.occupancy.get(cycle as usize).copied().flatten()
    }
}
