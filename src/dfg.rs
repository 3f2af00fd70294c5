//! The host-supplied data-flow graph.
//!
//! The mapper never constructs a DFG itself; it only walks one through the
//! [`Dfg`] trait. Node identity is a dense `u32` handle rather than a pointer
//! or a string, so the router's internal maps (`FxHashMap<NodeId, _>`) stay
//! cheap to hash and compare.

use bitflags::bitflags;

/// Dense handle for a DFG node, stable for the lifetime of a mapping attempt.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct NodeId(pub u32);

bitflags! {
    /// The set of operation classes a tile's functional unit(s) can execute.
    ///
    /// A DFG node carries exactly one [`Capability`] tag; a tile carries a
    /// set of these (it may host several functional units, e.g. an ALU that
    /// also does compares, or a border tile that can load and store).
    #[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
    pub struct CapabilitySet: u16 {
        const LOAD   = 1 << 0;
        const STORE  = 1 << 1;
        const CALL   = 1 << 2;
        const RETURN = 1 << 3;
        const ADD    = 1 << 4;
        const MUL    = 1 << 5;
        const SHIFT  = 1 << 6;
        const PHI    = 1 << 7;
        const SEL    = 1 << 8;
        const CMP    = 1 << 9;
        const MAC    = 1 << 10;
        const LOGIC  = 1 << 11;
        const BR     = 1 << 12;
        const GENERIC = 1 << 13;
    }
}

/// The single operation tag a DFG node asks its host tile to perform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Capability {
    Load,
    Store,
    Call,
    Return,
    Add,
    Mul,
    Shift,
    Phi,
    Sel,
    Cmp,
    Mac,
    Logic,
    Br,
    Generic,
}

impl Capability {
    /// The singleton flag this tag corresponds to in a tile's [`CapabilitySet`].
    pub fn as_flag(self) -> CapabilitySet {
        match self {
            Capability::Load => CapabilitySet::LOAD,
            Capability::Store => CapabilitySet::STORE,
            Capability::Call => CapabilitySet::CALL,
            Capability::Return => CapabilitySet::RETURN,
            Capability::Add => CapabilitySet::ADD,
            Capability::Mul => CapabilitySet::MUL,
            Capability::Shift => CapabilitySet::SHIFT,
            Capability::Phi => CapabilitySet::PHI,
            Capability::Sel => CapabilitySet::SEL,
            Capability::Cmp => CapabilitySet::CMP,
            Capability::Mac => CapabilitySet::MAC,
            Capability::Logic => CapabilitySet::LOGIC,
            Capability::Br => CapabilitySet::BR,
            Capability::Generic => CapabilitySet::GENERIC,
        }
    }

    /// Short string used by the JSON emitters for the `opt` field.
    pub fn as_json_opcode(self) -> &'static str {
        match self {
            Capability::Load => "load",
            Capability::Store => "store",
            Capability::Call => "call",
            Capability::Return => "return",
            Capability::Add => "add",
            Capability::Mul => "mul",
            Capability::Shift => "shift",
            Capability::Phi => "phi",
            Capability::Sel => "sel",
            Capability::Cmp => "cmp",
            Capability::Mac => "mac",
            Capability::Logic => "logic",
            Capability::Br => "br",
            Capability::Generic => "generic",
        }
    }
}

/// Per-node data the mapper reads through [`Dfg::node`].
///
/// `preds`/`succs` are the direct data-flow edges; recurrence (back-edge)
/// membership is expressed separately via [`Dfg::cycle_lists`] rather than
/// a per-node flag, since a node can sit on more than one recurrence.
#[derive(Clone, Debug)]
pub struct DfgNodeData {
    pub id: NodeId,
    pub capability: Capability,
    /// Cycles of latency the functional unit takes to produce this node's
    /// result. `1` means a single-cycle, non-pipelined operation.
    pub exec_latency: u32,
    /// Whether a multi-cycle op may be pipelined (start/in/end phases) or
    /// must occupy its tile for the whole latency as a single slot.
    pub is_pipelinable: bool,
    pub preds: Vec<NodeId>,
    pub succs: Vec<NodeId>,
    /// True if this node is on the program's critical recurrence path;
    /// used by the successor-stitching back-edge check in `schedule`.
    pub is_critical: bool,
    /// True if this node produces the predicate consumed by a predicated
    /// sibling (used only by the JSON config emitter).
    pub is_predicater: bool,
    /// True if this node's execution is gated by another node's predicate
    /// output (used only by the JSON config emitter).
    pub is_predicatee: bool,
    pub predicatees: Vec<NodeId>,
}

impl DfgNodeData {
    pub fn is_multi_cycle(&self) -> bool {
        self.exec_latency > 1
    }

    /// True if `self` and `other` target the same functional-unit class,
    /// i.e. would contend for the same kind of tile resource.
    pub fn shares_fu_class(&self, other: &DfgNodeData) -> bool {
        self.capability.as_flag() == other.capability.as_flag()
    }
}

/// The host-supplied, read-only data-flow graph.
///
/// Implementors own their node storage; the mapper borrows through this
/// trait for the duration of one [`crate::iidriver::run`] call.
pub trait Dfg {
    /// All node ids, in the presentation order the placement loop visits.
    fn nodes(&self) -> &[NodeId];

    fn node(&self, id: NodeId) -> &DfgNodeData;

    /// Elementary recurrence (back-edge) cycles, each as an ordered list of
    /// node ids. `recMII` and the I6 back-edge timing check both walk these.
    fn cycle_lists(&self) -> &[Vec<NodeId>];

    /// Whether `a` and `b` co-occur on at least one recurrence cycle.
    fn shares_cycle(&self, a: NodeId, b: NodeId) -> bool {
        self.cycle_lists()
            .iter()
            .any(|c| c.contains(&a) && c.contains(&b))
    }
}
