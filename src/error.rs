//! Error kinds surfaced by the mapper core.
//!
//! The core never panics on data-dependent paths (spec §7): every failure is
//! a typed `MapperError` variant. `RouteUnreachable` and `CapabilityMismatch`
//! are recovered locally by the placement loop (skip this tile/path) and
//! rarely escape past `iidriver`; they are still part of the public enum so
//! `route`/`schedule` can return a uniform `Result` at every call site.

use crate::dfg::NodeId;
use crate::cgra::TileId;

/// Errors produced while mapping a DFG onto a CGRA.
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// At least one DFG node could not be placed at the current II.
    #[error("DFG is infeasible at II={ii}")]
    InfeasibleAtII { ii: u32 },

    /// Dijkstra exhausted the search pool without reaching the target tile.
    #[error("no route from node {src:?} to node {dst:?} at II={ii}")]
    RouteUnreachable { src: NodeId, dst: NodeId, ii: u32 },

    /// Sum of modulo-II deltas around a recurrence cycle exceeds II (I6).
    #[error("back-edge timing violated for node {cycle_node:?} at II={ii}")]
    BackedgeTimingViolation { cycle_node: NodeId, ii: u32 },

    /// A candidate tile does not support the node's capability tag.
    #[error("tile {tile:?} cannot support node {node:?}")]
    CapabilityMismatch { node: NodeId, tile: TileId },

    /// Exhaustive DFS backtracked through every branch without success.
    #[error("exhaustive search exhausted at II={ii}")]
    ExhaustiveSearchExhausted { ii: u32 },

    /// The II sweep reached the caller-configured attempt cap.
    #[error("II sweep exceeded configured cap of {cap}")]
    IiCapExceeded { cap: u32 },
}
