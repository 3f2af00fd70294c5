//! Crate root: public surface and the modulo-scheduling CGRA mapper's
//! module layout.
//!
//! This module is the single canonical entry point for downstream callers.
//! It re-exports the pieces a host program actually needs — the [`Dfg`]
//! trait it must implement, the [`Cgra`] fabric it builds, [`MapperConfig`]
//! to pick a search strategy, and [`iidriver::run`] to map.
//!
//! ## Invariants
//!
//! - **No unsafe.** Every occupancy table is a plain `Vec`; there is no
//!   pointer aliasing to reason about.
//! - **Modulo periodicity (I1).** Tile and link occupancy is periodic with
//!   stride `II`, except in static-elastic mode where it degenerates to a
//!   single shot (see [`mrrg`]).
//! - **One occupant per link-cycle (I2).** A link slot holds at most one
//!   routed value, though a later hop of the same value may reuse it
//!   (multicast).
//! - **Recurrence timing (I6).** The sum of modulo-`II` deltas around any
//!   DFG recurrence cycle must not exceed `II`; `schedule::engine` enforces
//!   this on every successor-stitching commit.
//!
//! These invariants are enforced by construction across the submodules. If
//! any of them would be violated at runtime, the failure mode is a precise
//! [`error::MapperError`], never UB or a panic on a data-dependent path.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

/// The host-supplied data-flow graph trait and its node/capability types.
pub mod dfg;
/// Shared constants and iteration helpers for the time-expanded occupancy
/// model (the modulo routing resource graph).
pub mod mrrg;
/// The CGRA fabric: tiles, links, and their occupancy state.
pub mod cgra;
/// Per-edge routing: Dijkstra search plus the placement cost model.
pub mod route;
/// One node's worth of placement: tile commit, link walk, and
/// predecessor/successor stitching.
pub mod schedule;
/// The mapping session: the mutable arena a single II attempt owns.
pub mod session;
/// Mapper-wide configuration (search strategy, static-elastic mode, II
/// sweep bounds).
pub mod config;
/// The outer II-sweep driver and the two outer search strategies.
pub mod iidriver;
/// Typed errors surfaced by the mapper core.
pub mod error;
/// External-facing emitters: `config.json`, `schedule.json`, and the ASCII
/// cycle-by-cycle render.
pub mod emit;

pub use cgra::{Cgra, Link, LinkId, Phase, Tile, TileId};
pub use config::{MapperConfig, SearchMode};
pub use dfg::{Capability, CapabilitySet, Dfg, DfgNodeData, NodeId};
pub use error::MapperError;
pub use iidriver::MapResult;
pub use session::MappingSession;
