//! The CGRA fabric: tiles, links, and the occupancy state that together form
//! the modulo routing resource graph (see [`crate::mrrg`]).

mod fabric;
mod link;
mod tile;

pub use fabric::Cgra;
pub use link::{Link, LinkOccupancy};
pub use tile::{Phase, Tile};

/// Dense handle for a tile, indexing [`Cgra`]'s tile arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct TileId(pub u32);

/// Dense handle for a link, indexing [`Cgra`]'s link arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct LinkId(pub u32);
