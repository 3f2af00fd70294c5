//! External-facing emitters: the two JSON artifacts and the ASCII cycle
//! render. All out of scope for the core per spec §1 ("JSON emission of the
//! final schedule...visual cycle-by-cycle ASCII dump") in the sense that a
//! host is free to ignore them entirely; they are kept as thin, ambient
//! serializers (`serde_json`, `std::fmt`) rather than a rich rendering
//! pipeline, matching spec §6's literal field names.

pub mod ascii;
pub mod json;

/// The four compass directions a link can run in relative to its source
/// tile, used only for emission layout (spec's Link attribute "direction-id
/// when viewed from either endpoint"). Computed from tile coordinates rather
/// than stored on `Link`, since nothing in the core's scheduling logic
/// depends on it (register port bookkeeping is the original's only other
/// consumer, and spec §9 documents `allocateReg`'s binding as best-effort and
/// signal-free already).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub fn between(src: (i32, i32), dst: (i32, i32)) -> Option<Direction> {
        let (sx, sy) = src;
        let (dx, dy) = dst;
        match (dx - sx, dy - sy) {
            (0, d) if d > 0 => Some(Direction::South),
            (0, d) if d < 0 => Some(Direction::North),
            (d, 0) if d > 0 => Some(Direction::East),
            (d, 0) if d < 0 => Some(Direction::West),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::East => "E",
            Direction::South => "S",
            Direction::West => "W",
        }
    }
}
