//! Cycle-by-cycle ASCII/Unicode rendering of the mapped mesh.
//!
//! Direct port of `Mapper::showSchedule`'s display-grid construction: each
//! tile becomes a `[ id ]` cell, each link an arrow cell, assembled into a
//! `(2*rows-1) x (2*cols)` character grid and printed cycle by cycle.

use std::fmt::Write as _;

use crate::dfg::Dfg;
use crate::session::MappingSession;

const EMPTY_TILE: &str = "[     ]";
const EMPTY_V: &str = "     ";
const EMPTY_H: &str = "   ";

/// Renders every cycle from `0` to `2 * show_cycle_boundary` (inclusive),
/// where `show_cycle_boundary` is `max(fu_count, 2*II)` (or the node count
/// in static-elastic mode), matching `showSchedule`'s display window.
pub fn render<D: Dfg>(dfg: &D, session: &MappingSession) -> String {
    let fabric = session.fabric();
    let ii = session.ii().max(1);
    let rows = fabric.rows();
    let cols = fabric.cols();

    let show_cycle_boundary = if session.static_elastic() {
        dfg.nodes().len() as u32
    } else {
        (fabric.fu_count() as u32).max(2 * ii)
    };

    let mut out = String::new();
    let mut cycle = 0u32;
    while cycle <= 2 * show_cycle_boundary {
        let _ = writeln!(
            out,
            "--------------------------- cycle:{cycle} ---------------------------"
        );
        for row in (0..rows).rev() {
            let mut tile_line = String::new();
            for col in 0..cols {
                let tile_id = fabric.tile_id(row, col);
                let tile = fabric.tile(tile_id);

                let occupant = tile.get_mapped_dfg_node(cycle);
                let _ = write!(
                    tile_line,
                    "{}",
                    match occupant {
                        Some(n) if n.0 < 10 => format!("[  {}  ]", n.0),
                        Some(n) => format!("[ {}  ]", n.0),
                        None => EMPTY_TILE.to_string(),
                    }
                );

                if col + 1 < cols {
                    let right = fabric.tile_id(row, col + 1);
                    let lr = fabric.get_link(tile_id, right);
                    let ll = fabric.get_link(right, tile_id);
                    let lr_occ = lr.is_some_and(|l| fabric.link(l).is_occupied(cycle));
                    let ll_occ = ll.is_some_and(|l| fabric.link(l).is_occupied(cycle));
                    let arrow = match (lr_occ, ll_occ) {
                        (true, true) => " \u{21c4} ",
                        (true, false) => " \u{2192} ",
                        (false, true) => " \u{2190} ",
                        (false, false) => EMPTY_H,
                    };
                    tile_line.push_str(arrow);
                }
            }
            out.push_str(&tile_line);
            out.push('\n');

            if row > 0 {
                let mut vert_line = String::new();
                for col in 0..cols {
                    let tile_id = fabric.tile_id(row, col);
                    let below = fabric.tile_id(row - 1, col);
                    let ld = fabric.get_link(tile_id, below);
                    let lu = fabric.get_link(below, tile_id);
                    let ld_occ = ld.is_some_and(|l| fabric.link(l).is_occupied(cycle));
                    let lu_occ = lu.is_some_and(|l| fabric.link(l).is_occupied(cycle));
                    let arrow = match (ld_occ, lu_occ) {
                        (true, true) => "   \u{21c5} ",
                        (true, false) => "   \u{2193} ",
                        (false, true) => "   \u{2191} ",
                        (false, false) => EMPTY_V,
                    };
                    vert_line.push_str(arrow);
                }
                out.push_str(&vert_line);
                out.push('\n');
            }
        }
        cycle += 1;
    }
    let _ = writeln!(out, "[Mapping II: {ii}]");
    out
}
