//! `config.json` and `schedule.json` emission.
//!
//! Grounded on `Mapper::generateJSON`/`showSchedule`'s `jsonTiles`/
//! `jsonLinks`/`jsonTilesLinks` maps, using `serde_json` instead of
//! hand-assembled strings.

use serde_json::{json, Map, Value};

use crate::cgra::{Cgra, TileId};
use crate::dfg::Dfg;
use crate::emit::Direction;
use crate::session::MappingSession;

/// `schedule.json`: `{tiles: {tileId: {cycleMod: [opId]}}, links: {srcId:
/// {dstId: [cycle]}}}`, used by the external visualizer (`showSchedule`'s
/// `jsonTilesLinks`).
pub fn schedule_json<D: Dfg>(dfg: &D, session: &MappingSession) -> Value {
    let fabric = session.fabric();
    let ii = session.ii().max(1);

    let mut tiles = Map::new();
    for tile in fabric.tiles() {
        let mut per_cycle: Map<String, Value> = Map::new();
        for cycle in 0..ii {
            if let Some(node) = tile.get_mapped_dfg_node(cycle) {
                per_cycle
                    .entry(cycle.to_string())
                    .or_insert_with(|| json!([]))
                    .as_array_mut()
                    .unwrap()
                    .push(json!(node.0));
            }
        }
        if !per_cycle.is_empty() {
            tiles.insert(tile.id().0.to_string(), Value::Object(per_cycle));
        }
    }

    let mut links = Map::new();
    for link in fabric.links_iter() {
        let mut cycles = Vec::new();
        for cycle in 0..ii {
            if link.is_occupied(cycle) {
                cycles.push(cycle);
            }
        }
        if cycles.is_empty() {
            continue;
        }
        let src = link.src().0.to_string();
        let dst_entry = links.entry(src).or_insert_with(|| json!({}));
        dst_entry
            .as_object_mut()
            .unwrap()
            .insert(link.dst().0.to_string(), json!(cycles));
    }

    let _ = dfg; // reserved for future per-op annotation; tile ids are sufficient today.
    json!({ "tiles": tiles, "links": links })
}

/// `config.json`: per-tile per-cycle configuration records.
///
/// In parameterizable mode the record set spans cycles `0..=II` (`opt`
/// code, predicate inputs, per-direction output destinations). In
/// static-elastic mode it spans a single cycle with `src_a`/`src_b`/`dst`/
/// `bps_src*`/`bps_dst*` fields (`Mapper::generateJSON`'s two branches).
pub fn config_json<D: Dfg>(dfg: &D, session: &MappingSession) -> Value {
    if session.static_elastic() {
        static_elastic_config(dfg, session)
    } else {
        parameterizable_config(dfg, session)
    }
}

fn parameterizable_config<D: Dfg>(dfg: &D, session: &MappingSession) -> Value {
    let fabric = session.fabric();
    let ii = session.ii();
    let mut records = Vec::new();

    for cycle in 0..=ii {
        for tile in fabric.tiles() {
            let mapped = tile.get_mapped_dfg_node(cycle);
            let has_in_activity = fabric
                .in_links(tile.id())
                .iter()
                .any(|l| fabric.link(*l).is_occupied(cycle));
            let has_out_activity = fabric
                .out_links(tile.id())
                .iter()
                .any(|l| fabric.link(*l).is_occupied(cycle));
            if mapped.is_none() && !has_in_activity && !has_out_activity {
                continue;
            }

            let opt = mapped
                .map(|n| dfg.node(n).capability.as_json_opcode())
                .unwrap_or("nop");

            let predicate_in: Vec<u32> = mapped
                .map(|n| {
                    dfg.node(n)
                        .predicatees
                        .iter()
                        .filter(|p| tile.contains_mapped_node_within_ii(**p, ii.max(1)))
                        .map(|p| p.0)
                        .collect()
                })
                .unwrap_or_default();

            let out_dirs = direction_map(fabric, tile.id(), fabric.out_links(tile.id()), cycle, false);
            let bypass_out = direction_map(fabric, tile.id(), fabric.out_links(tile.id()), cycle, true);
            let in_dirs = direction_map(fabric, tile.id(), fabric.in_links(tile.id()), cycle, false);
            let bypass_in = direction_map(fabric, tile.id(), fabric.in_links(tile.id()), cycle, true);

            records.push(json!({
                "x": tile.x(),
                "y": tile.y(),
                "cycle": cycle,
                "opt": opt,
                "node": mapped.map(|n| n.0),
                "predicate_in": predicate_in,
                "dst": out_dirs,
                "src": in_dirs,
                "bps_dst": bypass_out,
                "bps_src": bypass_in,
            }));
        }
    }
    Value::Array(records)
}

fn static_elastic_config<D: Dfg>(dfg: &D, session: &MappingSession) -> Value {
    let fabric = session.fabric();
    let cycle = 0u32;
    let mut records = Vec::new();

    for tile in fabric.tiles() {
        let mapped = tile.get_mapped_dfg_node(cycle);
        let in_links = fabric.in_links(tile.id());
        let out_links = fabric.out_links(tile.id());
        let active_ins: Vec<_> = in_links
            .iter()
            .filter(|l| fabric.link(**l).is_occupied(cycle))
            .collect();
        let active_outs: Vec<_> = out_links
            .iter()
            .filter(|l| fabric.link(**l).is_occupied(cycle))
            .collect();
        if mapped.is_none() && active_ins.is_empty() && active_outs.is_empty() {
            continue;
        }

        let src_a = active_ins
            .first()
            .and_then(|l| dir_for(fabric, tile.id(), fabric.link(**l).src()));
        let src_b = active_ins
            .get(1)
            .and_then(|l| dir_for(fabric, tile.id(), fabric.link(**l).src()));
        let dst = active_outs
            .first()
            .and_then(|l| dir_for(fabric, tile.id(), fabric.link(**l).dst()));

        let bps_src: Vec<&str> = active_ins
            .iter()
            .filter(|l| fabric.link(***l).occupancy_at(cycle).map(|o| o.is_bypass).unwrap_or(false))
            .filter_map(|l| dir_for(fabric, tile.id(), fabric.link(**l).src()))
            .collect();
        let bps_dst: Vec<&str> = active_outs
            .iter()
            .filter(|l| fabric.link(***l).occupancy_at(cycle).map(|o| o.is_bypass).unwrap_or(false))
            .filter_map(|l| dir_for(fabric, tile.id(), fabric.link(**l).dst()))
            .collect();

        records.push(json!({
            "x": tile.x(),
            "y": tile.y(),
            "opt": mapped.map(|n| dfg.node(n).capability.as_json_opcode()).unwrap_or("nop"),
            "node": mapped.map(|n| n.0),
            "src_a": src_a,
            "src_b": src_b,
            "dst": dst,
            "bps_src": bps_src,
            "bps_dst": bps_dst,
        }));
    }
    Value::Array(records)
}

fn dir_for(fabric: &Cgra, from: TileId, to: TileId) -> Option<&'static str> {
    let a = fabric.tile(from);
    let b = fabric.tile(to);
    Direction::between((a.x(), a.y()), (b.x(), b.y())).map(Direction::as_str)
}

/// Directions in which `tile`'s `links` are occupied (or, if `bypass_only`,
/// specifically bypassing) at `cycle`.
fn direction_map(
    fabric: &Cgra,
    tile: TileId,
    links: &[crate::cgra::LinkId],
    cycle: u32,
    bypass_only: bool,
) -> Vec<&'static str> {
    links
        .iter()
        .filter_map(|&l| {
            let link = fabric.link(l);
            let occ = link.occupancy_at(cycle)?;
            if bypass_only && !occ.is_bypass {
                return None;
            }
            let other = if link.src() == tile { link.dst() } else { link.src() };
            dir_for(fabric, tile, other)
        })
        .collect()
}
