//! The tile grid and its link topology.
//!
//! Construction (which tiles exist, how they connect, which capabilities
//! each one carries) is out of scope for this crate — a host builds a
//! [`Cgra`] once via [`Cgra::mesh`] or by assembling it field by field, then
//! hands it to [`crate::iidriver::run`] for repeated, from-scratch MRRG
//! reconstruction across II attempts.

use rustc_hash::FxHashMap;

use crate::cgra::{Link, LinkId, Tile, TileId};
use crate::dfg::CapabilitySet;
use crate::mrrg;

/// A rectangular grid of tiles joined by directed point-to-point links.
pub struct Cgra {
    rows: usize,
    cols: usize,
    tiles: Vec<Tile>,
    links: Vec<Link>,
    link_index: FxHashMap<(TileId, TileId), LinkId>,
}

impl Cgra {
    /// Builds a 4-neighbor mesh of `rows * cols` tiles, each with the given
    /// uniform `capabilities`/`ctrl_mem_size`/`register_count` and a link to
    /// each of its (up to four) orthogonal neighbors in both directions.
    ///
    /// This is a convenience for tests and the demo binary, not a topology
    /// description language: callers needing heterogeneous tiles build on
    /// the returned `Cgra` with [`Cgra::tile_mut`] and [`Cgra::disable_tile`].
    pub fn mesh(
        rows: usize,
        cols: usize,
        capabilities: CapabilitySet,
        ctrl_mem_size: u32,
        register_count: u32,
    ) -> Self {
        let mut tiles = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let id = TileId((row * cols + col) as u32);
                tiles.push(Tile::new(
                    id,
                    col as i32,
                    row as i32,
                    capabilities,
                    ctrl_mem_size,
                    register_count,
                ));
            }
        }
        let mut cgra = Cgra {
            rows,
            cols,
            tiles,
            links: Vec::new(),
            link_index: FxHashMap::default(),
        };
        for row in 0..rows {
            for col in 0..cols {
                let here = TileId((row * cols + col) as u32);
                let neighbors: [Option<(usize, usize)>; 4] = [
                    row.checked_sub(1).map(|r| (r, col)),
                    (row + 1 < rows).then_some((row + 1, col)),
                    col.checked_sub(1).map(|c| (row, c)),
                    (col + 1 < cols).then_some((row, col + 1)),
                ];
                for n in neighbors.into_iter().flatten() {
                    let there = TileId((n.0 * cols + n.1) as u32);
                    cgra.connect(here, there);
                }
            }
        }
        cgra
    }

    fn connect(&mut self, src: TileId, dst: TileId) {
        if self.link_index.contains_key(&(src, dst)) {
            return;
        }
        let id = LinkId(self.links.len() as u32);
        self.links.push(Link::new(id, src, dst));
        self.link_index.insert((src, dst), id);
        self.tiles[src.0 as usize].push_out_link(id);
        self.tiles[dst.0 as usize].push_in_link(id);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn tile_id(&self, row: usize, col: usize) -> TileId {
        TileId((row * self.cols + col) as u32)
    }

    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.0 as usize]
    }
    pub fn tile_mut(&mut self, id: TileId) -> &mut Tile {
        &mut self.tiles[id.0 as usize]
    }
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0 as usize]
    }
    pub fn link_mut(&mut self, id: LinkId) -> &mut Link {
        &mut self.links[id.0 as usize]
    }
    pub fn links_iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Made uniformly `Option` (the original mapper's `getOutLink` returned
    /// null on a miss while `getInLink` asserted; here both directions and
    /// both lookup functions behave the same way).
    pub fn get_link(&self, src: TileId, dst: TileId) -> Option<LinkId> {
        self.link_index.get(&(src, dst)).copied()
    }

    pub fn out_links(&self, tile: TileId) -> &[LinkId] {
        self.tiles[tile.0 as usize].out_links()
    }
    pub fn in_links(&self, tile: TileId) -> &[LinkId] {
        self.tiles[tile.0 as usize].in_links()
    }

    /// Distinct tiles reachable by one out-link, in link-creation order.
    pub fn neighbors(&self, tile: TileId) -> Vec<TileId> {
        self.out_links(tile).iter().map(|l| self.link(*l).dst()).collect()
    }

    pub fn occupiable_in_links(&self, tile: TileId, cycle: u32, ii: u32) -> Vec<LinkId> {
        self.in_links(tile)
            .iter()
            .copied()
            .filter(|l| !self.link(*l).is_occupied(cycle % ii.max(1)))
            .collect()
    }

    pub fn occupiable_out_links(&self, tile: TileId, cycle: u32, ii: u32) -> Vec<LinkId> {
        self.out_links(tile)
            .iter()
            .copied()
            .filter(|l| !self.link(*l).is_occupied(cycle % ii.max(1)))
            .collect()
    }

    /// Number of non-disabled tiles, i.e. available functional units.
    pub fn fu_count(&self) -> usize {
        self.tiles.iter().filter(|t| !t.is_disabled()).count()
    }

    /// Fresh MRRG for a new II attempt: resets every tile's and link's
    /// time-expanded occupancy (`Mapper::constructMRRG`).
    pub fn construct_mrrg(&mut self, ii: u32, static_elastic: bool) -> usize {
        let _ = static_elastic;
        let cycle_boundary = mrrg::cycle_boundary(self.fu_count().max(1), ii);
        for tile in &mut self.tiles {
            tile.construct_mrrg(cycle_boundary);
        }
        for link in &mut self.links {
            link.construct_mrrg(cycle_boundary);
        }
        cycle_boundary
    }

    /// Disables a tile and cascades the disable to every incident link
    /// (`CGRANode::disable`).
    pub fn disable_tile(&mut self, tile: TileId) {
        let ins = self.tiles[tile.0 as usize].in_links().to_vec();
        let outs = self.tiles[tile.0 as usize].out_links().to_vec();
        self.tiles[tile.0 as usize].disable();
        for l in ins.into_iter().chain(outs) {
            self.links[l.0 as usize].disable();
        }
    }
}
