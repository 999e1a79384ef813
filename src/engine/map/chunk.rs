// Fixed-size block of tiles and anchored entities

use glam::IVec2;

use super::tile::{GridId, Tile, TileRef};
use crate::core::entity::EntityUid;
use crate::core::math::Box2;
use crate::core::timing::GameTick;

/// A `chunk_size × chunk_size` block of a grid.
///
/// Chunk-local tile coordinates are in `[0, chunk_size)` on both axes.
/// Collision geometry is a set of rectangles covering every non-empty tile,
/// rebuilt after each tile write unless regeneration is suppressed.
#[derive(Debug, Clone)]
pub struct MapChunk {
    /// Chunk indices within the grid
    indices: IVec2,
    chunk_size: u16,

    /// Row-major tiles
    tiles: Vec<Tile>,
    /// Anchored entities per cell, in anchoring order
    anchored: Vec<Vec<EntityUid>>,

    tile_count: usize,
    anchored_count: usize,

    last_tile_modified_tick: GameTick,
    last_anchored_modified_tick: GameTick,

    suppress_collision_regeneration: bool,
    collision_rects: Vec<Box2>,
    /// Bounds of the collision rects in chunk-local tile units
    local_bounds: Box2,
    regeneration_count: u32,
}

impl MapChunk {
    pub fn new(indices: IVec2, chunk_size: u16, tick: GameTick) -> Self {
        let cells = chunk_size as usize * chunk_size as usize;
        Self {
            indices,
            chunk_size,
            tiles: vec![Tile::EMPTY; cells],
            anchored: vec![Vec::new(); cells],
            tile_count: 0,
            anchored_count: 0,
            last_tile_modified_tick: tick,
            last_anchored_modified_tick: tick,
            suppress_collision_regeneration: false,
            collision_rects: Vec::new(),
            local_bounds: Box2::default(),
            regeneration_count: 0,
        }
    }

    pub fn indices(&self) -> IVec2 {
        self.indices
    }

    pub fn chunk_size(&self) -> u16 {
        self.chunk_size
    }

    /// Number of non-empty tiles
    pub fn tile_count(&self) -> usize {
        self.tile_count
    }

    /// Number of anchored entities across all cells
    pub fn anchored_count(&self) -> usize {
        self.anchored_count
    }

    /// No tiles and nothing anchored: safe to prune
    pub fn is_empty(&self) -> bool {
        self.tile_count == 0 && self.anchored_count == 0
    }

    fn cell(&self, local: IVec2) -> usize {
        let size = self.chunk_size as i32;
        debug_assert!(
            (0..size).contains(&local.x) && (0..size).contains(&local.y),
            "chunk tile {} out of range for chunk size {}",
            local,
            size
        );
        (local.y * size + local.x) as usize
    }

    /// Grid tile indices -> chunk-local indices (floor semantics for negatives)
    pub fn grid_tile_to_chunk_tile(&self, grid_tile: IVec2) -> IVec2 {
        let size = self.chunk_size as i32;
        IVec2::new(grid_tile.x.rem_euclid(size), grid_tile.y.rem_euclid(size))
    }

    /// Chunk-local indices -> grid tile indices
    pub fn chunk_tile_to_grid_tile(&self, local: IVec2) -> IVec2 {
        self.indices * self.chunk_size as i32 + local
    }

    // --- Tiles ---

    pub fn get_tile(&self, local: IVec2) -> Tile {
        self.tiles[self.cell(local)]
    }

    pub fn get_tile_ref(&self, local: IVec2, grid: GridId) -> TileRef {
        TileRef::new(grid, self.chunk_tile_to_grid_tile(local), self.get_tile(local))
    }

    /// Write a tile. Returns the previous value if it changed.
    pub fn set_tile(&mut self, local: IVec2, tile: Tile, tick: GameTick) -> Option<Tile> {
        let cell = self.cell(local);
        let old = self.tiles[cell];
        if old == tile {
            return None;
        }

        match (old.is_empty(), tile.is_empty()) {
            (true, false) => self.tile_count += 1,
            (false, true) => self.tile_count -= 1,
            _ => {}
        }

        self.tiles[cell] = tile;
        self.last_tile_modified_tick = self.last_tile_modified_tick.max(tick);

        if !self.suppress_collision_regeneration {
            self.regenerate_collision();
        }

        Some(old)
    }

    /// All cells with their grid tile indices
    pub fn tiles(&self, grid: GridId) -> impl Iterator<Item = TileRef> + '_ {
        let size = self.chunk_size as i32;
        self.tiles.iter().enumerate().map(move |(i, tile)| {
            let local = IVec2::new(i as i32 % size, i as i32 / size);
            TileRef::new(grid, self.chunk_tile_to_grid_tile(local), *tile)
        })
    }

    /// Raw row-major tile storage
    pub fn tile_data(&self) -> &[Tile] {
        &self.tiles
    }

    // --- Anchoring ---

    /// Entities anchored to a cell
    pub fn anchored_at(&self, local: IVec2) -> &[EntityUid] {
        &self.anchored[self.cell(local)]
    }

    /// Every anchored entity in the chunk
    pub fn all_anchored(&self) -> impl Iterator<Item = EntityUid> + '_ {
        self.anchored.iter().flatten().copied()
    }

    /// Record an entity in a cell. Returns `false` if it was already there.
    pub fn add_anchored(&mut self, local: IVec2, uid: EntityUid, tick: GameTick) -> bool {
        let cell = self.cell(local);
        if self.anchored[cell].contains(&uid) {
            return false;
        }
        self.anchored[cell].push(uid);
        self.anchored_count += 1;
        self.touch_anchored(tick);
        true
    }

    /// Remove an entity from a cell. Returns `false` if it wasn't there.
    pub fn remove_anchored(&mut self, local: IVec2, uid: EntityUid, tick: GameTick) -> bool {
        let cell = self.cell(local);
        let Some(pos) = self.anchored[cell].iter().position(|e| *e == uid) else {
            return false;
        };
        self.anchored[cell].remove(pos);
        self.anchored_count -= 1;
        self.touch_anchored(tick);
        true
    }

    /// Bump the anchored tick; never moves it backwards
    pub fn touch_anchored(&mut self, tick: GameTick) {
        self.last_anchored_modified_tick = self.last_anchored_modified_tick.max(tick);
    }

    pub fn last_tile_modified_tick(&self) -> GameTick {
        self.last_tile_modified_tick
    }

    pub fn last_anchored_modified_tick(&self) -> GameTick {
        self.last_anchored_modified_tick
    }

    // --- Collision ---

    pub fn suppress_collision_regeneration(&self) -> bool {
        self.suppress_collision_regeneration
    }

    pub fn set_suppress_collision_regeneration(&mut self, suppress: bool) {
        self.suppress_collision_regeneration = suppress;
    }

    /// Rebuild collision rectangles from the current tiles.
    ///
    /// Runs of non-empty tiles in a row become a rectangle; a run with the
    /// same horizontal extent as one directly below extends that rectangle.
    pub fn regenerate_collision(&mut self) {
        let size = self.chunk_size as i32;
        let mut rects: Vec<Box2> = Vec::new();
        // (start, end, rect index) for runs on the previous row
        let mut open: Vec<(i32, i32, usize)> = Vec::new();

        for y in 0..size {
            let mut next_open = Vec::new();
            let mut x = 0;

            while x < size {
                if self.get_tile(IVec2::new(x, y)).is_empty() {
                    x += 1;
                    continue;
                }

                let start = x;
                while x < size && !self.get_tile(IVec2::new(x, y)).is_empty() {
                    x += 1;
                }

                let extends = open
                    .iter()
                    .find(|(s, e, _)| *s == start && *e == x)
                    .map(|(_, _, i)| *i);

                let index = match extends {
                    Some(i) => {
                        rects[i].top = (y + 1) as f32;
                        i
                    }
                    None => {
                        rects.push(Box2::new(start as f32, y as f32, x as f32, (y + 1) as f32));
                        rects.len() - 1
                    }
                };
                next_open.push((start, x, index));
            }

            open = next_open;
        }

        self.local_bounds = rects
            .iter()
            .copied()
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        self.collision_rects = rects;
        self.regeneration_count = self.regeneration_count.wrapping_add(1);
    }

    /// Collision rectangles in chunk-local tile units
    pub fn collision_rects(&self) -> &[Box2] {
        &self.collision_rects
    }

    /// How many times collision has been rebuilt
    pub fn regeneration_count(&self) -> u32 {
        self.regeneration_count
    }

    /// Bounds of the non-empty tiles in chunk-local tile units
    pub fn local_bounds(&self) -> Box2 {
        self.local_bounds
    }

    /// Whether the cell is covered by collision geometry
    pub fn collides_with_chunk(&self, local: IVec2) -> bool {
        let center = local.as_vec2() + 0.5;
        self.collision_rects
            .iter()
            .any(|rect| rect.contains_point(center))
    }
}
