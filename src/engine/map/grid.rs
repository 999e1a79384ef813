// Chunked tile grid: storage, anchoring index, queries and transforms

use glam::{Affine2, IVec2, Vec2};
use std::collections::HashMap;

use super::chunk::MapChunk;
use super::tile::{GridId, Tile, TileRef};
use crate::core::config::MapConfig;
use crate::core::entity::EntityUid;
use crate::core::math::{floor_div_vec, quads_overlap, Box2, Box2Rotated, Circle};
use crate::core::timing::{GameTick, TickSource};

/// Caller-supplied filter for tile queries
pub type TilePredicate<'a> = &'a dyn Fn(&TileRef) -> bool;

/// Notification raised by a grid while it is being mutated
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    /// A tile value changed
    TileChanged { tile: TileRef, old: Tile },
    /// A chunk was dropped from the grid
    ChunkRemoved { grid: GridId, indices: IVec2 },
    /// The last chunk was removed; the owner may delete the grid
    EmptyGrid { grid: GridId },
}

/// The eight compass directions on the tile grid (+y is north)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    North,
    NorthEast,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
        Direction::North,
        Direction::NorthEast,
    ];

    /// One-tile step in this direction
    pub fn offset(self) -> IVec2 {
        match self {
            Direction::East => IVec2::new(1, 0),
            Direction::SouthEast => IVec2::new(1, -1),
            Direction::South => IVec2::new(0, -1),
            Direction::SouthWest => IVec2::new(-1, -1),
            Direction::West => IVec2::new(-1, 0),
            Direction::NorthWest => IVec2::new(-1, 1),
            Direction::North => IVec2::new(0, 1),
            Direction::NorthEast => IVec2::new(1, 1),
        }
    }
}

/// A sparse, chunked grid of tiles placed in the world.
///
/// Chunks are allocated on the first write to a tile they contain and never
/// on reads; reading an unallocated tile yields an empty [`TileRef`] carrying
/// the requested indices. A chunk left with no tiles and no anchored entities
/// is pruned.
#[derive(Debug)]
pub struct MapGrid {
    index: GridId,
    chunk_size: u16,
    /// Side length of a tile in world units
    tile_size: u16,

    chunks: HashMap<IVec2, MapChunk>,

    world_position: Vec2,
    world_rotation: f32,
    /// Bounds of all tiles in grid-local space
    local_bounds: Box2,

    created_tick: GameTick,
    last_tile_modified_tick: GameTick,
    last_anchored_modified_tick: GameTick,
    ticks: TickSource,

    events: Vec<GridEvent>,
}

impl MapGrid {
    pub fn new(index: GridId, chunk_size: u16, tile_size: u16, ticks: TickSource) -> Self {
        debug_assert!(chunk_size > 0, "chunk size must be positive");
        debug_assert!(tile_size > 0, "tile size must be positive");

        let now = ticks.now();
        Self {
            index,
            chunk_size,
            tile_size,
            chunks: HashMap::new(),
            world_position: Vec2::ZERO,
            world_rotation: 0.0,
            local_bounds: Box2::default(),
            created_tick: now,
            last_tile_modified_tick: now,
            last_anchored_modified_tick: now,
            ticks,
            events: Vec::new(),
        }
    }

    pub fn from_config(index: GridId, config: &MapConfig, ticks: TickSource) -> Self {
        Self::new(index, config.chunk_size, config.tile_size, ticks)
    }

    pub fn index(&self) -> GridId {
        self.index
    }

    pub fn chunk_size(&self) -> u16 {
        self.chunk_size
    }

    pub fn tile_size(&self) -> u16 {
        self.tile_size
    }

    pub fn created_tick(&self) -> GameTick {
        self.created_tick
    }

    pub fn last_tile_modified_tick(&self) -> GameTick {
        self.last_tile_modified_tick
    }

    pub fn last_anchored_modified_tick(&self) -> GameTick {
        self.last_anchored_modified_tick
    }

    /// Drain queued notifications
    pub fn take_events(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    fn touch_tiles(&mut self) {
        self.last_tile_modified_tick = self.last_tile_modified_tick.max(self.ticks.now());
    }

    // --- Placement ---

    pub fn world_position(&self) -> Vec2 {
        self.world_position
    }

    pub fn set_world_position(&mut self, position: Vec2) {
        self.world_position = position;
        self.touch_tiles();
    }

    pub fn world_rotation(&self) -> f32 {
        self.world_rotation
    }

    pub fn set_world_rotation(&mut self, rotation: f32) {
        self.world_rotation = rotation;
        self.touch_tiles();
    }

    /// Grid-local -> world
    pub fn world_matrix(&self) -> Affine2 {
        Affine2::from_angle_translation(self.world_rotation, self.world_position)
    }

    /// World -> grid-local
    pub fn inv_world_matrix(&self) -> Affine2 {
        self.world_matrix().inverse()
    }

    pub fn local_bounds(&self) -> Box2 {
        self.local_bounds
    }

    pub fn world_bounds(&self) -> Box2 {
        Box2Rotated::new(self.local_bounds, self.world_rotation, Vec2::ZERO)
            .calc_bounding_box()
            .translated(self.world_position)
    }

    fn update_aabb(&mut self) {
        let scale = self.tile_size as f32;
        let span = self.chunk_size as f32;

        self.local_bounds = self
            .chunks
            .values()
            .filter(|chunk| chunk.tile_count() > 0)
            .map(|chunk| {
                let bounds = chunk
                    .local_bounds()
                    .translated(chunk.indices().as_vec2() * span);
                Box2::from_corners(bounds.bottom_left() * scale, bounds.top_right() * scale)
            })
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
    }

    // --- Transforms ---

    pub fn world_to_local(&self, world: Vec2) -> Vec2 {
        self.inv_world_matrix().transform_point2(world)
    }

    pub fn local_to_world(&self, local: Vec2) -> Vec2 {
        self.world_matrix().transform_point2(local)
    }

    /// Tile containing a grid-local position
    pub fn tile_indices_for(&self, local: Vec2) -> IVec2 {
        (local / self.tile_size as f32).floor().as_ivec2()
    }

    /// Tile containing a world position
    pub fn world_to_tile(&self, world: Vec2) -> IVec2 {
        self.tile_indices_for(self.world_to_local(world))
    }

    /// Chunk containing a grid-local position
    pub fn local_to_chunk_indices(&self, local: Vec2) -> IVec2 {
        let chunk_span = self.tile_size as f32 * self.chunk_size as f32;
        (local / chunk_span).floor().as_ivec2()
    }

    /// Chunk containing a tile (floor division, so -1 is in chunk -1)
    pub fn grid_tile_to_chunk_indices(&self, tile: IVec2) -> IVec2 {
        floor_div_vec(tile, self.chunk_size as i32)
    }

    /// Center of a tile in grid-local space
    pub fn grid_tile_to_local(&self, tile: IVec2) -> Vec2 {
        let size = self.tile_size as f32;
        tile.as_vec2() * size + size / 2.0
    }

    /// Center of a tile in world space
    pub fn grid_tile_to_world(&self, tile: IVec2) -> Vec2 {
        self.local_to_world(self.grid_tile_to_local(tile))
    }

    // --- Chunks ---

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn has_chunk(&self, indices: IVec2) -> bool {
        self.chunks.contains_key(&indices)
    }

    pub fn get_chunk(&self, indices: IVec2) -> Option<&MapChunk> {
        self.chunks.get(&indices)
    }

    /// Chunk indices in row order (bottom row first)
    pub fn chunk_indices(&self) -> Vec<IVec2> {
        let mut indices: Vec<IVec2> = self.chunks.keys().copied().collect();
        indices.sort_by_key(|i| (i.y, i.x));
        indices
    }

    /// Allocated chunks overlapping a world-space box
    pub fn get_map_chunks(&self, world_area: Box2) -> Vec<&MapChunk> {
        self.chunks_in_local(world_area.transformed(&self.inv_world_matrix()))
    }

    /// Allocated chunks overlapping a world-space rotated box
    pub fn get_map_chunks_rotated(&self, world_area: Box2Rotated) -> Vec<&MapChunk> {
        let local = world_area.transformed_corners(&self.inv_world_matrix());
        match Box2::from_points(local) {
            Some(bounds) => self.chunks_in_local(bounds),
            None => Vec::new(),
        }
    }

    fn chunks_in_local(&self, local: Box2) -> Vec<&MapChunk> {
        let lb = self.local_to_chunk_indices(local.bottom_left());
        let rt = self.local_to_chunk_indices(local.top_right());

        let mut found = Vec::new();
        for x in lb.x..=rt.x {
            for y in lb.y..=rt.y {
                if let Some(chunk) = self.chunks.get(&IVec2::new(x, y)) {
                    found.push(chunk);
                }
            }
        }
        found
    }

    /// Drop a chunk. Raises `EmptyGrid` when it was the last one.
    pub fn remove_chunk(&mut self, indices: IVec2) -> Option<MapChunk> {
        let chunk = self.chunks.remove(&indices)?;
        log::debug!("Removed chunk {} from {}", indices, self.index);

        self.events.push(GridEvent::ChunkRemoved {
            grid: self.index,
            indices,
        });

        if self.chunks.is_empty() {
            log::debug!("{} is now empty", self.index);
            self.events.push(GridEvent::EmptyGrid { grid: self.index });
        }

        self.update_aabb();
        Some(chunk)
    }

    fn prune_chunk(&mut self, indices: IVec2) {
        if self.chunks.get(&indices).is_some_and(MapChunk::is_empty) {
            self.remove_chunk(indices);
        }
    }

    // --- Tiles ---

    /// Tile at `indices`; an empty sentinel if its chunk isn't allocated
    pub fn get_tile_ref(&self, indices: IVec2) -> TileRef {
        self.try_get_tile_ref(indices)
            .unwrap_or_else(|| TileRef::empty(self.index, indices))
    }

    /// Tile at `indices`, or `None` if its chunk isn't allocated
    pub fn try_get_tile_ref(&self, indices: IVec2) -> Option<TileRef> {
        let chunk = self.chunks.get(&self.grid_tile_to_chunk_indices(indices))?;
        Some(chunk.get_tile_ref(chunk.grid_tile_to_chunk_tile(indices), self.index))
    }

    /// Tile under a world position
    pub fn try_get_tile_ref_at(&self, world: Vec2) -> Option<TileRef> {
        self.try_get_tile_ref(self.world_to_tile(world))
    }

    /// Every tile of every allocated chunk
    pub fn get_all_tiles(&self, ignore_empty: bool) -> Vec<TileRef> {
        let mut tiles = Vec::new();
        for indices in self.chunk_indices() {
            if let Some(chunk) = self.chunks.get(&indices) {
                tiles.extend(
                    chunk
                        .tiles(self.index)
                        .filter(|tile| !ignore_empty || !tile.tile.is_empty()),
                );
            }
        }
        tiles
    }

    // Writes one tile, allocating its chunk. Returns whether anything changed.
    fn write_tile(&mut self, indices: IVec2, tile: Tile, suppress: bool) -> bool {
        let chunk_indices = self.grid_tile_to_chunk_indices(indices);

        // Clearing a tile that was never allocated changes nothing.
        if tile.is_empty() && !self.chunks.contains_key(&chunk_indices) {
            return false;
        }

        let tick = self.ticks.now();
        let (chunk_size, grid) = (self.chunk_size, self.index);
        let chunk = self.chunks.entry(chunk_indices).or_insert_with(|| {
            log::trace!("Allocating chunk {} in {}", chunk_indices, grid);
            MapChunk::new(chunk_indices, chunk_size, tick)
        });

        if suppress {
            chunk.set_suppress_collision_regeneration(true);
        }

        let local = chunk.grid_tile_to_chunk_tile(indices);
        let Some(old) = chunk.set_tile(local, tile, tick) else {
            return false;
        };

        self.last_tile_modified_tick = self.last_tile_modified_tick.max(tick);
        self.events.push(GridEvent::TileChanged {
            tile: TileRef::new(grid, indices, tile),
            old,
        });
        true
    }

    /// Write a single tile, allocating its chunk if needed
    pub fn set_tile(&mut self, indices: IVec2, tile: Tile) {
        if !self.write_tile(indices, tile, false) {
            return;
        }

        if tile.is_empty() {
            self.prune_chunk(self.grid_tile_to_chunk_indices(indices));
        }
        self.update_aabb();
    }

    /// Write many tiles at once.
    ///
    /// Collision is rebuilt once per touched chunk after every write has
    /// landed, so it always reflects the final state of the batch.
    pub fn set_tiles(&mut self, tiles: &[(IVec2, Tile)]) {
        let mut touched: Vec<IVec2> = Vec::new();

        for (indices, tile) in tiles {
            let chunk_indices = self.grid_tile_to_chunk_indices(*indices);
            self.write_tile(*indices, *tile, true);
            if self.chunks.contains_key(&chunk_indices) && !touched.contains(&chunk_indices) {
                touched.push(chunk_indices);
            }
        }

        for chunk_indices in &touched {
            if let Some(chunk) = self.chunks.get_mut(chunk_indices) {
                chunk.set_suppress_collision_regeneration(false);
                chunk.regenerate_collision();
            }
            self.prune_chunk(*chunk_indices);
        }

        log::trace!(
            "Batched {} tile writes over {} chunks in {}",
            tiles.len(),
            touched.len(),
            self.index
        );
        self.update_aabb();
    }

    /// Whether the tile is covered by chunk collision geometry
    pub fn collides_with_grid(&self, indices: IVec2) -> bool {
        let Some(chunk) = self.chunks.get(&self.grid_tile_to_chunk_indices(indices)) else {
            return false;
        };
        chunk.collides_with_chunk(chunk.grid_tile_to_chunk_tile(indices))
    }

    // --- Shape queries ---

    /// Visit every tile index whose cell overlaps `local` (floored range),
    /// keeping tiles that pass `exact` and the caller's predicate.
    fn local_tiles_intersecting(
        &self,
        local: Box2,
        ignore_empty: bool,
        predicate: Option<TilePredicate<'_>>,
        exact: impl Fn(IVec2) -> bool,
    ) -> Vec<TileRef> {
        let lb = self.tile_indices_for(local.bottom_left());
        let rt = self.tile_indices_for(local.top_right());

        let mut found = Vec::new();
        for x in lb.x..=rt.x {
            for y in lb.y..=rt.y {
                let indices = IVec2::new(x, y);

                let tile = match self.try_get_tile_ref(indices) {
                    Some(tile) if ignore_empty && tile.tile.is_empty() => continue,
                    Some(tile) => tile,
                    None if ignore_empty => continue,
                    None => TileRef::empty(self.index, indices),
                };

                if !exact(indices) {
                    continue;
                }
                if predicate.map_or(true, |accept| accept(&tile)) {
                    found.push(tile);
                }
            }
        }
        found
    }

    fn tile_quad(&self, indices: IVec2) -> [Vec2; 4] {
        let size = self.tile_size as f32;
        Box2::from_corners(indices.as_vec2() * size, (indices + 1).as_vec2() * size).corners()
    }

    /// Tiles overlapping a world-space box
    pub fn get_tiles_intersecting_box(
        &self,
        world_area: Box2,
        ignore_empty: bool,
        predicate: Option<TilePredicate<'_>>,
    ) -> Vec<TileRef> {
        if self.world_rotation == 0.0 {
            let local = world_area.translated(-self.world_position);
            return self.local_tiles_intersecting(local, ignore_empty, predicate, |_| true);
        }

        // A rotated grid sees the box as a rotated quad.
        let center = world_area.center();
        self.get_tiles_intersecting_rotated(
            Box2Rotated::new(world_area, 0.0, center),
            ignore_empty,
            predicate,
        )
    }

    /// Tiles overlapping a world-space rotated box (exact separating-axis test)
    pub fn get_tiles_intersecting_rotated(
        &self,
        world_area: Box2Rotated,
        ignore_empty: bool,
        predicate: Option<TilePredicate<'_>>,
    ) -> Vec<TileRef> {
        let quad = world_area.transformed_corners(&self.inv_world_matrix());
        let Some(bounds) = Box2::from_points(quad) else {
            return Vec::new();
        };

        self.local_tiles_intersecting(bounds, ignore_empty, predicate, |indices| {
            quads_overlap(&self.tile_quad(indices), &quad)
        })
    }

    /// Tiles whose center lies within a world-space circle
    pub fn get_tiles_intersecting_circle(
        &self,
        world_area: Circle,
        ignore_empty: bool,
        predicate: Option<TilePredicate<'_>>,
    ) -> Vec<TileRef> {
        let center = self.world_to_local(world_area.position);
        let bounds = world_area
            .bounding_box()
            .transformed(&self.inv_world_matrix());

        self.local_tiles_intersecting(bounds, ignore_empty, predicate, |indices| {
            self.grid_tile_to_local(indices).distance(center) <= world_area.radius
        })
    }

    // --- Anchoring ---

    /// Anchor an entity to a tile. Fails on empty tiles; never allocates.
    pub fn anchor_entity(&mut self, indices: IVec2, uid: EntityUid) -> bool {
        let tick = self.ticks.now();
        let chunk_indices = self.grid_tile_to_chunk_indices(indices);
        let Some(chunk) = self.chunks.get_mut(&chunk_indices) else {
            return false;
        };

        let local = chunk.grid_tile_to_chunk_tile(indices);
        if chunk.get_tile(local).is_empty() {
            return false;
        }

        chunk.add_anchored(local, uid, tick);
        chunk.touch_anchored(tick);
        self.last_anchored_modified_tick = self.last_anchored_modified_tick.max(tick);
        true
    }

    /// Remove an entity from a tile's anchor set. Returns whether it was there.
    pub fn unanchor_entity(&mut self, indices: IVec2, uid: EntityUid) -> bool {
        let tick = self.ticks.now();
        let chunk_indices = self.grid_tile_to_chunk_indices(indices);
        let Some(chunk) = self.chunks.get_mut(&chunk_indices) else {
            return false;
        };

        let local = chunk.grid_tile_to_chunk_tile(indices);
        if !chunk.remove_anchored(local, uid, tick) {
            return false;
        }

        self.last_anchored_modified_tick = self.last_anchored_modified_tick.max(tick);
        self.prune_chunk(chunk_indices);
        true
    }

    /// Mark a cell's anchored entities as changed without moving them
    pub fn anchored_entity_dirty(&mut self, indices: IVec2) {
        let tick = self.ticks.now();
        self.last_anchored_modified_tick = self.last_anchored_modified_tick.max(tick);

        let chunk_indices = self.grid_tile_to_chunk_indices(indices);
        if let Some(chunk) = self.chunks.get_mut(&chunk_indices) {
            chunk.touch_anchored(tick);
        }
    }

    /// Entities anchored to a tile. Missing chunks are not allocated.
    pub fn get_anchored_entities(&self, indices: IVec2) -> Vec<EntityUid> {
        match self.chunks.get(&self.grid_tile_to_chunk_indices(indices)) {
            Some(chunk) => chunk
                .anchored_at(chunk.grid_tile_to_chunk_tile(indices))
                .to_vec(),
            None => Vec::new(),
        }
    }

    /// Entities anchored to any non-empty tile overlapping a world-space box
    pub fn get_anchored_entities_in(&self, world_area: Box2) -> Vec<EntityUid> {
        self.get_tiles_intersecting_box(world_area, true, None)
            .iter()
            .flat_map(|tile| self.get_anchored_entities(tile.indices))
            .collect()
    }

    /// Entities one tile away in `dir`
    pub fn get_in_dir(&self, indices: IVec2, dir: Direction) -> Vec<EntityUid> {
        self.get_anchored_entities(indices + dir.offset())
    }

    pub fn get_offset(&self, indices: IVec2, offset: IVec2) -> Vec<EntityUid> {
        self.get_anchored_entities(indices + offset)
    }

    /// Center of the neighbouring tile in `dir`, grid-local
    pub fn direction_to_grid(&self, indices: IVec2, dir: Direction) -> Vec2 {
        self.grid_tile_to_local(indices + dir.offset())
    }

    /// The tile itself, then north, south, east and west
    pub fn get_cardinal_neighbor_cells(&self, indices: IVec2) -> Vec<EntityUid> {
        [
            IVec2::ZERO,
            IVec2::new(0, 1),
            IVec2::new(0, -1),
            IVec2::new(1, 0),
            IVec2::new(-1, 0),
        ]
        .iter()
        .flat_map(|offset| self.get_anchored_entities(indices + *offset))
        .collect()
    }

    /// Everything anchored in the `(2n + 1)²` square around a tile
    pub fn get_cells_in_square_area(&self, indices: IVec2, n: i32) -> Vec<EntityUid> {
        let mut found = Vec::new();
        for y in -n..=n {
            for x in -n..=n {
                found.extend(self.get_anchored_entities(indices + IVec2::new(x, y)));
            }
        }
        found
    }
}
