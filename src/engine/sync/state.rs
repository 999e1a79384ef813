// Snapshot types sent to remote observers

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use std::mem::size_of;

use super::SyncError;
use crate::core::timing::GameTick;
use crate::engine::map::{GridId, MapGrid, Tile};
use crate::engine::physics::{BodyHandle, BodyStatus, BodyType, Fixture, PhysicsWorld, RigidBody};

/// Replicated state of a rigid body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyState {
    pub can_collide: bool,
    pub sleeping_allowed: bool,
    pub fixed_rotation: bool,
    pub status: BodyStatus,
    /// In body order; reconciliation matches them by ID, never by position
    pub fixtures: Vec<Fixture>,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub body_type: BodyType,
}

impl BodyState {
    pub fn capture(body: &RigidBody) -> Self {
        Self {
            can_collide: body.can_collide(),
            sleeping_allowed: body.sleeping_allowed(),
            fixed_rotation: body.fixed_rotation(),
            status: body.status(),
            fixtures: body.fixtures().to_vec(),
            linear_velocity: body.linear_velocity(),
            angular_velocity: body.angular_velocity(),
            body_type: body.body_type(),
        }
    }
}

/// Snapshot a body in the world
pub fn get_state(world: &PhysicsWorld, handle: BodyHandle) -> Result<BodyState, SyncError> {
    world
        .body(handle)
        .map(BodyState::capture)
        .ok_or(SyncError::UnknownBody(handle))
}

/// Replicated identity of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridState {
    pub grid_index: GridId,
}

impl GridState {
    pub fn capture(grid: &MapGrid) -> Self {
        Self {
            grid_index: grid.index(),
        }
    }
}

/// Raw tiles of one chunk, row-major, in `Tile`'s byte layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkTiles {
    pub indices: IVec2,
    pub tiles: Vec<u8>,
}

/// Tile contents of a grid, whole or as a delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridTilesState {
    pub grid_index: GridId,
    pub chunk_size: u16,
    /// `true` when every allocated chunk is included; chunks missing from a
    /// full snapshot are cleared on apply.
    pub full: bool,
    pub chunks: Vec<ChunkTiles>,
}

impl GridTilesState {
    /// Every allocated chunk
    pub fn capture(grid: &MapGrid) -> Self {
        Self::collect(grid, true, |_| true)
    }

    /// Only chunks whose tiles changed after `since`
    pub fn capture_since(grid: &MapGrid, since: GameTick) -> Self {
        Self::collect(grid, false, |tick| tick > since)
    }

    fn collect(grid: &MapGrid, full: bool, include: impl Fn(GameTick) -> bool) -> Self {
        let chunks = grid
            .chunk_indices()
            .into_iter()
            .filter_map(|indices| grid.get_chunk(indices))
            .filter(|chunk| include(chunk.last_tile_modified_tick()))
            .map(|chunk| ChunkTiles {
                indices: chunk.indices(),
                tiles: bytemuck::cast_slice(chunk.tile_data()).to_vec(),
            })
            .collect();

        Self {
            grid_index: grid.index(),
            chunk_size: grid.chunk_size(),
            full,
            chunks,
        }
    }

    /// Write the snapshot into `grid` as one batch.
    ///
    /// Every chunk is validated before anything is written, so a malformed
    /// snapshot leaves the grid untouched.
    pub fn apply(&self, grid: &mut MapGrid) -> Result<(), SyncError> {
        if self.chunk_size != grid.chunk_size() {
            return Err(SyncError::ChunkSize {
                expected: grid.chunk_size(),
                actual: self.chunk_size,
            });
        }

        let size = self.chunk_size as i32;
        let expected = size as usize * size as usize * size_of::<Tile>();
        if let Some(bad) = self.chunks.iter().find(|c| c.tiles.len() != expected) {
            return Err(SyncError::TileData {
                expected,
                actual: bad.tiles.len(),
            });
        }

        let origins = self
            .chunks
            .iter()
            .map(|c| chunk_origin(c.indices, size).ok_or(SyncError::ChunkIndices(c.indices)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut writes = Vec::new();
        for (chunk, origin) in self.chunks.iter().zip(origins) {
            for (i, bytes) in chunk.tiles.chunks_exact(size_of::<Tile>()).enumerate() {
                let local = IVec2::new(i as i32 % size, i as i32 / size);
                let tile: Tile = bytemuck::pod_read_unaligned(bytes);
                writes.push((origin + local, tile));
            }
        }

        if self.full {
            for indices in grid.chunk_indices() {
                if self.chunks.iter().any(|c| c.indices == indices) {
                    continue;
                }
                if let Some(chunk) = grid.get_chunk(indices) {
                    writes.extend(
                        chunk
                            .tiles(grid.index())
                            .filter(|t| !t.tile.is_empty())
                            .map(|t| (t.indices, Tile::EMPTY)),
                    );
                }
            }
        }

        log::trace!(
            "Applying {} chunks ({} writes) to {}",
            self.chunks.len(),
            writes.len(),
            grid.index()
        );
        grid.set_tiles(&writes);
        Ok(())
    }
}

/// First tile of a chunk, or `None` if any of its tiles falls outside `i32`
fn chunk_origin(indices: IVec2, size: i32) -> Option<IVec2> {
    let x = indices.x.checked_mul(size)?;
    let y = indices.y.checked_mul(size)?;
    x.checked_add(size - 1)?;
    y.checked_add(size - 1)?;
    Some(IVec2::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timing::TickSource;
    use crate::engine::physics::{BodyBuilder, FixtureBuilder};

    #[test]
    fn test_body_state_field_names() {
        let body = BodyBuilder::new_dynamic()
            .fixture(FixtureBuilder::circle(0.5).id("hull").build())
            .linvel(1.0, 2.0)
            .build()
            .unwrap();
        let state = BodyState::capture(&body);

        let text = ron::to_string(&state).unwrap();
        assert!(text.contains("canCollide"));
        assert!(text.contains("linearVelocity"));
        assert!(text.contains("bodyType"));
        assert!(text.contains("Dynamic"));
        assert_eq!(state.fixtures[0].id(), "hull");
    }

    #[test]
    fn test_grid_tiles_copy_between_grids() {
        let ticks = TickSource::new();
        let mut source = MapGrid::new(GridId(1), 4, 1, ticks.clone());
        source.set_tile(IVec2::new(-1, 0), Tile::with_variant(2, 1));
        source.set_tile(IVec2::new(5, 5), Tile::new(3));

        let mut target = MapGrid::new(GridId(1), 4, 1, ticks.clone());
        target.set_tile(IVec2::new(20, 20), Tile::new(9));

        GridTilesState::capture(&source).apply(&mut target).unwrap();

        assert_eq!(target.get_tile_ref(IVec2::new(-1, 0)).tile, Tile::with_variant(2, 1));
        assert_eq!(target.get_tile_ref(IVec2::new(5, 5)).tile, Tile::new(3));
        assert!(target.get_tile_ref(IVec2::new(20, 20)).tile.is_empty());
        assert_eq!(target.chunk_count(), 2);
    }

    #[test]
    fn test_delta_only_has_changed_chunks() {
        let ticks = TickSource::new();
        let mut grid = MapGrid::new(GridId(1), 4, 1, ticks.clone());
        grid.set_tile(IVec2::new(0, 0), Tile::new(1));
        ticks.set(GameTick(10));
        grid.set_tile(IVec2::new(8, 0), Tile::new(1));

        let delta = GridTilesState::capture_since(&grid, GameTick(5));
        assert!(!delta.full);
        assert_eq!(delta.chunks.len(), 1);
        assert_eq!(delta.chunks[0].indices, IVec2::new(2, 0));
    }

    #[test]
    fn test_bad_tile_data_rejected() {
        let mut grid = MapGrid::new(GridId(1), 4, 1, TickSource::new());
        let state = GridTilesState {
            grid_index: GridId(1),
            chunk_size: 4,
            full: false,
            chunks: vec![ChunkTiles {
                indices: IVec2::ZERO,
                tiles: vec![0; 10],
            }],
        };

        assert!(matches!(
            state.apply(&mut grid),
            Err(SyncError::TileData { expected: 64, actual: 10 })
        ));
        assert_eq!(grid.chunk_count(), 0);
    }

    #[test]
    fn test_out_of_range_chunk_rejected() {
        let mut grid = MapGrid::new(GridId(1), 4, 1, TickSource::new());
        let state = GridTilesState {
            grid_index: GridId(1),
            chunk_size: 4,
            full: false,
            chunks: vec![
                ChunkTiles {
                    indices: IVec2::ZERO,
                    tiles: bytemuck::cast_slice(&[Tile::new(1); 16]).to_vec(),
                },
                ChunkTiles {
                    indices: IVec2::new(i32::MAX / 2, 0),
                    tiles: vec![0; 64],
                },
            ],
        };

        assert!(matches!(
            state.apply(&mut grid),
            Err(SyncError::ChunkIndices(indices)) if indices == IVec2::new(i32::MAX / 2, 0)
        ));
        assert_eq!(grid.chunk_count(), 0);

        // The last chunk that still fits is fine
        assert_eq!(
            chunk_origin(IVec2::new(i32::MAX / 4, -3), 4),
            Some(IVec2::new(i32::MAX - 3, -12))
        );
        assert_eq!(chunk_origin(IVec2::new(i32::MAX / 4 + 1, 0), 4), None);
        assert_eq!(chunk_origin(IVec2::new(0, i32::MIN / 4 - 1), 4), None);
    }
}
