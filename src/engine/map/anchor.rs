// Binding entities (and their bodies) to tile cells

use glam::{IVec2, Vec2};

use super::grid::MapGrid;
use super::tile::GridId;
use crate::core::entity::EntityUid;
use crate::engine::physics::{BodyHandle, BodyType, PhysicsWorld, Pose};

/// Where an entity sits on a grid, and whether it is pinned to a tile.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    owner: EntityUid,
    /// Grid the entity is parented to (`GridId::INVALID` when off-grid)
    pub grid: GridId,
    /// Position in the grid's local space
    pub local_position: Vec2,
    pub local_rotation: f32,
    /// Physics body driven by this transform, if any
    pub body: Option<BodyHandle>,
    anchored_tile: Option<IVec2>,
}

impl Transform {
    pub fn new(owner: EntityUid, grid: GridId, local_position: Vec2) -> Self {
        Self {
            owner,
            grid,
            local_position,
            local_rotation: 0.0,
            body: None,
            anchored_tile: None,
        }
    }

    pub fn with_body(mut self, body: BodyHandle) -> Self {
        self.body = Some(body);
        self
    }

    pub fn owner(&self) -> EntityUid {
        self.owner
    }

    pub fn anchored(&self) -> bool {
        self.anchored_tile.is_some()
    }

    /// Tile the entity is anchored to
    pub fn anchored_tile(&self) -> Option<IVec2> {
        self.anchored_tile
    }
}

fn force_body_type(physics: &mut PhysicsWorld, body: BodyHandle, body_type: BodyType) {
    if let Err(err) = physics.set_body_type(body, body_type) {
        log::warn!("Could not make anchored body {:?}: {}", body_type, err);
    }
}

/// Anchor an entity to `tile` on `grid`.
///
/// Fails (returns `false`) when the tile is empty, or when the entity is still
/// anchored on another grid; it must be unanchored there first. On success the
/// entity is indexed in the tile's anchor set, snapped to the tile center and
/// any body it owns becomes static.
pub fn anchor_entity(
    grid: &mut MapGrid,
    physics: &mut PhysicsWorld,
    transform: &mut Transform,
    tile: IVec2,
) -> bool {
    if transform.anchored() && transform.grid != grid.index() {
        log::warn!(
            "{} is anchored on {}; unanchor it before anchoring on {}",
            transform.owner,
            transform.grid,
            grid.index()
        );
        return false;
    }

    if transform.anchored_tile == Some(tile) {
        return true;
    }

    if !grid.anchor_entity(tile, transform.owner) {
        log::trace!("{} cannot anchor onto empty tile {}", transform.owner, tile);
        return false;
    }

    if let Some(previous) = transform.anchored_tile {
        grid.unanchor_entity(previous, transform.owner);
    }

    transform.grid = grid.index();
    transform.anchored_tile = Some(tile);
    transform.local_position = grid.grid_tile_to_local(tile);

    if let Some(body) = transform.body {
        force_body_type(physics, body, BodyType::Static);
        let rotation = physics.pose(body).map_or(0.0, |pose| pose.rotation);
        physics.set_pose(body, Pose::new(grid.grid_tile_to_world(tile), rotation));
    }

    true
}

/// Release an anchored entity. Its body, if any, becomes dynamic again.
///
/// `grid` must be the grid the entity is anchored on; otherwise nothing
/// changes and `false` is returned.
pub fn unanchor_entity(grid: &mut MapGrid, physics: &mut PhysicsWorld, transform: &mut Transform) -> bool {
    let Some(tile) = transform.anchored_tile else {
        return false;
    };

    if transform.grid != grid.index() {
        log::warn!(
            "{} is anchored on {}, not {}",
            transform.owner,
            transform.grid,
            grid.index()
        );
        return false;
    }

    transform.anchored_tile = None;
    grid.unanchor_entity(tile, transform.owner);

    if let Some(body) = transform.body {
        force_body_type(physics, body, BodyType::Dynamic);
    }

    true
}
