// Owner of every grid in the simulation

use glam::Vec2;
use std::collections::BTreeMap;

use super::grid::{GridEvent, MapGrid};
use super::tile::GridId;
use super::MapError;
use crate::core::config::MapConfig;
use crate::core::math::Box2;
use crate::core::timing::TickSource;

/// Creates, looks up and deletes grids.
///
/// Grids share the manager's tick source so their change ticks line up with
/// the rest of the simulation.
#[derive(Debug)]
pub struct MapManager {
    config: MapConfig,
    ticks: TickSource,
    grids: BTreeMap<GridId, MapGrid>,
    next_id: u32,
}

impl MapManager {
    pub fn new(config: MapConfig, ticks: TickSource) -> Self {
        Self {
            config,
            ticks,
            grids: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn ticks(&self) -> &TickSource {
        &self.ticks
    }

    /// Create a grid with the next free id
    pub fn create_grid(&mut self) -> GridId {
        while self.grids.contains_key(&GridId(self.next_id)) {
            self.next_id += 1;
        }
        let id = GridId(self.next_id);
        self.next_id += 1;

        self.insert_grid(id);
        id
    }

    /// Create a grid with a caller-chosen id (e.g. one received from a server)
    pub fn create_grid_with_id(&mut self, id: GridId) -> Result<GridId, MapError> {
        if !id.is_valid() {
            return Err(MapError::InvalidGridId);
        }
        if self.grids.contains_key(&id) {
            return Err(MapError::GridExists(id));
        }

        self.insert_grid(id);
        Ok(id)
    }

    fn insert_grid(&mut self, id: GridId) {
        let grid = MapGrid::from_config(id, &self.config, self.ticks.clone());
        self.grids.insert(id, grid);
        log::debug!("Created {}", id);
    }

    pub fn delete_grid(&mut self, id: GridId) -> Result<MapGrid, MapError> {
        let grid = self.grids.remove(&id).ok_or(MapError::UnknownGrid(id))?;
        log::debug!("Deleted {} ({} chunks)", id, grid.chunk_count());
        Ok(grid)
    }

    pub fn has_grid(&self, id: GridId) -> bool {
        self.grids.contains_key(&id)
    }

    pub fn grid(&self, id: GridId) -> Option<&MapGrid> {
        self.grids.get(&id)
    }

    pub fn grid_mut(&mut self, id: GridId) -> Option<&mut MapGrid> {
        self.grids.get_mut(&id)
    }

    /// Like [`grid_mut`](Self::grid_mut) but an unknown id is an error
    pub fn try_grid_mut(&mut self, id: GridId) -> Result<&mut MapGrid, MapError> {
        self.grids.get_mut(&id).ok_or(MapError::UnknownGrid(id))
    }

    /// All grids in id order
    pub fn grids(&self) -> impl Iterator<Item = &MapGrid> {
        self.grids.values()
    }

    pub fn grid_count(&self) -> usize {
        self.grids.len()
    }

    /// Grids whose world bounds overlap `area`
    pub fn find_grids_intersecting(&self, area: Box2) -> Vec<GridId> {
        self.grids
            .values()
            .filter(|grid| grid.chunk_count() > 0 && grid.world_bounds().intersects(&area))
            .map(MapGrid::index)
            .collect()
    }

    /// First grid with a non-empty tile under a world position
    pub fn find_grid_at(&self, world: Vec2) -> Option<GridId> {
        self.grids
            .values()
            .find(|grid| {
                grid.try_get_tile_ref_at(world)
                    .is_some_and(|tile| !tile.tile.is_empty())
            })
            .map(MapGrid::index)
    }

    /// Collect queued events from every grid, in grid id order
    pub fn drain_events(&mut self) -> Vec<GridEvent> {
        self.grids
            .values_mut()
            .flat_map(|grid| grid.take_events())
            .collect()
    }

    /// Drain events and delete every grid that reported itself empty.
    /// Returns the drained events.
    pub fn drain_events_and_prune(&mut self) -> Vec<GridEvent> {
        let events = self.drain_events();
        for event in &events {
            if let GridEvent::EmptyGrid { grid } = event {
                // Something may have been written since the event was raised.
                if self.grids.get(grid).is_some_and(|g| g.chunk_count() == 0) {
                    self.grids.remove(grid);
                    log::info!("Deleted empty {}", grid);
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::map::tile::Tile;
    use glam::IVec2;

    fn manager() -> MapManager {
        MapManager::new(MapConfig::default(), TickSource::new())
    }

    #[test]
    fn test_ids_are_unique() {
        let mut maps = manager();
        maps.create_grid_with_id(GridId(2)).unwrap();
        let a = maps.create_grid();
        let b = maps.create_grid();
        assert_eq!(a, GridId(1));
        assert_eq!(b, GridId(3));
        assert_eq!(
            maps.create_grid_with_id(GridId(3)),
            Err(MapError::GridExists(GridId(3)))
        );
        assert_eq!(
            maps.create_grid_with_id(GridId::INVALID),
            Err(MapError::InvalidGridId)
        );
    }

    #[test]
    fn test_delete_unknown_grid() {
        let mut maps = manager();
        assert!(matches!(
            maps.delete_grid(GridId(9)),
            Err(MapError::UnknownGrid(GridId(9)))
        ));
    }

    #[test]
    fn test_find_grid_at_position() {
        let mut maps = manager();
        let a = maps.create_grid();
        let b = maps.create_grid();
        maps.grid_mut(b).unwrap().set_world_position(Vec2::new(50.0, 0.0));
        maps.grid_mut(b).unwrap().set_tile(IVec2::new(0, 0), Tile::new(1));
        maps.grid_mut(a).unwrap().set_tile(IVec2::new(0, 0), Tile::new(1));

        assert_eq!(maps.find_grid_at(Vec2::new(50.5, 0.5)), Some(b));
        assert_eq!(maps.find_grid_at(Vec2::new(0.5, 0.5)), Some(a));
        assert_eq!(maps.find_grid_at(Vec2::new(20.0, 0.5)), None);
        assert_eq!(
            maps.find_grids_intersecting(Box2::new(40.0, -1.0, 60.0, 1.0)),
            vec![b]
        );
    }

    #[test]
    fn test_empty_grid_is_pruned() {
        let mut maps = manager();
        let id = maps.create_grid();
        let grid = maps.grid_mut(id).unwrap();
        grid.set_tile(IVec2::new(0, 0), Tile::new(1));
        grid.set_tile(IVec2::new(0, 0), Tile::EMPTY);

        let events = maps.drain_events_and_prune();
        assert!(events.contains(&GridEvent::EmptyGrid { grid: id }));
        assert!(!maps.has_grid(id));
    }
}
