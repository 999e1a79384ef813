use anyhow::{Context, Result};
use glam::{IVec2, Vec2};
use log::info;
use std::time::Duration;

use tilephys::core::{EntityUid, GameLoop, SimConfig, TickSource};
use tilephys::engine::containers::{Container, ContainerManager, EntityContainer};
use tilephys::engine::map::{anchor_entity, unanchor_entity, GridEvent, MapManager, Tile, Transform};
use tilephys::engine::physics::{presets, BodyBuilder, BodyType, PhysicsWorld, Pose};
use tilephys::engine::sync::{apply_state, encode, get_state, BodyState, GridTilesState, Stamped, StateReceiver};

const FLOOR: u16 = 1;
const WALL: u16 = 2;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting tilephys demo...");

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => SimConfig::default(),
    };

    let ticks = TickSource::new();
    let mut game_loop = GameLoop::new(ticks.clone());
    let mut physics = PhysicsWorld::new(config.physics.clone());
    let mut maps = MapManager::new(config.map.clone(), ticks.clone());

    // A small room: floor everywhere, walls around the edge
    let grid_id = maps.create_grid();
    let grid = maps.try_grid_mut(grid_id)?;
    let mut tiles = Vec::new();
    for x in -8..8 {
        for y in -8..8 {
            let edge = x == -8 || x == 7 || y == -8 || y == 7;
            tiles.push((IVec2::new(x, y), Tile::new(if edge { WALL } else { FLOOR })));
        }
    }
    grid.set_tiles(&tiles);
    info!(
        "Built {} with {} chunks, bounds {:?}",
        grid_id,
        grid.chunk_count(),
        grid.local_bounds()
    );

    // A crate that slides across the room
    let crate_body = BodyBuilder::from_config(BodyType::Dynamic, &config.physics)
        .fixture(presets::mob_fixture(0.4))
        .linvel(2.0, 0.0)
        .sleeping_allowed(true)
        .build()?;
    let crate_handle = physics.add_body_at(crate_body, Pose::at(Vec2::new(-4.0, 0.0)));

    // A turret bolted to a tile
    let turret_body = BodyBuilder::new_dynamic()
        .fixture(presets::wall_fixture(config.map.tile_size as f32))
        .build()?;
    let turret_handle = physics.add_body(turret_body);
    let mut turret = Transform::new(EntityUid(2), grid_id, Vec2::ZERO).with_body(turret_handle);
    if anchor_entity(grid, &mut physics, &mut turret, IVec2::new(3, 3)) {
        info!("Turret anchored at {:?}", turret.anchored_tile());
    }

    let mut storage = ContainerManager::new(EntityUid(2));
    storage
        .ensure_container::<EntityContainer>("ammo")?
        .insert(EntityUid(10));
    info!("Turret holds {:?}", storage.container_of(EntityUid(10)));

    // Simulate two seconds of fixed updates
    for _ in 0..120 {
        for _ in 0..game_loop.accumulate(Duration::from_millis(17)) {
            physics.step(game_loop.fixed_timestep());
        }
    }

    let pose = physics.pose(crate_handle).unwrap_or_default();
    let tile = maps
        .grid(grid_id)
        .map(|grid| grid.get_tile_ref(grid.world_to_tile(pose.position)));
    info!(
        "After {} updates ({}) the crate is at {:?} over {:?}",
        game_loop.update_count(),
        ticks.now(),
        pose.position,
        tile.map(|t| t.tile.type_id)
    );

    for event in physics.drain_events() {
        info!("{:?}: {:?}", event.body, event.event);
    }

    // Replicate the crate and the room to a mirror world
    let snapshot = Stamped::new(ticks.now(), get_state(&physics, crate_handle)?);
    let bytes = encode(&snapshot)?;
    info!("Crate snapshot is {} bytes of CBOR", bytes.len());

    let mut mirror = PhysicsWorld::new(config.physics.clone());
    let mirror_handle = mirror.add_body(BodyBuilder::new_dynamic().build()?);
    let mut receiver: StateReceiver<BodyState> = StateReceiver::new();
    receiver.offer_bytes(&bytes)?;
    if let Some(latest) = receiver.take() {
        let report = apply_state(&mut mirror, mirror_handle, &latest.state)?;
        info!("Mirror reconciled: +{:?} -{:?}", report.added, report.removed);
    }

    let mut mirror_maps = MapManager::new(config.map.clone(), ticks.clone());
    let mirror_grid = mirror_maps.create_grid_with_id(grid_id)?;
    if let Some(grid) = maps.grid(grid_id) {
        let room = GridTilesState::capture(grid);
        info!("Room snapshot is {} bytes of CBOR", encode(&room)?.len());
        room.apply(mirror_maps.try_grid_mut(mirror_grid)?)?;
    }

    // Tear the room down again
    let grid = maps.try_grid_mut(grid_id)?;
    unanchor_entity(grid, &mut physics, &mut turret);
    let clear: Vec<_> = tiles.iter().map(|(indices, _)| (*indices, Tile::EMPTY)).collect();
    grid.set_tiles(&clear);
    for event in maps.drain_events_and_prune() {
        if let GridEvent::EmptyGrid { grid } = event {
            info!("{} emptied; {} grids left", grid, maps.grid_count());
        }
    }

    info!("Demo finished");
    Ok(())
}
