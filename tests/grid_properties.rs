// Tile grid properties exercised through the public API

use glam::{IVec2, Vec2};
use std::collections::BTreeSet;

use tilephys::core::{Box2, MapConfig, TickSource};
use tilephys::engine::map::{GridEvent, GridId, MapGrid, MapManager, Tile};

fn grid(chunk_size: u16) -> MapGrid {
    MapGrid::new(GridId(1), chunk_size, 1, TickSource::new())
}

/// Small deterministic generator so the populated pattern is reproducible
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.0 >> 8
    }
}

#[test]
fn test_sixteen_chunk_scenario() {
    let mut grid = grid(16);

    let read = grid.get_tile_ref(IVec2::new(5, 3));
    assert!(read.tile.is_empty());
    assert_eq!(read.indices, IVec2::new(5, 3));
    assert_eq!(grid.chunk_count(), 0);

    grid.set_tile(IVec2::new(20, 3), Tile::new(7));
    assert_eq!(grid.chunk_indices(), vec![IVec2::new(1, 0)]);
    assert!(!grid.has_chunk(IVec2::new(0, 0)));

    // Reading inside the untouched chunk still allocates nothing
    assert!(grid.get_tile_ref(IVec2::new(5, 3)).tile.is_empty());
    assert_eq!(grid.chunk_count(), 1);
}

#[test]
fn test_read_after_write() {
    let mut grid = grid(8);
    let mut rng = Lcg(42);

    for _ in 0..500 {
        let indices = IVec2::new((rng.next() % 64) as i32 - 32, (rng.next() % 64) as i32 - 32);
        let tile = match (rng.next() % 4) as u16 {
            0 => Tile::EMPTY,
            type_id => Tile::with_variant(type_id, (rng.next() % 3) as u8),
        };
        grid.set_tile(indices, tile);
        assert_eq!(grid.get_tile_ref(indices).tile, tile);
    }
}

#[test]
fn test_batched_writes_read_back() {
    let mut grid = grid(8);
    let writes: Vec<(IVec2, Tile)> = (-10..10)
        .flat_map(|x| (-3..3).map(move |y| (IVec2::new(x, y), Tile::new(((x + y).rem_euclid(3)) as u16))))
        .collect();

    grid.set_tiles(&writes);

    for (indices, tile) in &writes {
        assert_eq!(grid.get_tile_ref(*indices).tile, *tile);
    }
    for indices in grid.chunk_indices() {
        assert_eq!(grid.get_chunk(indices).unwrap().regeneration_count(), 1);
    }
}

#[test]
fn test_box_query_matches_brute_force() {
    let mut grid = grid(8);
    grid.set_world_position(Vec2::new(0.5, -3.25));

    let mut rng = Lcg(7);
    let mut filled = BTreeSet::new();
    for x in -20..20 {
        for y in -20..20 {
            if rng.next() % 3 == 0 {
                grid.set_tile(IVec2::new(x, y), Tile::new(1));
                filled.insert((x, y));
            }
        }
    }

    let boxes = [
        Box2::new(-3.3, -2.7, 4.1, 5.9),
        Box2::new(0.5, -3.25, 1.5, -2.25),
        Box2::new(-25.0, -25.0, 25.0, 25.0),
        Box2::new(2.0, 2.0, 6.0, 3.0),
        Box2::new(10.1, 10.1, 10.2, 10.2),
    ];

    for area in boxes {
        let found: BTreeSet<(i32, i32)> = grid
            .get_tiles_intersecting_box(area, true, None)
            .iter()
            .map(|t| (t.x(), t.y()))
            .collect();

        // Cell [x, x + 1) × [y, y + 1) against the closed box, in grid space
        let local = area.translated(-grid.world_position());
        let expected: BTreeSet<(i32, i32)> = filled
            .iter()
            .copied()
            .filter(|&(x, y)| {
                let (x, y) = (x as f32, y as f32);
                x <= local.right && x + 1.0 > local.left && y <= local.top && y + 1.0 > local.bottom
            })
            .collect();

        assert_eq!(found, expected, "query {:?}", area);
    }
}

#[test]
fn test_empty_grid_notification() {
    let mut maps = MapManager::new(MapConfig::default(), TickSource::new());
    let id = maps.create_grid();
    let grid = maps.grid_mut(id).unwrap();

    grid.set_tiles(&[
        (IVec2::new(0, 0), Tile::new(1)),
        (IVec2::new(-1, -1), Tile::new(1)),
    ]);
    assert_eq!(grid.chunk_count(), 2);

    grid.set_tile(IVec2::new(0, 0), Tile::EMPTY);
    grid.take_events();
    grid.set_tile(IVec2::new(-1, -1), Tile::EMPTY);

    let events = maps.drain_events();
    assert_eq!(
        events.last(),
        Some(&GridEvent::EmptyGrid { grid: id })
    );
    assert_eq!(
        events.iter().filter(|e| matches!(e, GridEvent::EmptyGrid { .. })).count(),
        1
    );
}
