// Rigid-body state and chunked tile grids for 2D multiplayer games

pub mod core;
pub mod engine;

pub use crate::core::{GameTick, SimConfig, TickSource};
pub use crate::engine::map::{MapGrid, MapManager};
pub use crate::engine::physics::PhysicsWorld;
