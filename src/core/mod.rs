// Core utilities shared by physics, maps and replication

pub mod config;
pub mod entity;
pub mod math;
pub mod timing;

pub use config::{ConfigError, MapConfig, PhysicsConfig, SimConfig};
pub use entity::EntityUid;
pub use math::{Box2, Box2Rotated, Circle};
pub use timing::{GameLoop, GameTick, TickSource};
