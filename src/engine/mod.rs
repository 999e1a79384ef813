// Engine modules: physics, tile maps, replication, containers

pub mod containers;
pub mod map;
pub mod physics;
pub mod sync;
