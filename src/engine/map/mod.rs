// Chunked tile grids with an anchored-entity index

pub mod anchor;
pub mod chunk;
pub mod grid;
pub mod manager;
pub mod tile;

use thiserror::Error;

pub use anchor::{anchor_entity, unanchor_entity, Transform};
pub use chunk::MapChunk;
pub use grid::{Direction, GridEvent, MapGrid, TilePredicate};
pub use manager::MapManager;
pub use tile::{GridId, Tile, TileRef};

/// Errors raised by grid management
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    #[error("Unknown {0}")]
    UnknownGrid(GridId),

    #[error("{0} already exists")]
    GridExists(GridId),

    #[error("Grid id 0 is reserved")]
    InvalidGridId,
}
