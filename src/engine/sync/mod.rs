// Replication snapshots for bodies and grids

pub mod codec;
pub mod reconcile;
pub mod state;

use thiserror::Error;

use crate::engine::physics::{BodyHandle, PhysicsError};

pub use codec::{decode, encode, Stamped, StateReceiver};
pub use reconcile::{apply_state, diff_fixtures, FixtureDiff, ReconcileReport};
pub use state::{get_state, BodyState, ChunkTiles, GridState, GridTilesState};

/// Errors raised while capturing, transporting or applying snapshots
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to encode snapshot: {0}")]
    Encode(String),

    #[error("Failed to decode snapshot: {0}")]
    Decode(String),

    #[error("Unknown body {0:?}")]
    UnknownBody(BodyHandle),

    #[error("Chunk size mismatch: expected {expected}, got {actual}")]
    ChunkSize { expected: u16, actual: u16 },

    #[error("Invalid tile data: expected {expected} bytes, got {actual}")]
    TileData { expected: usize, actual: usize },

    #[error("Chunk {0} lies outside the tile index range")]
    ChunkIndices(glam::IVec2),

    #[error("Fixture '{id}' is invalid: {reason}")]
    InvalidFixture { id: String, reason: String },

    #[error(transparent)]
    Physics(#[from] PhysicsError),
}
