use bytemuck::{Pod, Zeroable};
use glam::IVec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a grid within the map manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GridId(pub u32);

impl GridId {
    /// Reserved "no grid" value
    pub const INVALID: GridId = GridId(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid {}", self.0)
    }
}

/// One tile cell: a tile definition plus per-cell data.
///
/// The all-zero value is the empty (space) tile. Layout is fixed so chunks can
/// be replicated as raw bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct Tile {
    /// Tile definition id; 0 means no tile
    pub type_id: u16,
    pub flags: u8,
    /// Visual variant of the tile definition
    pub variant: u8,
}

impl Tile {
    pub const EMPTY: Tile = Tile {
        type_id: 0,
        flags: 0,
        variant: 0,
    };

    pub fn new(type_id: u16) -> Self {
        Self {
            type_id,
            flags: 0,
            variant: 0,
        }
    }

    pub fn with_variant(type_id: u16, variant: u8) -> Self {
        Self {
            type_id,
            flags: 0,
            variant,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.type_id == 0
    }
}

/// A tile value together with where it lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRef {
    pub grid: GridId,
    /// Grid-space tile indices
    pub indices: IVec2,
    pub tile: Tile,
}

impl TileRef {
    pub fn new(grid: GridId, indices: IVec2, tile: Tile) -> Self {
        Self {
            grid,
            indices,
            tile,
        }
    }

    /// Reference to the empty tile at `indices` (nothing is allocated for it)
    pub fn empty(grid: GridId, indices: IVec2) -> Self {
        Self::new(grid, indices, Tile::EMPTY)
    }

    pub fn x(&self) -> i32 {
        self.indices.x
    }

    pub fn y(&self) -> i32 {
        self.indices.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_tile_is_empty() {
        let tile: Tile = Zeroable::zeroed();
        assert!(tile.is_empty());
        assert_eq!(tile, Tile::EMPTY);
        assert_eq!(std::mem::size_of::<Tile>(), 4);
    }

    #[test]
    fn test_tile_bytes() {
        let tiles = [Tile::with_variant(3, 2), Tile::EMPTY];
        let bytes: &[u8] = bytemuck::cast_slice(&tiles);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[4..], &[0, 0, 0, 0]);

        let back: Tile = bytemuck::pod_read_unaligned(&bytes[..4]);
        assert_eq!(back, tiles[0]);
    }
}
