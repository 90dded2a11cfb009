//! Lightmap geometry: unit conversions, grid dimensions, and chunk addressing.
//!
//! Three coordinate spaces are involved:
//!
//! - **world units**: 32 per tile horizontally, 8 per element height unit.
//! - **light units**: fixed-point light positions, 16 per lightmap cell on
//!   every axis (x and y equal world units, z is world z / 2).
//! - **cells**: lightmap voxels, 2 per tile horizontally and one per 4 height
//!   units vertically, grouped in cubic chunks of 16.

use std::fmt;

use parklight_config::MapConfig;
use parklight_world::{TILE_SIZE, TileCoord, WorldPos, Z_STEP};

use crate::error::LightingError;

/// Lightmap cells per tile along X and Y.
pub const TILE_CELLS: i32 = 2;

/// Element height units per lightmap cell.
pub const HEIGHT_UNITS_PER_CELL: i32 = 4;

/// Light position units per lightmap cell.
pub const LIGHT_UNITS_PER_CELL: i32 = 16;

/// Chunk edge length in cells.
pub const LIGHTMAP_CHUNK_SIZE: usize = 16;

/// Cells per chunk.
pub const CHUNK_VOLUME: usize = LIGHTMAP_CHUNK_SIZE * LIGHTMAP_CHUNK_SIZE * LIGHTMAP_CHUNK_SIZE;

/// Radius of a light's reach in cells.
pub const MAXSPREAD: i32 = 12;

const _: () = assert!(TILE_SIZE == TILE_CELLS * LIGHT_UNITS_PER_CELL);
const _: () = assert!(HEIGHT_UNITS_PER_CELL * Z_STEP == 2 * LIGHT_UNITS_PER_CELL);

/// Converts a world position into light units.
pub fn world_to_light(pos: WorldPos) -> [i32; 3] {
    [pos.x, pos.y, pos.z.div_euclid(2)]
}

/// Cell containing a light-unit position.
pub fn light_to_cell(pos: [i32; 3]) -> [i32; 3] {
    pos.map(|v| v.div_euclid(LIGHT_UNITS_PER_CELL))
}

/// Cell layer containing element height `height` (rounded down).
pub fn height_to_cell(height: u8) -> i32 {
    height as i32 / HEIGHT_UNITS_PER_CELL
}

/// First cell layer at or above element height `height` (rounded up).
pub fn height_to_cell_ceil(height: u8) -> i32 {
    (height as i32 + HEIGHT_UNITS_PER_CELL - 1) / HEIGHT_UNITS_PER_CELL
}

/// First cell column of a tile along X and Y.
pub fn tile_to_cell(tile: TileCoord) -> [i32; 2] {
    [tile.x * TILE_CELLS, tile.y * TILE_CELLS]
}

/// Tile owning a cell column.
pub fn cell_to_tile(cx: i32, cy: i32) -> TileCoord {
    TileCoord::new(cx.div_euclid(TILE_CELLS), cy.div_euclid(TILE_CELLS))
}

/// Flat index of a cell inside its chunk.
#[inline]
pub fn local_index(x: usize, y: usize, z: usize) -> usize {
    (z * LIGHTMAP_CHUNK_SIZE + y) * LIGHTMAP_CHUNK_SIZE + x
}

/// Chunk position in chunk space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl ChunkCoord {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// First cell of this chunk.
    pub fn origin_cell(self) -> [i32; 3] {
        let s = LIGHTMAP_CHUNK_SIZE as i32;
        [self.x as i32 * s, self.y as i32 * s, self.z as i32 * s]
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Lightmap size in cells and chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridDims {
    /// Cells along each axis.
    pub cells: [usize; 3],
    /// Chunks along each axis.
    pub chunks: [usize; 3],
}

impl GridDims {
    /// Derives the lightmap size from the map size.
    pub fn from_map(map: &MapConfig) -> Result<Self, LightingError> {
        let cells = [
            map.tiles_x as usize * TILE_CELLS as usize,
            map.tiles_y as usize * TILE_CELLS as usize,
            map.height_cells as usize,
        ];
        Self::from_cells(cells)
    }

    /// Validates a size given directly in cells.
    pub fn from_cells(cells: [usize; 3]) -> Result<Self, LightingError> {
        if cells
            .iter()
            .any(|&c| c == 0 || c % LIGHTMAP_CHUNK_SIZE != 0)
        {
            return Err(LightingError::InvalidDimensions {
                x: cells[0],
                y: cells[1],
                z: cells[2],
                chunk: LIGHTMAP_CHUNK_SIZE,
            });
        }
        Ok(Self {
            cells,
            chunks: cells.map(|c| c / LIGHTMAP_CHUNK_SIZE),
        })
    }

    /// Map size in tiles covered by the grid.
    pub fn tiles(&self) -> (u32, u32) {
        (
            (self.cells[0] / TILE_CELLS as usize) as u32,
            (self.cells[1] / TILE_CELLS as usize) as u32,
        )
    }

    /// Returns `true` if `tile` is covered by the grid.
    pub fn contains_tile(&self, tile: TileCoord) -> bool {
        let (tx, ty) = self.tiles();
        tile.x >= 0 && tile.y >= 0 && (tile.x as u32) < tx && (tile.y as u32) < ty
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks[0] * self.chunks[1] * self.chunks[2]
    }

    /// Number of cell columns (X * Y).
    pub fn column_count(&self) -> usize {
        self.cells[0] * self.cells[1]
    }

    #[inline]
    pub fn contains_cell(&self, cell: [i32; 3]) -> bool {
        (0..3).all(|a| cell[a] >= 0 && (cell[a] as usize) < self.cells[a])
    }

    #[inline]
    pub fn chunk_index(&self, coord: ChunkCoord) -> usize {
        (coord.z as usize * self.chunks[1] + coord.y as usize) * self.chunks[0] + coord.x as usize
    }

    pub fn chunk_coord(&self, index: usize) -> ChunkCoord {
        let x = index % self.chunks[0];
        let y = (index / self.chunks[0]) % self.chunks[1];
        let z = index / (self.chunks[0] * self.chunks[1]);
        ChunkCoord::new(x as u32, y as u32, z as u32)
    }

    /// Chunk index and local index of an in-grid cell.
    #[inline]
    pub fn locate(&self, cell: [usize; 3]) -> (usize, usize) {
        let s = LIGHTMAP_CHUNK_SIZE;
        let chunk = ChunkCoord::new(
            (cell[0] / s) as u32,
            (cell[1] / s) as u32,
            (cell[2] / s) as u32,
        );
        (
            self.chunk_index(chunk),
            local_index(cell[0] % s, cell[1] % s, cell[2] % s),
        )
    }

    /// Chunk containing a signed cell, or `None` outside the grid.
    pub fn chunk_at_cell(&self, cell: [i32; 3]) -> Option<ChunkCoord> {
        if !self.contains_cell(cell) {
            return None;
        }
        let s = LIGHTMAP_CHUNK_SIZE as i32;
        Some(ChunkCoord::new(
            (cell[0] / s) as u32,
            (cell[1] / s) as u32,
            (cell[2] / s) as u32,
        ))
    }

    /// Indices of every chunk intersecting the inclusive cell box `min..=max`,
    /// clamped to the grid.
    pub fn chunks_in_cell_box(&self, min: [i32; 3], max: [i32; 3]) -> Vec<usize> {
        let s = LIGHTMAP_CHUNK_SIZE as i32;
        let mut lo = [0usize; 3];
        let mut hi = [0usize; 3];
        for a in 0..3 {
            let last = self.cells[a] as i32 - 1;
            let (min_a, max_a) = (min[a].max(0), max[a].min(last));
            if min_a > max_a {
                return Vec::new();
            }
            lo[a] = (min_a / s) as usize;
            hi[a] = (max_a / s) as usize;
        }
        let mut out = Vec::with_capacity((hi[0] - lo[0] + 1) * (hi[1] - lo[1] + 1) * (hi[2] - lo[2] + 1));
        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    out.push(self.chunk_index(ChunkCoord::new(x as u32, y as u32, z as u32)));
                }
            }
        }
        out
    }

    /// Chunks a light centred on `cell` can reach.
    pub fn chunks_in_reach(&self, cell: [i32; 3]) -> Vec<usize> {
        self.chunks_in_cell_box(cell.map(|c| c - MAXSPREAD), cell.map(|c| c + MAXSPREAD))
    }

    /// Chunks (all heights) whose cells lie within reach of any cell of `tile`.
    pub fn chunks_near_tile(&self, tile: TileCoord) -> Vec<usize> {
        let [cx, cy] = tile_to_cell(tile);
        self.chunks_in_cell_box(
            [cx - MAXSPREAD, cy - MAXSPREAD, 0],
            [
                cx + TILE_CELLS - 1 + MAXSPREAD,
                cy + TILE_CELLS - 1 + MAXSPREAD,
                self.cells[2] as i32 - 1,
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> GridDims {
        GridDims::from_map(&MapConfig {
            tiles_x: 32,
            tiles_y: 16,
            height_cells: 32,
        })
        .unwrap()
    }

    #[test]
    fn test_dims_from_map() {
        let d = dims();
        assert_eq!(d.cells, [64, 32, 32]);
        assert_eq!(d.chunks, [4, 2, 2]);
        assert_eq!(d.chunk_count(), 16);
        assert_eq!(d.tiles(), (32, 16));
    }

    #[test]
    fn test_invalid_dims_rejected() {
        let err = GridDims::from_map(&MapConfig {
            tiles_x: 12,
            tiles_y: 16,
            height_cells: 32,
        })
        .unwrap_err();
        assert!(matches!(err, LightingError::InvalidDimensions { x: 24, .. }));
        assert!(GridDims::from_cells([16, 16, 0]).is_err());
    }

    #[test]
    fn test_chunk_index_roundtrip() {
        let d = dims();
        for i in 0..d.chunk_count() {
            assert_eq!(d.chunk_index(d.chunk_coord(i)), i);
        }
    }

    #[test]
    fn test_locate_cell() {
        let d = dims();
        let (chunk, local) = d.locate([17, 3, 31]);
        assert_eq!(d.chunk_coord(chunk), ChunkCoord::new(1, 0, 1));
        assert_eq!(local, local_index(1, 3, 15));
    }

    #[test]
    fn test_unit_conversions() {
        // Tile (3, 4) centre at height 8 (world z 64).
        let light = world_to_light(WorldPos::new(3 * 32 + 16, 4 * 32 + 16, 64));
        assert_eq!(light, [112, 144, 32]);
        assert_eq!(light_to_cell(light), [7, 9, 2]);
        assert_eq!(height_to_cell(8), 2);
        assert_eq!(height_to_cell(9), 2);
        assert_eq!(height_to_cell_ceil(9), 3);
        assert_eq!(cell_to_tile(7, 9), TileCoord::new(3, 4));
        assert_eq!(light_to_cell([-1, 0, 0]), [-1, 0, 0]);
    }

    #[test]
    fn test_chunks_in_cell_box_clamps() {
        let d = dims();
        let all = d.chunks_in_cell_box([-100, -100, -100], [1000, 1000, 1000]);
        assert_eq!(all.len(), d.chunk_count());
        assert!(d.chunks_in_cell_box([-5, 0, 0], [-1, 4, 4]).is_empty());
        assert_eq!(d.chunks_in_cell_box([15, 0, 0], [16, 0, 0]).len(), 2);
    }

    #[test]
    fn test_chunks_near_tile_cover_all_heights() {
        let d = dims();
        let near = d.chunks_near_tile(TileCoord::new(0, 0));
        // x cells -12..=13 -> chunk 0, y same -> chunk 0, z all -> 2 chunks.
        assert_eq!(near.len(), 2);
        let mid = d.chunks_near_tile(TileCoord::new(8, 4));
        // x cells 4..=29 -> chunks 0,1; y cells -4..=21 -> chunks 0,1.
        assert_eq!(mid.len(), 2 * 2 * 2);
    }
}
