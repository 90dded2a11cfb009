//! Occlusion ("affector") grids, the dirty-column mask, and the builder that
//! derives affectors from world geometry.
//!
//! Each axis has its own grid of face transmissions sized one larger than the
//! cell grid. The X entry at `(x, y, z)` is the face between cells
//! `(x - 1, y, z)` and `(x, y, z)`; Y and Z follow the same rule. A step from
//! cell `u` to a neighbouring cell `c` therefore crosses the face at
//! `max(u, c)` along the step axis.
//!
//! A face takes the most opaque value of whatever occupies the two cells it
//! separates, so an element changes the same face regardless of which of the
//! two columns is rebuilt.

use parklight_world::{Direction, ElementKind, GLASS_WALL_TYPE, TileCoord, TileElement, WorldQuery};
use rustc_hash::FxHashMap;

use crate::coords::{
    GridDims, TILE_CELLS, cell_to_tile, height_to_cell, height_to_cell_ceil, tile_to_cell,
};
use crate::grid::Grid3D;
use crate::value::{AtomicLightingValue, LightingValue};

/// Scenery taller than this many height units lets some light through.
pub const TALL_SCENERY_SPAN: u8 = 32;

/// Height units at the top of a track piece that do not dim side light.
pub const TRACK_TOP_CLEARANCE: u8 = 4;

/// Side transmission of tall scenery (trees).
pub const TREE_SIDE_TINT: LightingValue = LightingValue::new(150, 165, 150);

/// Vertical transmission of tall scenery (trees).
pub const TREE_VERTICAL_TINT: LightingValue = LightingValue::new(110, 130, 110);

/// Side transmission of track pieces.
pub const TRACK_SIDE_TINT: LightingValue = LightingValue::new(190, 190, 190);

/// All four direction bits.
pub const ALL_DIRECTIONS: u8 = 0x0F;

/// Transmission of coloured glass walls, indexed by wall colour.
pub static GLASS_TINTS: [LightingValue; 100] = build_glass_tints();

/// A hue wheel in 100 steps at moderate saturation.
const fn build_glass_tints() -> [LightingValue; 100] {
    const LO: u32 = 92;
    const HI: u32 = 230;
    let mut table = [LightingValue::BLACK; 100];
    let mut i = 0;
    while i < 100 {
        let h = i as u32 * 6 * 256 / 100;
        let f = h % 256;
        let rising = (LO + (HI - LO) * f / 256) as u8;
        let falling = (HI - (HI - LO) * f / 256) as u8;
        let (lo, hi) = (LO as u8, HI as u8);
        table[i] = match h / 256 {
            0 => LightingValue::new(hi, rising, lo),
            1 => LightingValue::new(falling, hi, lo),
            2 => LightingValue::new(lo, hi, rising),
            3 => LightingValue::new(lo, falling, hi),
            4 => LightingValue::new(rising, lo, hi),
            _ => LightingValue::new(hi, lo, falling),
        };
        i += 1;
    }
    table
}

/// Transmission of a glass wall of the given colour. Out-of-range colours
/// use the last table entry.
pub fn glass_tint(colour: u8) -> LightingValue {
    GLASS_TINTS[(colour as usize).min(GLASS_TINTS.len() - 1)]
}

/// Grid axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

// ---------------------------------------------------------------------------
// Affector grids
// ---------------------------------------------------------------------------

/// Per-axis face transmission grids shared between threads.
pub struct AffectorGrids {
    grids: [Grid3D<AtomicLightingValue>; 3],
    cells: [usize; 3],
}

impl AffectorGrids {
    /// Allocates fully transmissive grids for `dims`.
    pub fn new(dims: &GridDims) -> Self {
        let size = dims.cells.map(|c| c + 1);
        let lit = || Grid3D::from_fn(size, |_, _, _| AtomicLightingValue::new(LightingValue::LIT));
        Self {
            grids: [lit(), lit(), lit()],
            cells: dims.cells,
        }
    }

    /// Transmission of the `axis` face at `(x, y, z)`.
    #[inline]
    pub fn get(&self, axis: Axis, x: usize, y: usize, z: usize) -> LightingValue {
        self.grids[axis as usize].at(x, y, z).load()
    }

    #[inline]
    pub fn set(&self, axis: Axis, x: usize, y: usize, z: usize, value: LightingValue) {
        self.grids[axis as usize].at(x, y, z).store(value);
    }

    /// Transmission of the face crossed when stepping from `from` to the
    /// adjacent cell `to` along `axis`. At least one of the two cells must be
    /// inside the grid.
    #[inline]
    pub fn crossing(&self, axis: Axis, from: [i32; 3], to: [i32; 3]) -> LightingValue {
        let a = axis as usize;
        let mut face = to;
        face[a] = from[a].max(to[a]);
        self.get(axis, face[0] as usize, face[1] as usize, face[2] as usize)
    }

    /// Resets every face to fully transmissive.
    pub fn reset_all(&self) {
        for grid in &self.grids {
            for cell in grid.as_slice() {
                cell.store(LightingValue::LIT);
            }
        }
    }

    /// Resets the faces owned by a tile's columns, including its four edges.
    pub fn reset_tile(&self, tile: TileCoord) {
        let [cx, cy] = tile_to_cell(tile);
        let (cx, cy) = (cx as usize, cy as usize);
        let n = TILE_CELLS as usize;
        let zs = self.cells[2];
        for z in 0..=zs {
            for y in cy..cy + n {
                for x in cx..=cx + n {
                    self.set(Axis::X, x, y, z, LightingValue::LIT);
                }
                for x in cx..cx + n {
                    self.set(Axis::Z, x, y, z, LightingValue::LIT);
                }
            }
            for y in cy..=cy + n {
                for x in cx..cx + n {
                    self.set(Axis::Y, x, y, z, LightingValue::LIT);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dirty column mask
// ---------------------------------------------------------------------------

/// One byte per cell column; the low 4 bits flag which side faces
/// ([`Direction::bit`]) need rebuilding. Z faces are rebuilt whenever any bit is set.
pub struct DirtyColumns {
    width: usize,
    height: usize,
    mask: Vec<u8>,
    queue: Vec<usize>,
}

impl DirtyColumns {
    pub fn new(dims: &GridDims) -> Self {
        Self {
            width: dims.cells[0],
            height: dims.cells[1],
            mask: vec![0; dims.column_count()],
            queue: Vec::new(),
        }
    }

    /// Flags `bits` on column `(cx, cy)`. Columns outside the grid are ignored.
    pub fn mark(&mut self, cx: i32, cy: i32, bits: u8) {
        let bits = bits & ALL_DIRECTIONS;
        if bits == 0 || cx < 0 || cy < 0 || cx as usize >= self.width || cy as usize >= self.height {
            return;
        }
        let idx = cy as usize * self.width + cx as usize;
        if self.mask[idx] == 0 {
            self.queue.push(idx);
        }
        self.mask[idx] |= bits;
    }

    /// Flags every face of every column.
    pub fn mark_all(&mut self) {
        self.queue.clear();
        self.queue.extend(0..self.mask.len());
        self.mask.fill(ALL_DIRECTIONS);
    }

    /// Flags a tile's own columns fully and the facing edge columns of its
    /// four neighbours with the bit pointing back at the tile.
    pub fn mark_tile(&mut self, tile: TileCoord) {
        let [cx, cy] = tile_to_cell(tile);
        for dy in 0..TILE_CELLS {
            for dx in 0..TILE_CELLS {
                self.mark(cx + dx, cy + dy, ALL_DIRECTIONS);
            }
        }
        for i in 0..TILE_CELLS {
            self.mark(cx - 1, cy + i, Direction::PosX.bit());
            self.mark(cx + TILE_CELLS, cy + i, Direction::NegX.bit());
            self.mark(cx + i, cy - 1, Direction::PosY.bit());
            self.mark(cx + i, cy + TILE_CELLS, Direction::NegY.bit());
        }
    }

    /// Current bits of a column.
    pub fn bits(&self, cx: usize, cy: usize) -> u8 {
        self.mask[cy * self.width + cx]
    }

    /// Number of columns waiting for a rebuild.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Takes every dirty column as `(cx, cy, bits)` and clears the mask.
    pub fn drain(&mut self) -> Vec<(usize, usize, u8)> {
        let queue = std::mem::take(&mut self.queue);
        queue
            .into_iter()
            .map(|idx| {
                let bits = std::mem::take(&mut self.mask[idx]);
                (idx % self.width, idx / self.width, bits)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Occlusion contributed by the elements of one tile, per cell layer.
struct ColumnProfile {
    /// Crossing a side face of the cell.
    side: Vec<LightingValue>,
    /// Crossing the top or bottom face of the cell.
    vertical: Vec<LightingValue>,
    /// Extra occlusion on the Z face at each index (path floors).
    floor: Vec<LightingValue>,
    /// Walls on each tile edge, indexed by [`Direction`].
    walls: [Vec<LightingValue>; 4],
}

impl ColumnProfile {
    fn build(elements: &[TileElement], layers: usize) -> Self {
        let lit = vec![LightingValue::LIT; layers];
        let mut profile = Self {
            side: lit.clone(),
            vertical: lit.clone(),
            floor: vec![LightingValue::LIT; layers + 1],
            walls: [lit.clone(), lit.clone(), lit.clone(), lit],
        };
        let clamp = |z: i32| z.clamp(0, layers as i32) as usize;

        for element in elements {
            let z0 = height_to_cell(element.base_height);
            let z1 = height_to_cell_ceil(element.clearance_height).max(z0 + 1);
            let extent = clamp(z0)..clamp(z1);
            match element.kind {
                ElementKind::Surface => {
                    for z in 0..clamp(z0) {
                        profile.side[z] = LightingValue::BLACK;
                        profile.vertical[z] = LightingValue::BLACK;
                    }
                }
                ElementKind::Path { .. } => {
                    if let Some(f) = profile.floor.get_mut(z0.max(0) as usize) {
                        *f = LightingValue::BLACK;
                    }
                }
                ElementKind::Scenery => {
                    let (side, vertical) = if element.span() > TALL_SCENERY_SPAN {
                        (TREE_SIDE_TINT, TREE_VERTICAL_TINT)
                    } else {
                        (LightingValue::BLACK, LightingValue::BLACK)
                    };
                    for z in extent {
                        profile.side[z] = profile.side[z].min(side);
                        profile.vertical[z] = profile.vertical[z].min(vertical);
                    }
                }
                ElementKind::Entrance => {
                    for z in extent {
                        profile.side[z] = LightingValue::BLACK;
                        profile.vertical[z] = LightingValue::BLACK;
                    }
                }
                ElementKind::Track { occludes_sides } => {
                    if !occludes_sides {
                        continue;
                    }
                    let top = element.clearance_height.saturating_sub(TRACK_TOP_CLEARANCE);
                    for z in clamp(z0)..clamp(height_to_cell_ceil(top)) {
                        profile.side[z] = profile.side[z].min(TRACK_SIDE_TINT);
                    }
                }
                ElementKind::Wall {
                    direction,
                    wall_type,
                    colour,
                } => {
                    let tint = if wall_type == GLASS_WALL_TYPE {
                        glass_tint(colour)
                    } else {
                        LightingValue::BLACK
                    };
                    let edge = &mut profile.walls[direction as usize];
                    for z in extent {
                        edge[z] = edge[z].min(tint);
                    }
                }
            }
        }
        profile
    }
}

/// Rebuilds affectors for dirty columns from the world.
///
/// Tile profiles are cached for the lifetime of the builder, so create one
/// per rebuild pass.
pub struct AffectorBuilder<'w, W: WorldQuery + ?Sized> {
    world: &'w W,
    dims: GridDims,
    profiles: FxHashMap<TileCoord, ColumnProfile>,
}

impl<'w, W: WorldQuery + ?Sized> AffectorBuilder<'w, W> {
    pub fn new(world: &'w W, dims: GridDims) -> Self {
        Self {
            world,
            dims,
            profiles: FxHashMap::default(),
        }
    }

    /// Rebuilds every dirty column and clears the mask. Returns the rebuilt
    /// columns.
    pub fn rebuild_dirty(
        &mut self,
        affectors: &AffectorGrids,
        dirty: &mut DirtyColumns,
    ) -> Vec<(usize, usize)> {
        dirty
            .drain()
            .into_iter()
            .filter(|&(_, _, bits)| bits != 0)
            .map(|(cx, cy, bits)| {
                self.rebuild_column(affectors, cx, cy, bits);
                (cx, cy)
            })
            .collect()
    }

    /// Rewrites the faces of column `(cx, cy)` selected by `mask`, plus all of
    /// its Z faces. A zero mask does nothing.
    pub fn rebuild_column(&mut self, affectors: &AffectorGrids, cx: usize, cy: usize, mask: u8) {
        if mask == 0 {
            return;
        }
        let (x, y) = (cx as i32, cy as i32);
        if mask & Direction::NegX.bit() != 0 {
            self.write_side_face(affectors, Axis::X, [x - 1, y], [x, y]);
        }
        if mask & Direction::PosX.bit() != 0 {
            self.write_side_face(affectors, Axis::X, [x, y], [x + 1, y]);
        }
        if mask & Direction::NegY.bit() != 0 {
            self.write_side_face(affectors, Axis::Y, [x, y - 1], [x, y]);
        }
        if mask & Direction::PosY.bit() != 0 {
            self.write_side_face(affectors, Axis::Y, [x, y], [x, y + 1]);
        }
        self.write_vertical_faces(affectors, cx, cy);
    }

    fn profile(&mut self, tile: TileCoord) -> Option<&ColumnProfile> {
        if !self.dims.contains_tile(tile) {
            return None;
        }
        let layers = self.dims.cells[2];
        let world = self.world;
        Some(
            self.profiles
                .entry(tile)
                .or_insert_with(|| ColumnProfile::build(world.elements_at(tile), layers)),
        )
    }

    /// Writes the side face between columns `low` and `high`, adjacent along `axis`.
    fn write_side_face(&mut self, affectors: &AffectorGrids, axis: Axis, low: [i32; 2], high: [i32; 2]) {
        let low_tile = cell_to_tile(low[0], low[1]);
        let high_tile = cell_to_tile(high[0], high[1]);
        let (toward_high, toward_low) = match axis {
            Axis::X => (Direction::PosX, Direction::NegX),
            _ => (Direction::PosY, Direction::NegY),
        };
        let tile_edge = low_tile != high_tile;
        // Populate the cache before borrowing both profiles.
        self.profile(low_tile);
        self.profile(high_tile);
        let lo = self.profiles.get(&low_tile);
        let hi = self.profiles.get(&high_tile);

        let face = [high[0] as usize, high[1] as usize];
        for z in 0..self.dims.cells[2] {
            let mut v = LightingValue::LIT;
            if let Some(p) = lo {
                v = v.min(p.side[z]);
                if tile_edge {
                    v = v.min(p.walls[toward_high as usize][z]);
                }
            }
            if let Some(p) = hi {
                v = v.min(p.side[z]);
                if tile_edge {
                    v = v.min(p.walls[toward_low as usize][z]);
                }
            }
            affectors.set(axis, face[0], face[1], z, v);
        }
    }

    fn write_vertical_faces(&mut self, affectors: &AffectorGrids, cx: usize, cy: usize) {
        let layers = self.dims.cells[2];
        let tile = cell_to_tile(cx as i32, cy as i32);
        let Some(p) = self.profile(tile) else {
            return;
        };
        for fz in 0..=layers {
            let below = if fz > 0 { p.vertical[fz - 1] } else { LightingValue::LIT };
            let above = if fz < layers { p.vertical[fz] } else { LightingValue::LIT };
            affectors.set(Axis::Z, cx, cy, fz, below.min(above).min(p.floor[fz]));
        }
    }
}

#[cfg(test)]
mod tests {
    use parklight_config::MapConfig;
    use parklight_world::TileMap;

    use super::*;

    fn dims() -> GridDims {
        GridDims::from_map(&MapConfig {
            tiles_x: 16,
            tiles_y: 16,
            height_cells: 16,
        })
        .unwrap()
    }

    fn rebuild_all(map: &TileMap, affectors: &AffectorGrids, dirty: &mut DirtyColumns) {
        AffectorBuilder::new(map, dims()).rebuild_dirty(affectors, dirty);
    }

    #[test]
    fn test_glass_table_is_translucent() {
        for tint in GLASS_TINTS {
            assert!(tint.total() > 0);
            assert_ne!(tint, LightingValue::LIT);
        }
        assert_eq!(glass_tint(250), GLASS_TINTS[99]);
    }

    #[test]
    fn test_dirty_mark_and_drain() {
        let d = dims();
        let mut dirty = DirtyColumns::new(&d);
        dirty.mark(3, 4, Direction::PosX.bit());
        dirty.mark(3, 4, Direction::NegY.bit());
        dirty.mark(-1, 0, ALL_DIRECTIONS);
        dirty.mark(100, 0, ALL_DIRECTIONS);
        assert_eq!(dirty.pending(), 1);
        assert_eq!(dirty.bits(3, 4), Direction::PosX.bit() | Direction::NegY.bit());

        let drained = dirty.drain();
        assert_eq!(drained, vec![(3, 4, Direction::PosX.bit() | Direction::NegY.bit())]);
        assert_eq!(dirty.bits(3, 4), 0);
        assert_eq!(dirty.pending(), 0);
    }

    #[test]
    fn test_mark_tile_tags_neighbours_toward_tile() {
        let mut dirty = DirtyColumns::new(&dims());
        dirty.mark_tile(TileCoord::new(2, 2));
        assert_eq!(dirty.bits(4, 4), ALL_DIRECTIONS);
        assert_eq!(dirty.bits(5, 5), ALL_DIRECTIONS);
        assert_eq!(dirty.bits(3, 4), Direction::PosX.bit());
        assert_eq!(dirty.bits(6, 5), Direction::NegX.bit());
        assert_eq!(dirty.bits(4, 3), Direction::PosY.bit());
        assert_eq!(dirty.bits(5, 6), Direction::NegY.bit());
        assert_eq!(dirty.pending(), 4 + 8);
    }

    #[test]
    fn test_surface_blocks_below_ground() {
        let d = dims();
        let mut map = TileMap::new(16, 16);
        map.push_element(TileCoord::new(1, 1), TileElement::surface(8))
            .unwrap();
        let affectors = AffectorGrids::new(&d);
        let mut dirty = DirtyColumns::new(&d);
        dirty.mark_tile(TileCoord::new(1, 1));
        rebuild_all(&map, &affectors, &mut dirty);

        // Ground fills cells 0 and 1; the face on top of cell 1 is closed.
        assert_eq!(affectors.get(Axis::Z, 2, 2, 2), LightingValue::BLACK);
        assert_eq!(affectors.get(Axis::Z, 2, 2, 3), LightingValue::LIT);
        assert_eq!(affectors.get(Axis::X, 2, 2, 1), LightingValue::BLACK);
        assert_eq!(affectors.get(Axis::X, 2, 2, 2), LightingValue::LIT);
        // The +X edge touches the open neighbour but is still ground on our side.
        assert_eq!(affectors.get(Axis::X, 4, 2, 0), LightingValue::BLACK);
    }

    #[test]
    fn test_wall_closes_one_shared_face() {
        let d = dims();
        let tile = TileCoord::new(3, 3);
        let mut map = TileMap::new(16, 16);
        map.push_element(tile, TileElement::wall(8, 16, Direction::PosX))
            .unwrap();

        let affectors = AffectorGrids::new(&d);
        let mut dirty = DirtyColumns::new(&d);
        dirty.mark_tile(tile);
        rebuild_all(&map, &affectors, &mut dirty);

        // Tile 3 spans cells 6..8; its +X edge is the X face at 8, layers 2..4.
        for y in 6..8 {
            assert_eq!(affectors.get(Axis::X, 8, y, 2), LightingValue::BLACK);
            assert_eq!(affectors.get(Axis::X, 8, y, 3), LightingValue::BLACK);
            assert_eq!(affectors.get(Axis::X, 8, y, 4), LightingValue::LIT);
            assert_eq!(affectors.get(Axis::X, 6, y, 2), LightingValue::LIT);
            assert_eq!(affectors.get(Axis::X, 7, y, 2), LightingValue::LIT);
        }

        // Rebuilding only the neighbour's facing edge yields the same face.
        affectors.reset_all();
        let mut builder = AffectorBuilder::new(&map, d);
        builder.rebuild_column(&affectors, 8, 6, Direction::NegX.bit());
        assert_eq!(affectors.get(Axis::X, 8, 6, 2), LightingValue::BLACK);
    }

    #[test]
    fn test_wall_ignored_without_direction_bit() {
        let d = dims();
        let tile = TileCoord::new(3, 3);
        let mut map = TileMap::new(16, 16);
        map.push_element(tile, TileElement::wall(8, 16, Direction::PosX))
            .unwrap();
        let affectors = AffectorGrids::new(&d);
        let mut builder = AffectorBuilder::new(&map, d);
        builder.rebuild_column(&affectors, 7, 6, Direction::NegX.bit() | Direction::PosY.bit());
        assert_eq!(affectors.get(Axis::X, 8, 6, 2), LightingValue::LIT);
    }

    #[test]
    fn test_glass_wall_tints() {
        let d = dims();
        let tile = TileCoord::new(3, 3);
        let mut map = TileMap::new(16, 16);
        map.push_element(tile, TileElement::glass_wall(8, 12, Direction::NegY, 10))
            .unwrap();
        let affectors = AffectorGrids::new(&d);
        let mut dirty = DirtyColumns::new(&d);
        dirty.mark_tile(tile);
        rebuild_all(&map, &affectors, &mut dirty);
        assert_eq!(affectors.get(Axis::Y, 6, 6, 2), glass_tint(10));
    }

    #[test]
    fn test_tall_scenery_tints_and_path_floor() {
        let d = dims();
        let tile = TileCoord::new(5, 5);
        let mut map = TileMap::new(16, 16);
        map.push_element(tile, TileElement::scenery(0, 40)).unwrap();
        map.push_element(TileCoord::new(6, 5), TileElement::path(8, 0, false))
            .unwrap();
        let affectors = AffectorGrids::new(&d);
        let mut dirty = DirtyColumns::new(&d);
        dirty.mark_tile(tile);
        dirty.mark_tile(TileCoord::new(6, 5));
        rebuild_all(&map, &affectors, &mut dirty);

        assert_eq!(affectors.get(Axis::X, 11, 10, 3), TREE_SIDE_TINT);
        assert_eq!(affectors.get(Axis::Z, 10, 10, 5), TREE_VERTICAL_TINT);
        // Path floor at layer 2 of tile (6, 5).
        assert_eq!(affectors.get(Axis::Z, 12, 10, 2), LightingValue::BLACK);
        assert_eq!(affectors.get(Axis::X, 13, 10, 2), LightingValue::LIT);
    }

    #[test]
    fn test_track_dims_sides_below_top() {
        let d = dims();
        let tile = TileCoord::new(2, 2);
        let mut map = TileMap::new(16, 16);
        map.push_element(tile, TileElement::track(8, 20, true)).unwrap();
        let affectors = AffectorGrids::new(&d);
        let mut dirty = DirtyColumns::new(&d);
        dirty.mark_tile(tile);
        rebuild_all(&map, &affectors, &mut dirty);
        // Track covers layers 2..4 on the sides; the top unit layer 4 stays open.
        assert_eq!(affectors.get(Axis::X, 5, 4, 2), TRACK_SIDE_TINT);
        assert_eq!(affectors.get(Axis::X, 5, 4, 3), TRACK_SIDE_TINT);
        assert_eq!(affectors.get(Axis::X, 5, 4, 4), LightingValue::LIT);
        assert_eq!(affectors.get(Axis::Z, 4, 4, 3), LightingValue::LIT);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let d = dims();
        let tile = TileCoord::new(4, 4);
        let mut map = TileMap::new(16, 16);
        map.push_element(tile, TileElement::surface(4)).unwrap();
        map.push_element(tile, TileElement::wall(4, 12, Direction::NegX))
            .unwrap();
        let affectors = AffectorGrids::new(&d);
        let mut dirty = DirtyColumns::new(&d);
        dirty.mark_tile(tile);
        rebuild_all(&map, &affectors, &mut dirty);
        let snapshot: Vec<_> = (0..=16)
            .map(|z| affectors.get(Axis::X, 8, 8, z))
            .collect();

        // A clean column is a no-op; a re-marked one converges to the same faces.
        rebuild_all(&map, &affectors, &mut dirty);
        dirty.mark_tile(tile);
        rebuild_all(&map, &affectors, &mut dirty);
        let again: Vec<_> = (0..=16)
            .map(|z| affectors.get(Axis::X, 8, 8, z))
            .collect();
        assert_eq!(snapshot, again);
    }

    #[test]
    fn test_reset_tile_reopens_faces() {
        let d = dims();
        let affectors = AffectorGrids::new(&d);
        affectors.set(Axis::X, 4, 2, 0, LightingValue::BLACK);
        affectors.set(Axis::Y, 2, 4, 0, LightingValue::BLACK);
        affectors.set(Axis::Z, 3, 3, 16, LightingValue::BLACK);
        affectors.set(Axis::X, 5, 2, 0, LightingValue::BLACK);
        affectors.reset_tile(TileCoord::new(1, 1));
        assert_eq!(affectors.get(Axis::X, 4, 2, 0), LightingValue::LIT);
        assert_eq!(affectors.get(Axis::Y, 2, 4, 0), LightingValue::LIT);
        assert_eq!(affectors.get(Axis::Z, 3, 3, 16), LightingValue::LIT);
        // Outside the tile.
        assert_eq!(affectors.get(Axis::X, 5, 2, 0), LightingValue::BLACK);
    }

    #[test]
    fn test_crossing_uses_shared_face() {
        let d = dims();
        let affectors = AffectorGrids::new(&d);
        affectors.set(Axis::Y, 3, 5, 2, LightingValue::BLACK);
        assert_eq!(affectors.crossing(Axis::Y, [3, 4, 2], [3, 5, 2]), LightingValue::BLACK);
        assert_eq!(affectors.crossing(Axis::Y, [3, 5, 2], [3, 4, 2]), LightingValue::BLACK);
        assert_eq!(affectors.crossing(Axis::Y, [3, 5, 2], [3, 6, 2]), LightingValue::LIT);
    }
}
