//! World-query interface and a dense in-memory tile map implementing it.
//!
//! The lighting engine only ever reads the world through [`WorldQuery`].
//! [`TileMap`] is the reference implementation used by the demo and tests; it
//! records every tile it modifies so callers can forward the changes as
//! lighting invalidations once per frame.

use rustc_hash::FxHashSet;

use crate::element::{TileCoord, TileElement};

/// Errors produced by [`TileMap`] mutations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MapError {
    /// The tile lies outside the map.
    #[error("tile ({x}, {y}) is outside the {width}x{height} map")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
}

/// Read-only view of the park used by the lighting engine.
pub trait WorldQuery {
    /// Map size in tiles `(x, y)`.
    fn map_size(&self) -> (u32, u32);

    /// All elements stacked on `tile`, bottom to top.
    ///
    /// Tiles outside the map yield an empty slice.
    fn elements_at(&self, tile: TileCoord) -> &[TileElement];
}

/// Dense per-tile element storage.
pub struct TileMap {
    width: u32,
    height: u32,
    tiles: Vec<Vec<TileElement>>,
    modified: FxHashSet<TileCoord>,
}

impl TileMap {
    /// Creates an empty map of `width` x `height` tiles.
    pub fn new(width: u32, height: u32) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            tiles: vec![Vec::new(); count],
            modified: FxHashSet::default(),
        }
    }

    /// Returns `true` if `tile` lies on the map.
    pub fn contains(&self, tile: TileCoord) -> bool {
        tile.x >= 0 && tile.y >= 0 && (tile.x as u32) < self.width && (tile.y as u32) < self.height
    }

    fn index(&self, tile: TileCoord) -> Result<usize, MapError> {
        if !self.contains(tile) {
            return Err(MapError::OutOfBounds {
                x: tile.x,
                y: tile.y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(tile.y as usize * self.width as usize + tile.x as usize)
    }

    /// Appends an element to the top of a tile's stack.
    pub fn push_element(&mut self, tile: TileCoord, element: TileElement) -> Result<(), MapError> {
        let idx = self.index(tile)?;
        self.tiles[idx].push(element);
        self.modified.insert(tile);
        Ok(())
    }

    /// Removes every element on `tile` matching `pred`. Returns the number removed.
    pub fn remove_elements<F>(&mut self, tile: TileCoord, mut pred: F) -> Result<usize, MapError>
    where
        F: FnMut(&TileElement) -> bool,
    {
        let idx = self.index(tile)?;
        let stack = &mut self.tiles[idx];
        let before = stack.len();
        stack.retain(|e| !pred(e));
        let removed = before - stack.len();
        if removed > 0 {
            self.modified.insert(tile);
        }
        Ok(removed)
    }

    /// Removes every element on `tile`.
    pub fn clear_tile(&mut self, tile: TileCoord) -> Result<(), MapError> {
        let idx = self.index(tile)?;
        if !self.tiles[idx].is_empty() {
            self.tiles[idx].clear();
            self.modified.insert(tile);
        }
        Ok(())
    }

    /// Drains the set of tiles modified since the last call, in row-major order.
    pub fn take_modified(&mut self) -> Vec<TileCoord> {
        let mut tiles: Vec<TileCoord> = self.modified.drain().collect();
        tiles.sort_unstable_by_key(|t| (t.y, t.x));
        if !tiles.is_empty() {
            tracing::trace!(count = tiles.len(), "drained modified tiles");
        }
        tiles
    }

    /// Number of tiles modified since the last [`take_modified`](Self::take_modified).
    pub fn pending_modifications(&self) -> usize {
        self.modified.len()
    }
}

impl WorldQuery for TileMap {
    fn map_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn elements_at(&self, tile: TileCoord) -> &[TileElement] {
        match self.index(tile) {
            Ok(idx) => &self.tiles[idx],
            Err(_) => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
