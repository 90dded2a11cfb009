//! Lightmap chunks.
//!
//! A chunk's voxel data is split by owning thread. [`ChunkBuffers`] holds the
//! buffers both threads touch; [`ChunkState`] holds what only the main thread
//! touches (static light list and dynamic overlay).

use parklight_world::TileCoord;

use crate::coords::{CHUNK_VOLUME, ChunkCoord, GridDims};
use crate::error::LightingError;
use crate::light::{LightingLight, StaticLightEntry};
use crate::value::{AtomicLightingValue, LightingValue};

/// One chunk's worth of atomically stored light values.
pub struct VoxelBuffer {
    cells: Box<[AtomicLightingValue]>,
}

impl VoxelBuffer {
    /// A black buffer.
    pub fn new() -> Self {
        Self {
            cells: (0..CHUNK_VOLUME)
                .map(|_| AtomicLightingValue::new(LightingValue::BLACK))
                .collect(),
        }
    }

    /// Value at local index `index`.
    #[inline]
    pub fn load(&self, index: usize) -> LightingValue {
        self.cells[index].load()
    }

    /// Overwrites the value at local index `index`.
    #[inline]
    pub fn store(&self, index: usize, value: LightingValue) {
        self.cells[index].store(value);
    }

    /// Stores `value` and reports whether the cell changed.
    #[inline]
    pub fn replace(&self, index: usize, value: LightingValue) -> bool {
        self.cells[index].replace(value)
    }

    /// Saturating add into one cell.
    #[inline]
    pub fn add(&self, index: usize, value: LightingValue) {
        self.cells[index].add(value);
    }

    /// Sets every cell to `value`.
    pub fn fill(&self, value: LightingValue) {
        for cell in self.cells.iter() {
            cell.store(value);
        }
    }

    /// Copies `other` cell by cell. Not atomic as a whole.
    pub fn copy_from(&self, other: &VoxelBuffer) {
        for (dst, src) in self.cells.iter().zip(other.cells.iter()) {
            dst.store(src.load());
        }
    }

    /// Copies the buffer into `out`, which must hold a full chunk.
    pub fn snapshot_into(&self, out: &mut [LightingValue]) {
        for (dst, src) in out.iter_mut().zip(self.cells.iter()) {
            *dst = src.load();
        }
    }

    /// The buffer as a plain `Vec`, X fastest.
    pub fn snapshot(&self) -> Vec<LightingValue> {
        let mut out = vec![LightingValue::BLACK; CHUNK_VOLUME];
        self.snapshot_into(&mut out);
        out
    }
}

impl Default for VoxelBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Voxel buffers shared by the main thread and the skylight worker.
///
/// There is no per-chunk lock. The worker writes `data_skylight` and
/// `data_skylight_static` while the main thread adds static light into
/// `data_static` and `data_skylight_static`. Each cell is a single atomic, so
/// a reader never sees a torn value, but a cell may lag one update behind a
/// concurrent writer. The main thread pushes every chunk it writes back onto
/// the skylight queue, so the worker's next pass restores
/// `data_skylight_static = data_skylight + data_static`.
pub struct ChunkBuffers {
    /// Contribution of static lights only.
    pub data_static: VoxelBuffer,
    /// Propagated skylight only.
    pub data_skylight: VoxelBuffer,
    /// `data_skylight + data_static`.
    pub data_skylight_static: VoxelBuffer,
}

impl ChunkBuffers {
    /// Three black buffers.
    pub fn new() -> Self {
        Self {
            data_static: VoxelBuffer::new(),
            data_skylight: VoxelBuffer::new(),
            data_skylight_static: VoxelBuffer::new(),
        }
    }

    /// Drops every static contribution, keeping the skylight.
    pub fn reset_static(&self) {
        self.data_static.fill(LightingValue::BLACK);
        self.data_skylight_static.copy_from(&self.data_skylight);
    }

    /// Adds a static contribution to both static buffers.
    #[inline]
    pub fn add_static(&self, index: usize, value: LightingValue) {
        self.data_static.add(index, value);
        self.data_skylight_static.add(index, value);
    }
}

impl Default for ChunkBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// Main-thread state of one chunk.
pub struct ChunkState {
    /// Position in chunk space.
    pub coord: ChunkCoord,
    /// Static lights whose reach overlaps this chunk.
    pub static_lights: Vec<StaticLightEntry>,
    /// Dynamic overlay; allocated on first use and valid only while `has_dynamic` is set.
    pub data_dynamic: Vec<LightingValue>,
    pub has_dynamic: bool,
}

impl ChunkState {
    fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            static_lights: Vec::new(),
            data_dynamic: Vec::new(),
            has_dynamic: false,
        }
    }

    /// Removes every light owned by `tile`. Returns the number removed.
    pub fn remove_lights_from(&mut self, tile: TileCoord) -> usize {
        let before = self.static_lights.len();
        self.static_lights
            .retain(|entry| entry.light.origin != Some(tile));
        before - self.static_lights.len()
    }

    /// Marks every light as needing to be drawn again.
    pub fn undraw_lights(&mut self) {
        for entry in &mut self.static_lights {
            entry.drawn = false;
        }
    }
}

/// Main-thread chunk states for the whole grid.
pub struct ChunkStore {
    dims: GridDims,
    states: Vec<ChunkState>,
    light_capacity: usize,
}

impl ChunkStore {
    /// Creates a state per chunk, each holding at most `light_capacity` static lights.
    pub fn new(dims: GridDims, light_capacity: usize) -> Self {
        let states = (0..dims.chunk_count())
            .map(|i| ChunkState::new(dims.chunk_coord(i)))
            .collect();
        Self {
            dims,
            states,
            light_capacity,
        }
    }

    pub fn get(&self, index: usize) -> &ChunkState {
        &self.states[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut ChunkState {
        &mut self.states[index]
    }

    /// Registers `light` with every chunk it can reach and returns their indices.
    ///
    /// Either every chunk accepts the light or none does: if any chunk in
    /// reach is full, nothing is inserted and
    /// [`LightingError::CapacityExceeded`] names the first full chunk.
    pub fn insert_static_light(&mut self, light: LightingLight) -> Result<Vec<usize>, LightingError> {
        let chunks = self.dims.chunks_in_reach(light.cell());
        if let Some(&full) = chunks
            .iter()
            .find(|&&i| self.states[i].static_lights.len() >= self.light_capacity)
        {
            return Err(LightingError::CapacityExceeded {
                chunk: self.states[full].coord,
                capacity: self.light_capacity,
            });
        }
        for &i in &chunks {
            self.states[i].static_lights.push(StaticLightEntry::new(light));
        }
        Ok(chunks)
    }

    /// Drops every static light from every chunk.
    pub fn clear_static_lights(&mut self) {
        for state in &mut self.states {
            state.static_lights.clear();
        }
    }

    /// Total static light entries over all chunks.
    pub fn static_light_entries(&self) -> usize {
        self.states.iter().map(|s| s.static_lights.len()).sum()
    }
}
