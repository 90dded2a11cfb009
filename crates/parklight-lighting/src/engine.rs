//! The lighting engine: owns every grid and queue and drives one frame at a time.

use std::sync::Arc;
use std::time::Duration;

use parklight_config::{LightingConfig, MapConfig};
use parklight_world::{Direction, MovingEntity, TileCoord, WorldQuery};
use rustc_hash::FxHashMap;

use crate::affector::{AffectorBuilder, Axis, DirtyColumns};
use crate::chunk::ChunkStore;
use crate::coords::{ChunkCoord, GridDims};
use crate::dynamic::DynamicOverlay;
use crate::error::LightingError;
use crate::expansion::{ExpansionMap, LightExpander};
use crate::light::{LightingLight, lamp_lights};
use crate::queue_set::QueueSet;
use crate::shared::LightingShared;
use crate::skylight::{SkylightPropagator, StepOutcome};
use crate::value::LightingValue;
use crate::worker::SkylightWorker;

/// Voxel data of one chunk, ready for texture upload.
#[derive(Clone, Debug)]
pub struct ChunkUpload {
    /// Chunk-space position of the texture block.
    pub coord: ChunkCoord,
    /// `CHUNK_VOLUME` values, X fastest.
    pub data: Vec<LightingValue>,
}

impl ChunkUpload {
    /// The voxels as tightly packed RGB8 texels.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

/// Chunks handed to the renderer by one [`LightingEngine::update`].
///
/// Never longer than `max_chunk_updates_per_frame`; the end of the list is the
/// end of the frame's work.
#[derive(Clone, Debug, Default)]
pub struct UpdateBatch {
    chunks: Vec<ChunkUpload>,
}

impl UpdateBatch {
    /// Number of chunk uploads in the batch.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// `true` when nothing needs uploading this frame.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Uploads in the order they were queued.
    pub fn iter(&self) -> std::slice::Iter<'_, ChunkUpload> {
        self.chunks.iter()
    }
}

impl IntoIterator for UpdateBatch {
    type Item = ChunkUpload;
    type IntoIter = std::vec::IntoIter<ChunkUpload>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter()
    }
}

impl<'a> IntoIterator for &'a UpdateBatch {
    type Item = &'a ChunkUpload;
    type IntoIter = std::slice::Iter<'a, ChunkUpload>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

/// Queue lengths and counters for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightingStats {
    pub dirty_columns: usize,
    pub outdated_static: usize,
    pub outdated_skylight: usize,
    pub outdated_gpu: usize,
    pub dynamic_chunks: usize,
    pub static_lights: usize,
}

/// Buffers that [`LightingEngine::read_buffer`] can inspect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellBuffer {
    Static,
    Skylight,
    SkylightStatic,
    /// The dynamic overlay, or `SkylightStatic` when the chunk has none this frame.
    Effective,
}

/// Volumetric lighting over the whole map.
///
/// Construction allocates every grid and starts the skylight worker (unless
/// it is disabled in [`LightingConfig`]). Dropping the engine joins the worker
/// before any buffer is freed.
pub struct LightingEngine {
    shared: Arc<LightingShared>,
    store: ChunkStore,
    outdated_static: QueueSet<usize>,
    dirty: DirtyColumns,
    overlay: DynamicOverlay,
    expander: LightExpander,
    max_chunk_updates: usize,
    max_static_updates: usize,
    skylight_steps: usize,
    worker: Option<SkylightWorker>,
    inline: Option<SkylightPropagator>,
}

impl LightingEngine {
    /// Allocates the grids for `map` and starts skylight propagation.
    ///
    /// Fails if the map does not divide into whole chunks or the worker
    /// thread cannot be spawned. Every column starts dirty, so the first
    /// update builds all affectors.
    pub fn new(lighting: &LightingConfig, map: &MapConfig) -> Result<Self, LightingError> {
        let dims = GridDims::from_map(map)?;
        let shared = Arc::new(LightingShared::new(
            dims,
            LightingValue::from_array(lighting.ambient_sky),
            lighting.skylight_direction,
        ));
        let mut dirty = DirtyColumns::new(&dims);
        dirty.mark_all();

        let (worker, inline) = if lighting.skylight_worker {
            let sleep = Duration::from_micros(lighting.worker_sleep_us);
            (Some(SkylightWorker::spawn(Arc::clone(&shared), sleep)?), None)
        } else {
            (None, Some(SkylightPropagator::new(&shared)))
        };

        tracing::debug!(
            cells = ?dims.cells,
            chunks = dims.chunk_count(),
            worker = lighting.skylight_worker,
            "lighting engine initialised"
        );

        Ok(Self {
            store: ChunkStore::new(dims, lighting.max_lights_per_chunk),
            outdated_static: QueueSet::new(),
            dirty,
            overlay: DynamicOverlay::new(),
            expander: LightExpander::new(),
            max_chunk_updates: lighting.max_chunk_updates_per_frame,
            max_static_updates: lighting.max_static_updates_per_frame,
            skylight_steps: lighting.skylight_steps_per_update,
            worker,
            inline,
            shared,
        })
    }

    /// Cell and chunk extents of the lightmap.
    pub fn dims(&self) -> &GridDims {
        &self.shared.dims
    }

    /// Flags every column for an affector rebuild on the next update.
    pub fn reset(&mut self) {
        self.dirty.mark_all();
    }

    /// Notifies the engine that the contents of `tile` changed.
    ///
    /// Drops the tile's lamps and every static contribution in reach, inserts
    /// the lamps the tile carries now, and schedules the tile's affectors for
    /// a rebuild. Calling it again for an unchanged tile converges to the same
    /// state.
    ///
    /// A lamp that would overflow a chunk's light list is skipped; the first
    /// such failure is returned after the rest of the tile was processed.
    pub fn invalidate_at<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        tile: TileCoord,
    ) -> Result<(), LightingError> {
        let dims = self.shared.dims;
        if !dims.contains_tile(tile) {
            return Ok(());
        }

        for chunk in dims.chunks_near_tile(tile) {
            let state = self.store.get_mut(chunk);
            state.remove_lights_from(tile);
            state.undraw_lights();
            self.shared.chunks[chunk].reset_static();
            self.outdated_static.push(chunk);
            self.shared.push_gpu(chunk);
        }

        let mut first_err = None;
        for light in lamp_lights(tile, world.elements_at(tile)) {
            if let Err(err) = self.insert_static_light(light) {
                tracing::warn!(x = tile.x, y = tile.y, %err, "dropped static light");
                first_err.get_or_insert(err);
            }
        }

        self.shared.affectors.reset_tile(tile);
        self.dirty.mark_tile(tile);

        first_err.map_or(Ok(()), Err)
    }

    /// [`invalidate_at`](Self::invalidate_at) for `tile` and its four neighbours.
    pub fn invalidate_around<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        tile: TileCoord,
    ) -> Result<(), LightingError> {
        let mut first_err = self.invalidate_at(world, tile).err();
        for direction in Direction::ALL {
            if let Err(err) = self.invalidate_at(world, tile.neighbor(direction)) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Rebuilds all lighting state from `world`, e.g. after loading a park.
    ///
    /// Equivalent to invalidating every tile, done in one sweep.
    pub fn invalidate_all<W: WorldQuery + ?Sized>(&mut self, world: &W) -> Result<(), LightingError> {
        let dims = self.shared.dims;
        self.store.clear_static_lights();
        for buffers in &self.shared.chunks {
            buffers.reset_static();
        }
        self.shared.affectors.reset_all();
        self.dirty.mark_all();

        let (map_w, map_h) = world.map_size();
        let (grid_w, grid_h) = dims.tiles();
        let mut first_err = None;
        let mut dropped = 0usize;
        for y in 0..map_h.min(grid_h) as i32 {
            for x in 0..map_w.min(grid_w) as i32 {
                let tile = TileCoord::new(x, y);
                for light in lamp_lights(tile, world.elements_at(tile)) {
                    if let Err(err) = self.insert_static_light(light) {
                        dropped += 1;
                        first_err.get_or_insert(err);
                    }
                }
            }
        }
        if dropped > 0 {
            tracing::warn!(dropped, "static lights dropped during full invalidation");
        }

        for chunk in 0..dims.chunk_count() {
            self.outdated_static.push(chunk);
        }
        self.shared.push_gpu_many(0..dims.chunk_count());
        tracing::debug!(lights = self.store.static_light_entries(), "invalidated whole map");

        first_err.map_or(Ok(()), Err)
    }

    fn insert_static_light(&mut self, light: LightingLight) -> Result<(), LightingError> {
        for chunk in self.store.insert_static_light(light)? {
            self.outdated_static.push(chunk);
        }
        Ok(())
    }

    /// Advances lighting by one frame and returns the chunks to re-upload.
    pub fn update<W: WorldQuery + ?Sized>(
        &mut self,
        world: &W,
        entities: &[MovingEntity],
    ) -> UpdateBatch {
        let shared = Arc::clone(&self.shared);
        let dims = shared.dims;

        // Affectors.
        if self.dirty.pending() > 0 {
            let columns =
                AffectorBuilder::new(world, dims).rebuild_dirty(&shared.affectors, &mut self.dirty);
            let top = dims.cells[2] as i32 - 1;
            for (cx, cy) in &columns {
                let (cx, cy) = (*cx as i32, *cy as i32);
                shared.push_skylight_many(dims.chunks_in_cell_box([cx, cy, 0], [cx, cy, top]));
            }
            shared.request_skylight_pass();
            self.wake_worker();
        }

        self.overlay.begin_frame(&mut self.store, &shared);

        // Static lights.
        let mut cache: FxHashMap<LightingLight, ExpansionMap> = FxHashMap::default();
        let static_chunks = self.outdated_static.pop_up_to(self.max_static_updates);
        for &chunk in &static_chunks {
            let state = self.store.get_mut(chunk);
            let buffers = &shared.chunks[chunk];
            for entry in state.static_lights.iter_mut().filter(|e| !e.drawn) {
                let map = cache
                    .entry(entry.light)
                    .or_insert_with(|| self.expander.expand(&entry.light, &shared.affectors, &dims));
                map.apply_to(state.coord, |index, value| buffers.add_static(index, value));
                entry.drawn = true;
            }
        }
        if !static_chunks.is_empty() {
            shared.push_gpu_many(static_chunks.iter().copied());
            shared.push_skylight_many(static_chunks.iter().copied());
            self.wake_worker();
        }

        if let Some(propagator) = self.inline.as_mut() {
            for _ in 0..self.skylight_steps {
                if propagator.step(&shared) == StepOutcome::Idle {
                    break;
                }
            }
        }

        // Dynamic lights.
        for light in entities.iter().filter_map(LightingLight::from_entity) {
            let chunks = dims.chunks_in_reach(light.cell());
            if chunks.is_empty() {
                continue;
            }
            let map = self.expander.expand(&light, &shared.affectors, &dims);
            if map.is_dark() {
                continue;
            }
            self.overlay.apply(&map, &chunks, &mut self.store, &shared);
        }

        let chunks: Vec<ChunkUpload> = shared
            .drain_gpu(self.max_chunk_updates)
            .into_iter()
            .map(|chunk| self.upload(chunk))
            .collect();

        tracing::trace!(
            uploads = chunks.len(),
            static_chunks = static_chunks.len(),
            lights_expanded = cache.len(),
            dynamic_chunks = self.overlay.len(),
            gpu_backlog = shared.outdated_gpu_len(),
            skylight_pending = shared.pending_skylight(),
            "lighting update"
        );

        UpdateBatch { chunks }
    }

    fn upload(&self, chunk: usize) -> ChunkUpload {
        let state = self.store.get(chunk);
        let data = if state.has_dynamic {
            state.data_dynamic.clone()
        } else {
            self.shared.chunks[chunk].data_skylight_static.snapshot()
        };
        ChunkUpload {
            coord: state.coord,
            data,
        }
    }

    fn wake_worker(&self) {
        if let Some(worker) = &self.worker {
            worker.wake();
        }
    }

    /// Direction skylight currently travels in.
    pub fn skylight_direction(&self) -> [f32; 3] {
        self.shared.direction()
    }

    /// Changes the direction skylight travels in. Propagation restarts from
    /// the new entry corner; tables are only rebuilt when an axis flips sign.
    pub fn set_skylight_direction(&mut self, direction: [f32; 3]) {
        self.shared.set_direction(direction);
        self.shared.request_skylight_pass();
        self.wake_worker();
    }

    /// Sky colour entering the grid from outside.
    pub fn ambient_sky(&self) -> LightingValue {
        self.shared.ambient()
    }

    /// Changes the sky colour and schedules a full skylight cycle.
    pub fn set_ambient_sky(&mut self, ambient: LightingValue) {
        self.shared.set_ambient(ambient);
        self.shared.request_skylight_pass();
        self.wake_worker();
    }

    /// `true` once skylight propagation has converged and no work is queued.
    pub fn is_skylight_idle(&self) -> bool {
        self.shared.is_skylight_idle()
    }

    /// Snapshot of queue lengths. Skylight figures may lag the worker.
    pub fn stats(&self) -> LightingStats {
        LightingStats {
            dirty_columns: self.dirty.pending(),
            outdated_static: self.outdated_static.len(),
            outdated_skylight: self.shared.pending_skylight(),
            outdated_gpu: self.shared.outdated_gpu_len(),
            dynamic_chunks: self.overlay.len(),
            static_lights: self.store.static_light_entries(),
        }
    }

    /// Chunk containing `cell`, or `None` outside the grid.
    pub fn chunk_at_cell(&self, cell: [i32; 3]) -> Option<ChunkCoord> {
        self.shared.dims.chunk_at_cell(cell)
    }

    /// Light the renderer would see at `cell` after this frame.
    pub fn read_cell(&self, cell: [i32; 3]) -> Option<LightingValue> {
        self.read_buffer(CellBuffer::Effective, cell)
    }

    /// Value of `cell` in one of the buffers, or `None` outside the grid.
    pub fn read_buffer(&self, buffer: CellBuffer, cell: [i32; 3]) -> Option<LightingValue> {
        let dims = &self.shared.dims;
        if !dims.contains_cell(cell) {
            return None;
        }
        let (chunk, index) = dims.locate(cell.map(|c| c as usize));
        let buffers = &self.shared.chunks[chunk];
        let value = match buffer {
            CellBuffer::Static => buffers.data_static.load(index),
            CellBuffer::Skylight => buffers.data_skylight.load(index),
            CellBuffer::SkylightStatic => buffers.data_skylight_static.load(index),
            CellBuffer::Effective => {
                let state = self.store.get(chunk);
                if state.has_dynamic {
                    state.data_dynamic[index]
                } else {
                    buffers.data_skylight_static.load(index)
                }
            }
        };
        Some(value)
    }

    /// Transmission of the `axis` face at face coordinates `(x, y, z)`.
    pub fn affector(&self, axis: Axis, x: usize, y: usize, z: usize) -> LightingValue {
        self.shared.affectors.get(axis, x, y, z)
    }

    /// Static lights registered with the chunk at `coord`.
    pub fn static_lights_in(&self, coord: ChunkCoord) -> Vec<LightingLight> {
        let index = self.shared.dims.chunk_index(coord);
        self.store
            .get(index)
            .static_lights
            .iter()
            .map(|e| e.light)
            .collect()
    }

    /// Stops and joins the skylight worker.
    pub fn shutdown(mut self) -> Result<(), LightingError> {
        self.stop_worker()
    }

    fn stop_worker(&mut self) -> Result<(), LightingError> {
        self.shared.stop();
        match self.worker.take() {
            Some(mut worker) => worker.shutdown(),
            None => Ok(()),
        }
    }
}

impl Drop for LightingEngine {
    fn drop(&mut self) {
        if let Err(err) = self.stop_worker() {
            tracing::error!(%err, "lighting engine teardown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use parklight_world::{EntityKind, TileElement, TileMap, WorldPos};

    use super::*;
    use crate::coords::CHUNK_VOLUME;

    fn config() -> (LightingConfig, MapConfig) {
        let lighting = LightingConfig {
            skylight_worker: false,
            max_chunk_updates_per_frame: 5,
            skylight_steps_per_update: 64,
            ..LightingConfig::default()
        };
        let map = MapConfig {
            tiles_x: 16,
            tiles_y: 16,
            height_cells: 32,
        };
        (lighting, map)
    }

    fn flat_world() -> TileMap {
        let mut world = TileMap::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                world.push_element(TileCoord::new(x, y), TileElement::surface(8)).unwrap();
            }
        }
        world
    }

    fn run_until_quiet(engine: &mut LightingEngine, world: &TileMap) -> usize {
        for frame in 0..2_000 {
            if engine.update(world, &[]).is_empty() && engine.is_skylight_idle() {
                return frame;
            }
        }
        panic!("lighting never reached a fixed point");
    }

    #[test]
    fn test_rejects_bad_grid() {
        let (lighting, mut map) = config();
        map.height_cells = 20;
        assert!(matches!(
            LightingEngine::new(&lighting, &map),
            Err(LightingError::InvalidDimensions { z: 20, .. })
        ));
    }

    #[test]
    fn test_batch_is_bounded() {
        let (lighting, map) = config();
        let mut engine = LightingEngine::new(&lighting, &map).unwrap();
        let world = flat_world();
        engine.invalidate_all(&world).unwrap();
        let batch = engine.update(&world, &[]);
        assert_eq!(batch.len(), 5);
        assert!(batch.iter().all(|u| u.data.len() == CHUNK_VOLUME));
        assert_eq!(batch.iter().next().unwrap().as_bytes().len(), CHUNK_VOLUME * 3);
        assert!(engine.stats().outdated_gpu > 0);
    }

    #[test]
    fn test_reaches_fixed_point() {
        let (lighting, map) = config();
        let mut engine = LightingEngine::new(&lighting, &map).unwrap();
        let world = flat_world();
        engine.invalidate_all(&world).unwrap();
        run_until_quiet(&mut engine, &world);
        for _ in 0..3 {
            assert!(engine.update(&world, &[]).is_empty());
        }
        let stats = engine.stats();
        assert_eq!(stats.outdated_gpu, 0);
        assert_eq!(stats.outdated_static, 0);
        assert_eq!(stats.dirty_columns, 0);
    }

    #[test]
    fn test_invalidate_twice_is_idempotent() {
        let (lighting, map) = config();
        let mut engine = LightingEngine::new(&lighting, &map).unwrap();
        let mut world = flat_world();
        let tile = TileCoord::new(5, 5);
        world.push_element(tile, TileElement::path(8, 0b0101, true)).unwrap();
        world
            .push_element(tile, TileElement::wall(8, 24, Direction::PosY))
            .unwrap();
        engine.invalidate_all(&world).unwrap();
        run_until_quiet(&mut engine, &world);

        let sample = [11, 11, 3];
        let chunk = engine.chunk_at_cell(sample).unwrap();
        let before_lights = engine.static_lights_in(chunk);
        let before_value = engine.read_cell(sample);
        let before_face = engine.affector(Axis::Y, 10, 12, 3);

        engine.invalidate_at(&world, tile).unwrap();
        engine.invalidate_at(&world, tile).unwrap();
        run_until_quiet(&mut engine, &world);

        assert_eq!(engine.static_lights_in(chunk).len(), before_lights.len());
        assert_eq!(engine.read_cell(sample), before_value);
        assert_eq!(engine.affector(Axis::Y, 10, 12, 3), before_face);
        assert_eq!(before_face, LightingValue::BLACK);
    }

    #[test]
    fn test_out_of_grid_tile_is_ignored() {
        let (lighting, map) = config();
        let mut engine = LightingEngine::new(&lighting, &map).unwrap();
        let world = flat_world();
        engine.invalidate_at(&world, TileCoord::new(-1, 3)).unwrap();
        engine.invalidate_at(&world, TileCoord::new(16, 3)).unwrap();
        assert_eq!(engine.stats().outdated_static, 0);
        assert!(engine.read_cell([-1, 0, 0]).is_none());
    }

    #[test]
    fn test_train_head_lights_overlay_only() {
        let (lighting, map) = config();
        let mut engine = LightingEngine::new(&lighting, &map).unwrap();
        let world = flat_world();
        engine.invalidate_all(&world).unwrap();
        run_until_quiet(&mut engine, &world);

        let train = MovingEntity::new(WorldPos::new(160, 160, 160), EntityKind::TrainHead);
        engine.update(&world, &[train]);
        let cell = [10, 10, 5];
        let lit = engine.read_cell(cell).unwrap();
        let base = engine.read_buffer(CellBuffer::SkylightStatic, cell).unwrap();
        assert!(lit.total() > base.total());
        assert!(engine.stats().dynamic_chunks > 0);
    }

    #[test]
    fn test_capacity_overflow_is_reported() {
        let (mut lighting, map) = config();
        lighting.max_lights_per_chunk = 2;
        let mut engine = LightingEngine::new(&lighting, &map).unwrap();
        let mut world = flat_world();
        let tile = TileCoord::new(3, 3);
        world.push_element(tile, TileElement::path(8, 0, true)).unwrap();
        let err = engine.invalidate_at(&world, tile).unwrap_err();
        assert!(matches!(err, LightingError::CapacityExceeded { capacity: 2, .. }));
        assert_eq!(engine.static_lights_in(ChunkCoord::new(0, 0, 0)).len(), 2);
    }

    #[test]
    fn test_shutdown_joins_worker() {
        let (mut lighting, map) = config();
        lighting.skylight_worker = true;
        lighting.worker_sleep_us = 50;
        let engine = LightingEngine::new(&lighting, &map).unwrap();
        engine.shutdown().unwrap();
    }
}
