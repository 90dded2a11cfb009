//! Incremental skylight propagation.
//!
//! Skylight enters the grid from the corner the direction points away from
//! and flows cell by cell. Every cell pulls from its upstream neighbour on
//! each axis (ambient sky outside the grid), attenuates by the crossed face,
//! and blends the three contributions by `|direction component|`.
//!
//! Chunks are processed in batches: bucket `d` holds every chunk at Manhattan
//! distance `d` from the corner chunk, and buckets are visited in order and
//! then wrap. Inside a chunk, cells are visited by Manhattan distance from the
//! local corner. Both orders put upstream cells first.

use crate::affector::Axis;
use crate::coords::{CHUNK_VOLUME, GridDims, LIGHTMAP_CHUNK_SIZE, local_index};
use crate::shared::LightingShared;
use crate::value::LightingValue;

/// Per-axis traversal sign of a direction: `+1` when light travels towards
/// increasing coordinates. A zero component counts as positive.
pub fn direction_signs(direction: [f32; 3]) -> [i32; 3] {
    direction.map(|v| if v < 0.0 { -1 } else { 1 })
}

/// Blend weights `|d_a| / sum(|d|)`, or `None` for a zero or non-finite direction.
pub fn direction_weights(direction: [f32; 3]) -> Option<[f32; 3]> {
    let abs = direction.map(f32::abs);
    let sum: f32 = abs.iter().sum();
    if !sum.is_finite() || sum <= f32::EPSILON {
        return None;
    }
    Some(abs.map(|v| v / sum))
}

/// Visitation tables for one direction signature.
pub struct SkylightTables {
    signs: [i32; 3],
    buckets: Vec<Vec<usize>>,
    cell_order: Vec<[u8; 3]>,
}

impl SkylightTables {
    pub fn build(dims: &GridDims, signs: [i32; 3]) -> Self {
        let n = dims.chunks;
        let span: usize = n.iter().map(|c| c - 1).sum();
        let mut buckets = vec![Vec::new(); span + 1];
        for index in 0..dims.chunk_count() {
            let c = dims.chunk_coord(index);
            let d = corner_distance([c.x as usize, c.y as usize, c.z as usize], n, signs);
            buckets[d].push(index);
        }

        let s = LIGHTMAP_CHUNK_SIZE;
        let mut cell_order = Vec::with_capacity(CHUNK_VOLUME);
        for z in 0..s {
            for y in 0..s {
                for x in 0..s {
                    cell_order.push([x as u8, y as u8, z as u8]);
                }
            }
        }
        cell_order.sort_by_key(|l| corner_distance(l.map(usize::from), [s; 3], signs));

        Self {
            signs,
            buckets,
            cell_order,
        }
    }

    pub fn signs(&self) -> [i32; 3] {
        self.signs
    }

    /// Chunk indices grouped by distance from the entry corner.
    pub fn buckets(&self) -> &[Vec<usize>] {
        &self.buckets
    }

    /// Local cells of a chunk in processing order.
    pub fn cell_order(&self) -> &[[u8; 3]] {
        &self.cell_order
    }

    /// Distance of a local cell from the chunk's entry corner.
    pub fn cell_distance(&self, local: [u8; 3]) -> usize {
        corner_distance(local.map(usize::from), [LIGHTMAP_CHUNK_SIZE; 3], self.signs)
    }
}

/// Manhattan distance of `p` from the entry corner of a `size` box.
fn corner_distance(p: [usize; 3], size: [usize; 3], signs: [i32; 3]) -> usize {
    (0..3)
        .map(|a| if signs[a] > 0 { p[a] } else { size[a] - 1 - p[a] })
        .sum()
}

/// What one [`SkylightPropagator::step`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Recomputed one chunk.
    Processed { changed: bool },
    /// The batch was drained and the next bucket was queued.
    Advanced,
    /// A full cycle finished without changes; nothing to do.
    Idle,
}

/// The skylight state machine. Owned by whichever thread runs it.
pub struct SkylightPropagator {
    tables: SkylightTables,
    weights: [f32; 3],
    generation: u64,
    cursor: usize,
    batch_changed: bool,
    quiet_batches: usize,
}

impl SkylightPropagator {
    pub fn new(shared: &LightingShared) -> Self {
        let direction = shared.direction();
        let tables = SkylightTables::build(&shared.dims, direction_signs(direction));
        let cursor = tables.buckets.len() - 1;
        Self {
            weights: direction_weights(direction).unwrap_or([0.0, 0.0, 1.0]),
            tables,
            generation: shared.direction_generation(),
            cursor,
            batch_changed: false,
            quiet_batches: 0,
        }
    }

    pub fn tables(&self) -> &SkylightTables {
        &self.tables
    }

    pub fn weights(&self) -> [f32; 3] {
        self.weights
    }

    /// Runs one unit of work: one chunk, or one batch transition.
    pub fn step(&mut self, shared: &LightingShared) -> StepOutcome {
        self.sync_direction(shared);
        if shared.take_skylight_request() {
            self.quiet_batches = 0;
            shared.set_skylight_idle(false);
        }

        if let Some(chunk) = shared.pop_skylight() {
            shared.set_skylight_idle(false);
            let changed = self.process_chunk(shared, chunk);
            if changed {
                self.batch_changed = true;
                shared.push_gpu(chunk);
            }
            return StepOutcome::Processed { changed };
        }

        if self.batch_changed {
            self.quiet_batches = 0;
        } else {
            self.quiet_batches = self.quiet_batches.saturating_add(1);
        }
        self.batch_changed = false;

        let nonempty = self.tables.buckets.iter().filter(|b| !b.is_empty()).count();
        if self.quiet_batches > nonempty {
            shared.set_skylight_idle(true);
            return StepOutcome::Idle;
        }

        self.advance(shared);
        StepOutcome::Advanced
    }

    fn sync_direction(&mut self, shared: &LightingShared) {
        let generation = shared.direction_generation();
        if generation == self.generation {
            return;
        }
        self.generation = generation;
        let direction = shared.direction();
        match direction_weights(direction) {
            Some(weights) => self.weights = weights,
            None => {
                tracing::warn!(?direction, "ignoring degenerate skylight direction");
                return;
            }
        }
        let signs = direction_signs(direction);
        if signs != self.tables.signs {
            self.tables = SkylightTables::build(&shared.dims, signs);
            tracing::debug!(?signs, "rebuilt skylight tables");
        }
        self.cursor = self.tables.buckets.len() - 1;
        self.quiet_batches = 0;
        shared.set_skylight_idle(false);
    }

    /// Queues the next non-empty bucket.
    fn advance(&mut self, shared: &LightingShared) {
        let n = self.tables.buckets.len();
        for _ in 0..n {
            self.cursor = (self.cursor + 1) % n;
            if !self.tables.buckets[self.cursor].is_empty() {
                break;
            }
        }
        shared.push_skylight_many(self.tables.buckets[self.cursor].iter().copied());
    }

    /// Recomputes a chunk's skylight and refreshes its combined buffer.
    /// Returns `true` if `data_skylight_static` changed.
    pub fn process_chunk(&self, shared: &LightingShared, chunk: usize) -> bool {
        let dims = &shared.dims;
        let base = dims.chunk_coord(chunk).origin_cell();
        let ambient = shared.ambient().to_f32();
        let buffers = &shared.chunks[chunk];
        let signs = self.tables.signs;
        let mut changed = false;

        for &local in &self.tables.cell_order {
            let cell = [
                base[0] + local[0] as i32,
                base[1] + local[1] as i32,
                base[2] + local[2] as i32,
            ];
            let mut acc = [0.0f32; 3];
            for axis in Axis::ALL {
                let a = axis as usize;
                let weight = self.weights[a];
                if weight == 0.0 {
                    continue;
                }
                let mut up = cell;
                up[a] -= signs[a];
                let upstream = if dims.contains_cell(up) {
                    let (ci, li) = dims.locate(up.map(|v| v as usize));
                    shared.chunks[ci].data_skylight.load(li).to_f32()
                } else {
                    ambient
                };
                let aff = shared.affectors.crossing(axis, up, cell).to_factor();
                for ch in 0..3 {
                    acc[ch] += weight * upstream[ch] * aff[ch];
                }
            }

            let li = local_index(local[0] as usize, local[1] as usize, local[2] as usize);
            let sky = LightingValue::from_f32(acc);
            buffers.data_skylight.store(li, sky);
            let combined = sky.saturating_add(buffers.data_static.load(li));
            changed |= buffers.data_skylight_static.replace(li, combined);
        }
        changed
    }
}
