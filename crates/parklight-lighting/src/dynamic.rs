//! Per-frame overlay for lights carried by moving entities.
//!
//! Dynamic lights never touch the static or skylight buffers. The first time a
//! chunk is touched in a frame its overlay is seeded from
//! `data_skylight_static`, and the chunk stays flagged until the next frame
//! begins, which clears the flag and re-uploads the chunk.

use crate::chunk::ChunkStore;
use crate::coords::CHUNK_VOLUME;
use crate::expansion::ExpansionMap;
use crate::shared::LightingShared;
use crate::value::LightingValue;

/// Chunks carrying a dynamic overlay this frame.
#[derive(Default)]
pub struct DynamicOverlay {
    chunks: Vec<usize>,
}

impl DynamicOverlay {
    /// An overlay with no chunks touched yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops last frame's overlays and queues their chunks for re-upload.
    pub fn begin_frame(&mut self, store: &mut ChunkStore, shared: &LightingShared) {
        for &chunk in &self.chunks {
            store.get_mut(chunk).has_dynamic = false;
        }
        shared.push_gpu_many(self.chunks.drain(..));
    }

    /// Splats `map` into the overlay of each chunk in `chunks`.
    pub fn apply(
        &mut self,
        map: &ExpansionMap,
        chunks: &[usize],
        store: &mut ChunkStore,
        shared: &LightingShared,
    ) {
        for &chunk in chunks {
            let state = store.get_mut(chunk);
            if !state.has_dynamic {
                if state.data_dynamic.len() != CHUNK_VOLUME {
                    state.data_dynamic = vec![LightingValue::BLACK; CHUNK_VOLUME];
                }
                shared.chunks[chunk]
                    .data_skylight_static
                    .snapshot_into(&mut state.data_dynamic);
                state.has_dynamic = true;
                self.chunks.push(chunk);
            }
            let data = &mut state.data_dynamic;
            map.apply_to(state.coord, |index, value| {
                data[index] = data[index].saturating_add(value);
            });
            shared.push_gpu(chunk);
        }
    }

    /// Number of chunks with an overlay this frame.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
