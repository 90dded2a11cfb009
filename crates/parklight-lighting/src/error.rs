//! Lighting engine error types.

use crate::coords::ChunkCoord;

/// Errors surfaced by [`LightingEngine`](crate::LightingEngine).
///
/// Out-of-grid lookups and stale reads between the skylight worker and the
/// main thread are not errors; they degrade to ambient sky or last-frame light.
#[derive(Debug, thiserror::Error)]
pub enum LightingError {
    /// Grid dimensions are zero or not a multiple of the chunk size.
    #[error(
        "invalid lightmap size {x}x{y}x{z} cells: every axis must be a positive multiple of {chunk}"
    )]
    InvalidDimensions {
        x: usize,
        y: usize,
        z: usize,
        chunk: usize,
    },

    /// A static light was dropped because a chunk in its range is full.
    #[error("chunk {chunk} already holds {capacity} static lights")]
    CapacityExceeded { chunk: ChunkCoord, capacity: usize },

    /// The skylight worker thread could not be started.
    #[error("failed to spawn skylight worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The skylight worker thread panicked before it was joined.
    #[error("skylight worker panicked")]
    WorkerPanicked,
}
