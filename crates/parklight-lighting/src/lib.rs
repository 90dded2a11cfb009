//! Volumetric lighting for a tile-based park: per-face occlusion built from the
//! map, static lamps expanded by a Manhattan wavefront, skylight propagated on
//! a background thread, and a per-frame overlay for moving lights.

pub mod affector;
pub mod chunk;
pub mod coords;
mod dynamic;
mod engine;
mod error;
pub mod expansion;
mod grid;
pub mod light;
mod queue_set;
mod shared;
pub mod skylight;
mod value;
mod worker;

pub use affector::{AffectorBuilder, AffectorGrids, Axis, DirtyColumns, glass_tint};
pub use chunk::{ChunkBuffers, ChunkState, ChunkStore, VoxelBuffer};
pub use coords::{
    CHUNK_VOLUME, ChunkCoord, GridDims, LIGHT_UNITS_PER_CELL, LIGHTMAP_CHUNK_SIZE, MAXSPREAD,
    TILE_CELLS,
};
pub use dynamic::DynamicOverlay;
pub use engine::{CellBuffer, ChunkUpload, LightingEngine, LightingStats, UpdateBatch};
pub use error::LightingError;
pub use expansion::{ExpansionMap, LightExpander, falloff};
pub use grid::Grid3D;
pub use light::{LightingLight, StaticLightEntry, lamp_lights};
pub use queue_set::QueueSet;
pub use shared::LightingShared;
pub use skylight::{SkylightPropagator, SkylightTables, StepOutcome};
pub use value::{AtomicLightingValue, LightingValue};
pub use worker::SkylightWorker;
