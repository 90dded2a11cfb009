//! Read-only world model consumed by the lighting engine: tile elements,
//! the world-query interface, an in-memory tile map, and moving entities.

pub mod element;
pub mod entity;
pub mod map;

pub use element::{Direction, ElementKind, GLASS_WALL_TYPE, TileCoord, TileElement};
pub use entity::{EntityKind, MovingEntity, WorldPos};
pub use map::{MapError, TileMap, WorldQuery};

/// World units per tile along X and Y.
pub const TILE_SIZE: i32 = 32;

/// World Z units per element height unit.
pub const Z_STEP: i32 = 8;
