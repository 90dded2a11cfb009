//! Moving entities that can carry a dynamic light.

use crate::TILE_SIZE;
use crate::element::TileCoord;

/// Position in world units (32 per tile horizontally, 8 per height unit vertically).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WorldPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl WorldPos {
    /// Creates a new world position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Tile containing this position.
    pub fn tile(self) -> TileCoord {
        TileCoord::new(self.x.div_euclid(TILE_SIZE), self.y.div_euclid(TILE_SIZE))
    }
}

/// Classification of a moving entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Leading car of a train.
    TrainHead,
    /// Any trailing car of a train.
    TrainCar,
    /// Park guest or staff.
    Peep,
}

impl EntityKind {
    /// Whether entities of this kind carry a light.
    pub fn emits_light(self) -> bool {
        matches!(self, EntityKind::TrainHead)
    }
}

/// A moving entity snapshot for the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovingEntity {
    /// Current world position.
    pub position: WorldPos,
    /// What the entity is.
    pub kind: EntityKind,
}

impl MovingEntity {
    /// Creates a new entity snapshot.
    pub const fn new(position: WorldPos, kind: EntityKind) -> Self {
        Self { position, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_train_heads_emit_light() {
        assert!(EntityKind::TrainHead.emits_light());
        assert!(!EntityKind::TrainCar.emits_light());
        assert!(!EntityKind::Peep.emits_light());
    }

    #[test]
    fn test_world_pos_tile() {
        assert_eq!(WorldPos::new(0, 31, 0).tile(), TileCoord::new(0, 0));
        assert_eq!(WorldPos::new(32, 64, 0).tile(), TileCoord::new(1, 2));
        assert_eq!(WorldPos::new(-1, 0, 0).tile(), TileCoord::new(-1, 0));
    }
}
