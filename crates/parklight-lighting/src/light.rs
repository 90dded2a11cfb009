//! Point lights: lamps attached to paths and headlights carried by trains.

use parklight_world::{Direction, MovingEntity, TILE_SIZE, TileCoord, TileElement, WorldPos, Z_STEP};

use crate::coords::{LIGHT_UNITS_PER_CELL, light_to_cell, world_to_light};
use crate::value::LightingValue;

/// Colour of path lamps.
pub const LAMP_COLOUR: LightingValue = LightingValue::new(255, 236, 200);

/// Lamp height above the path surface, in element height units.
pub const LAMP_HEIGHT: i32 = 6;

/// Distance of a lamp from the tile edge it stands on, in world units.
pub const LAMP_EDGE_INSET: i32 = 4;

/// Colour of train headlights.
pub const TRAIN_LIGHT_COLOUR: LightingValue = LightingValue::new(255, 250, 230);

/// A point light at a fixed-point position (16 light units per cell).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LightingLight {
    /// Position in light units.
    pub pos: [i32; 3],
    /// Base colour at the light's centre.
    pub colour: LightingValue,
    /// Tile the light belongs to, for static lights.
    pub origin: Option<TileCoord>,
}

impl LightingLight {
    pub fn new(pos: [i32; 3], colour: LightingValue) -> Self {
        Self {
            pos,
            colour,
            origin: None,
        }
    }

    /// Tags the light with the tile that owns it.
    pub fn with_origin(mut self, tile: TileCoord) -> Self {
        self.origin = Some(tile);
        self
    }

    /// Lightmap cell containing the light.
    pub fn cell(&self) -> [i32; 3] {
        light_to_cell(self.pos)
    }

    /// Position in cell units as floats.
    pub fn cell_pos(&self) -> [f32; 3] {
        self.pos.map(|v| v as f32 / LIGHT_UNITS_PER_CELL as f32)
    }

    /// The lamp standing on `edge` of a path at `base_height` on `tile`.
    pub fn lamp(tile: TileCoord, base_height: u8, edge: Direction) -> Self {
        let half = TILE_SIZE / 2;
        let (dx, dy) = edge.offset();
        let inset = half - LAMP_EDGE_INSET;
        let world = WorldPos::new(
            tile.x * TILE_SIZE + half + dx * inset,
            tile.y * TILE_SIZE + half + dy * inset,
            (base_height as i32 + LAMP_HEIGHT) * Z_STEP,
        );
        Self::new(world_to_light(world), LAMP_COLOUR).with_origin(tile)
    }

    /// Headlight of a moving entity, if its kind carries one.
    pub fn from_entity(entity: &MovingEntity) -> Option<Self> {
        if !entity.kind.emits_light() {
            return None;
        }
        let mut pos = world_to_light(entity.position);
        pos[2] += LIGHT_UNITS_PER_CELL;
        Some(Self::new(pos, TRAIN_LIGHT_COLOUR))
    }
}

/// Every lamp standing on `tile`: one per open edge of each lamp-bearing path.
pub fn lamp_lights(tile: TileCoord, elements: &[TileElement]) -> Vec<LightingLight> {
    elements
        .iter()
        .flat_map(|e| {
            e.open_lamp_edges()
                .map(move |edge| LightingLight::lamp(tile, e.base_height, edge))
        })
        .collect()
}

/// A static light registered with a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticLightEntry {
    pub light: LightingLight,
    /// Whether the light's contribution is already in the chunk's static buffer.
    pub drawn: bool,
}

impl StaticLightEntry {
    pub fn new(light: LightingLight) -> Self {
        Self {
            light,
            drawn: false,
        }
    }
}
