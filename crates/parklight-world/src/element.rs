//! Tile elements: the vertical stack of map objects standing on one tile.

/// Wall type id of coloured glass walls; their transmission depends on colour.
pub const GLASS_WALL_TYPE: u8 = 54;

/// Map tile coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Tile X.
    pub x: i32,
    /// Tile Y.
    pub y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the neighbouring tile in the given direction.
    pub fn neighbor(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }
}

/// One of the four cardinal edges of a tile.
///
/// The discriminant doubles as the bit index in edge and dirty masks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards -X.
    NegX = 0,
    /// Towards +Y.
    PosY = 1,
    /// Towards +X.
    PosX = 2,
    /// Towards -Y.
    NegY = 3,
}

impl Direction {
    /// All directions in bit order.
    pub const ALL: [Direction; 4] = [
        Direction::NegX,
        Direction::PosY,
        Direction::PosX,
        Direction::NegY,
    ];

    /// Bit of this direction in a 4-bit mask.
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }

    /// Returns the opposite direction.
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::NegX => Direction::PosX,
            Direction::PosY => Direction::NegY,
            Direction::PosX => Direction::NegX,
            Direction::NegY => Direction::PosY,
        }
    }

    /// Unit tile offset `(dx, dy)`.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::NegX => (-1, 0),
            Direction::PosY => (0, 1),
            Direction::PosX => (1, 0),
            Direction::NegY => (0, -1),
        }
    }
}

/// Kind-specific data of a tile element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// Terrain. Everything below the base height is solid ground.
    Surface,
    /// Footpath. `edges` is a 4-bit mask of connected edges ([`Direction::bit`]).
    Path { edges: u8, has_lamp: bool },
    /// Small or large scenery filling the tile between base and clearance.
    Scenery,
    /// A wall standing on one edge of the tile.
    Wall {
        direction: Direction,
        wall_type: u8,
        colour: u8,
    },
    /// Ride track piece.
    Track { occludes_sides: bool },
    /// Park or ride entrance.
    Entrance,
}

/// A single element in a tile's vertical stack.
///
/// Heights are in element height units (see [`crate::Z_STEP`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileElement {
    /// Bottom of the element.
    pub base_height: u8,
    /// Top of the element.
    pub clearance_height: u8,
    /// What the element is.
    pub kind: ElementKind,
}

impl TileElement {
    /// Terrain surface at the given height.
    pub fn surface(height: u8) -> Self {
        Self {
            base_height: height,
            clearance_height: height,
            kind: ElementKind::Surface,
        }
    }

    /// Footpath at `height` with the given connected edge mask.
    pub fn path(height: u8, edges: u8, has_lamp: bool) -> Self {
        Self {
            base_height: height,
            clearance_height: height.saturating_add(4),
            kind: ElementKind::Path {
                edges: edges & 0x0F,
                has_lamp,
            },
        }
    }

    /// Scenery between `base` and `clearance`.
    pub fn scenery(base: u8, clearance: u8) -> Self {
        Self {
            base_height: base,
            clearance_height: clearance,
            kind: ElementKind::Scenery,
        }
    }

    /// Plain opaque wall.
    pub fn wall(base: u8, clearance: u8, direction: Direction) -> Self {
        Self {
            base_height: base,
            clearance_height: clearance,
            kind: ElementKind::Wall {
                direction,
                wall_type: 0,
                colour: 0,
            },
        }
    }

    /// Coloured glass wall.
    pub fn glass_wall(base: u8, clearance: u8, direction: Direction, colour: u8) -> Self {
        Self {
            base_height: base,
            clearance_height: clearance,
            kind: ElementKind::Wall {
                direction,
                wall_type: GLASS_WALL_TYPE,
                colour,
            },
        }
    }

    /// Ride track piece.
    pub fn track(base: u8, clearance: u8, occludes_sides: bool) -> Self {
        Self {
            base_height: base,
            clearance_height: clearance,
            kind: ElementKind::Track { occludes_sides },
        }
    }

    /// Height span in element units.
    pub fn span(&self) -> u8 {
        self.clearance_height.saturating_sub(self.base_height)
    }

    /// Returns `true` for a path carrying a lamp.
    pub fn has_lamp(&self) -> bool {
        matches!(self.kind, ElementKind::Path { has_lamp: true, .. })
    }

    /// Edges of a lamp-bearing path that are not connected to another path.
    ///
    /// Empty for every other element.
    pub fn open_lamp_edges(&self) -> impl Iterator<Item = Direction> + '_ {
        let edges = match self.kind {
            ElementKind::Path {
                edges,
                has_lamp: true,
            } => Some(edges),
            _ => None,
        };
        Direction::ALL
            .into_iter()
            .filter(move |d| edges.is_some_and(|mask| mask & d.bit() == 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_bits_are_distinct() {
        let mask = Direction::ALL.iter().fold(0u8, |acc, d| acc | d.bit());
        assert_eq!(mask, 0x0F);
    }

    #[test]
    fn test_opposite_is_involution() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            let (dx, dy) = d.offset();
            let (ox, oy) = d.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn test_neighbor_tile() {
        let t = TileCoord::new(10, 10);
        assert_eq!(t.neighbor(Direction::PosX), TileCoord::new(11, 10));
        assert_eq!(t.neighbor(Direction::NegY), TileCoord::new(10, 9));
    }

    #[test]
    fn test_open_lamp_edges() {
        // Connected on -X and +X only: lamps on the two open sides.
        let path = TileElement::path(16, Direction::NegX.bit() | Direction::PosX.bit(), true);
        let open: Vec<_> = path.open_lamp_edges().collect();
        assert_eq!(open, vec![Direction::PosY, Direction::NegY]);
    }

    #[test]
    fn test_no_lamp_edges_without_lamp() {
        let path = TileElement::path(16, 0, false);
        assert_eq!(path.open_lamp_edges().count(), 0);
        assert_eq!(TileElement::surface(8).open_lamp_edges().count(), 0);
    }

    #[test]
    fn test_span() {
        assert_eq!(TileElement::scenery(10, 50).span(), 40);
        assert_eq!(TileElement::surface(10).span(), 0);
    }
}
