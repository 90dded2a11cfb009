//! Static light expansion: a bounded wavefront from a point light through the
//! affector grids.
//!
//! Cells are visited in increasing Manhattan distance from the light's cell,
//! so the upstream neighbour on every axis is final before a cell reads it.
//! Each cell blends the attenuated upstream values with weights
//! `|offset_axis| / manhattan`, corrected by the falloff ratio between the cell
//! and its upstream neighbour. In open space the result is exactly
//! `colour * falloff(distance)`.

use std::sync::LazyLock;

use crate::affector::{AffectorGrids, Axis};
use crate::coords::{ChunkCoord, GridDims, LIGHTMAP_CHUNK_SIZE, MAXSPREAD, local_index};
use crate::grid::Grid3D;
use crate::light::LightingLight;
use crate::value::LightingValue;

/// Falloff numerator, in squared cells.
pub const FALLOFF_K: f32 = 4.0;

/// Upper bound of the falloff factor.
pub const FALLOFF_CAP: f32 = 1.0;

/// Edge length of an expansion map in cells.
pub const EXPANSION_SPAN: usize = (2 * MAXSPREAD + 1) as usize;

/// Intensity factor at squared distance `d2` (in cells) from a light.
#[inline]
pub fn falloff(d2: f32) -> f32 {
    if d2 <= 0.0 {
        FALLOFF_CAP
    } else {
        (FALLOFF_K / d2).min(FALLOFF_CAP)
    }
}

static VISIT_ORDER: LazyLock<Vec<[i8; 3]>> = LazyLock::new(|| {
    let r = MAXSPREAD as i8;
    let mut order = Vec::with_capacity(EXPANSION_SPAN.pow(3));
    for z in -r..=r {
        for y in -r..=r {
            for x in -r..=r {
                order.push([x, y, z]);
            }
        }
    }
    order.sort_by_key(|o| manhattan(*o));
    order
});

fn manhattan(o: [i8; 3]) -> i32 {
    o.iter().map(|&v| (v as i32).abs()).sum()
}

/// Offsets of the expansion cube in non-decreasing Manhattan distance,
/// starting with the centre.
pub fn visit_order() -> &'static [[i8; 3]] {
    &VISIT_ORDER
}

/// One light's contribution over the cube of cells within [`MAXSPREAD`] of it.
#[derive(Clone, Debug)]
pub struct ExpansionMap {
    origin: [i32; 3],
    values: Grid3D<LightingValue>,
}

impl ExpansionMap {
    /// Grid cell of the map's `(0, 0, 0)` corner.
    pub fn origin(&self) -> [i32; 3] {
        self.origin
    }

    /// Value at a grid cell; black outside the map.
    pub fn get(&self, cell: [i32; 3]) -> LightingValue {
        self.values
            .get(
                cell[0] - self.origin[0],
                cell[1] - self.origin[1],
                cell[2] - self.origin[2],
            )
            .copied()
            .unwrap_or(LightingValue::BLACK)
    }

    /// Returns `true` if the light reaches no cell at all.
    pub fn is_dark(&self) -> bool {
        self.values.as_slice().iter().all(|v| *v == LightingValue::BLACK)
    }

    /// Feeds every lit cell overlapping `chunk` to `add` as
    /// `(local_index, value)`.
    ///
    /// The map is not modified, so one expansion can be applied to any number
    /// of chunks and buffers.
    pub fn apply_to(&self, chunk: ChunkCoord, mut add: impl FnMut(usize, LightingValue)) {
        let base = chunk.origin_cell();
        let mut lo = [0i32; 3];
        let mut hi = [0i32; 3];
        for a in 0..3 {
            lo[a] = self.origin[a].max(base[a]);
            hi[a] = (self.origin[a] + EXPANSION_SPAN as i32).min(base[a] + LIGHTMAP_CHUNK_SIZE as i32);
            if lo[a] >= hi[a] {
                return;
            }
        }
        for z in lo[2]..hi[2] {
            for y in lo[1]..hi[1] {
                for x in lo[0]..hi[0] {
                    let v = *self.values.at(
                        (x - self.origin[0]) as usize,
                        (y - self.origin[1]) as usize,
                        (z - self.origin[2]) as usize,
                    );
                    if v != LightingValue::BLACK {
                        add(
                            local_index(
                                (x - base[0]) as usize,
                                (y - base[1]) as usize,
                                (z - base[2]) as usize,
                            ),
                            v,
                        );
                    }
                }
            }
        }
    }
}

/// Computes expansion maps, reusing its scratch buffers between lights.
pub struct LightExpander {
    scratch: Grid3D<[f32; 3]>,
    falloff: Grid3D<f32>,
}

impl LightExpander {
    pub fn new() -> Self {
        let size = [EXPANSION_SPAN; 3];
        Self {
            scratch: Grid3D::new(size, [0.0; 3]),
            falloff: Grid3D::new(size, 0.0),
        }
    }

    /// Expands `light` through the current affectors.
    pub fn expand(
        &mut self,
        light: &LightingLight,
        affectors: &AffectorGrids,
        dims: &GridDims,
    ) -> ExpansionMap {
        let centre = light.cell();
        let pos = light.cell_pos();
        let origin = centre.map(|c| c - MAXSPREAD);

        for z in 0..EXPANSION_SPAN {
            for y in 0..EXPANSION_SPAN {
                for x in 0..EXPANSION_SPAN {
                    let local = [x, y, z];
                    let d2: f32 = (0..3)
                        .map(|a| {
                            let c = (origin[a] + local[a] as i32) as f32 + 0.5;
                            (c - pos[a]).powi(2)
                        })
                        .sum();
                    *self.falloff.at_mut(x, y, z) = falloff(d2);
                }
            }
        }
        self.scratch.fill([0.0; 3]);

        let colour = light.colour.to_f32();
        let r = MAXSPREAD;
        for &offset in visit_order() {
            let off = offset.map(|v| v as i32);
            let cell = [centre[0] + off[0], centre[1] + off[1], centre[2] + off[2]];
            if !dims.contains_cell(cell) {
                continue;
            }
            let (lx, ly, lz) = ((off[0] + r) as usize, (off[1] + r) as usize, (off[2] + r) as usize);
            let f = *self.falloff.at(lx, ly, lz);

            let dist = off.iter().map(|v| v.abs()).sum::<i32>();
            if dist == 0 {
                *self.scratch.at_mut(lx, ly, lz) = colour.map(|c| c * f);
                continue;
            }

            let mut acc = [0.0f32; 3];
            for axis in Axis::ALL {
                let a = axis as usize;
                if off[a] == 0 {
                    continue;
                }
                let mut up = [lx, ly, lz];
                up[a] = (up[a] as i32 - off[a].signum()) as usize;
                let src = *self.scratch.at(up[0], up[1], up[2]);
                if src == [0.0; 3] {
                    continue;
                }
                let mut up_cell = cell;
                up_cell[a] -= off[a].signum();
                let aff = affectors.crossing(axis, up_cell, cell).to_factor();
                let weight = off[a].abs() as f32 / dist as f32 * (f / *self.falloff.at(up[0], up[1], up[2]));
                for ch in 0..3 {
                    acc[ch] += src[ch] * aff[ch] * weight;
                }
            }
            *self.scratch.at_mut(lx, ly, lz) = acc;
        }

        ExpansionMap {
            origin,
            values: Grid3D::from_fn([EXPANSION_SPAN; 3], |x, y, z| {
                LightingValue::from_f32(*self.scratch.at(x, y, z))
            }),
        }
    }
}

impl Default for LightExpander {
    fn default() -> Self {
        Self::new()
    }
}
