//! RGB light values and their atomic storage cell.
//!
//! A [`LightingValue`] is both a light intensity and a transmission factor:
//! multiplying by an affector scales each channel by `affector / 255`.

use std::sync::atomic::{AtomicU32, Ordering};

use bytemuck::{Pod, Zeroable};

/// Three 8-bit light channels. All arithmetic saturates at 0 and 255.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct LightingValue {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

static_assertions::assert_eq_size!(LightingValue, [u8; 3]);

impl LightingValue {
    /// No light; a fully opaque affector.
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// Full intensity; a fully transmissive affector.
    pub const LIT: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a value from a `[r, g, b]` array.
    pub const fn from_array(rgb: [u8; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }

    /// Per-channel saturating addition.
    pub fn saturating_add(self, other: Self) -> Self {
        Self::new(
            self.r.saturating_add(other.r),
            self.g.saturating_add(other.g),
            self.b.saturating_add(other.b),
        )
    }

    /// Per-channel minimum, used to combine occluders sharing a face.
    pub fn min(self, other: Self) -> Self {
        Self::new(
            self.r.min(other.r),
            self.g.min(other.g),
            self.b.min(other.b),
        )
    }

    /// Sum of the three channels.
    pub fn total(self) -> u32 {
        self.r as u32 + self.g as u32 + self.b as u32
    }

    /// Channels as floats in `0.0..=255.0`.
    pub fn to_f32(self) -> [f32; 3] {
        [self.r as f32, self.g as f32, self.b as f32]
    }

    /// Channels as transmission fractions in `0.0..=1.0`.
    pub fn to_factor(self) -> [f32; 3] {
        const INV: f32 = 1.0 / 255.0;
        [self.r as f32 * INV, self.g as f32 * INV, self.b as f32 * INV]
    }

    /// Rounds and clamps float channels into a value.
    pub fn from_f32(rgb: [f32; 3]) -> Self {
        fn clamp(v: f32) -> u8 {
            v.round().clamp(0.0, 255.0) as u8
        }
        Self::new(clamp(rgb[0]), clamp(rgb[1]), clamp(rgb[2]))
    }

    /// Packs the channels into the low 24 bits of a `u32`.
    pub const fn to_bits(self) -> u32 {
        self.r as u32 | (self.g as u32) << 8 | (self.b as u32) << 16
    }

    /// Inverse of [`to_bits`](Self::to_bits).
    pub const fn from_bits(bits: u32) -> Self {
        Self::new(bits as u8, (bits >> 8) as u8, (bits >> 16) as u8)
    }
}

/// A [`LightingValue`] that can be read and written from several threads.
///
/// Loads and stores are relaxed: a reader may observe a value one update
/// behind the writer, but never a value mixing channels of two writes.
#[derive(Debug, Default)]
pub struct AtomicLightingValue(AtomicU32);

impl AtomicLightingValue {
    /// A cell holding `value`.
    pub const fn new(value: LightingValue) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    /// Relaxed load.
    #[inline]
    pub fn load(&self) -> LightingValue {
        LightingValue::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Relaxed store.
    #[inline]
    pub fn store(&self, value: LightingValue) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Stores `value` and returns `true` if it differs from the previous one.
    #[inline]
    pub fn replace(&self, value: LightingValue) -> bool {
        self.0.swap(value.to_bits(), Ordering::Relaxed) != value.to_bits()
    }

    /// Saturating add of `value` into the cell.
    #[inline]
    pub fn add(&self, value: LightingValue) {
        let _ = self.0.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            Some(LightingValue::from_bits(bits).saturating_add(value).to_bits())
        });
    }
}
