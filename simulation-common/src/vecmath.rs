use serde::{Serialize, Deserialize};

// Lattice coordinate of a cell's center of mass, in voxel units.
#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    #[inline(always)]
    pub fn new(x: f32, y: f32, z: f32) -> Self { Self { x, y, z } }
    #[inline(always)]
    pub fn zero() -> Self { Self::new(0.0, 0.0, 0.0) }
    #[inline(always)]
    pub fn add(self, other: Self) -> Self { Self::new(self.x + other.x, self.y + other.y, self.z + other.z) }
    #[inline(always)]
    pub fn is_finite(self) -> bool { self.x.is_finite() && self.y.is_finite() && self.z.is_finite() }

    /// Integer voxel index of this position, truncating toward zero (a cast, not a round).
    /// Returns `None` for non-finite coordinates, which would otherwise saturate silently.
    #[inline(always)]
    pub fn truncate(self) -> Option<(i64, i64, i64)> {
        if !self.is_finite() {
            return None;
        }
        Some((self.x as i64, self.y as i64, self.z as i64))
    }
}

#[inline(always)]
pub fn clamp(val: f32, min: f32, max: f32) -> f32 { val.max(min).min(max) }
