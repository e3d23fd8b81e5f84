use simulation_common::FieldProfileConfig;

/// Extent of a scalar field along x, y and z, in voxels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dim3 {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Dim3 {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    #[inline(always)]
    pub fn voxel_count(&self) -> usize {
        self.x * self.y * self.z
    }

    #[inline(always)]
    pub fn contains(&self, x: i64, y: i64, z: i64) -> bool {
        x >= 0 && y >= 0 && z >= 0
            && (x as usize) < self.x && (y as usize) < self.y && (z as usize) < self.z
    }
}

/// A dense scalar field (chemical concentration) over the lattice, stored x-fastest.
#[derive(Debug, Clone)]
pub struct FieldGrid {
    dim: Dim3,
    values: Vec<f32>,
}

impl FieldGrid {
    pub fn new(dim: Dim3, fill: f32) -> Self {
        Self { dim, values: vec![fill; dim.voxel_count()] }
    }

    /// Builds a field from a static profile: `base - gradient_x * x`, floored at `min_value`.
    pub fn from_profile(dim: Dim3, profile: &FieldProfileConfig) -> Self {
        let mut grid = Self::new(dim, 0.0);
        for z in 0..dim.z {
            for y in 0..dim.y {
                for x in 0..dim.x {
                    let value = (profile.base_value - profile.gradient_x * x as f32).max(profile.min_value);
                    grid.values[(z * dim.y + y) * dim.x + x] = value;
                }
            }
        }
        grid
    }

    #[inline(always)]
    pub fn dimensions(&self) -> Dim3 {
        self.dim
    }

    // Calculates the 1D storage index for a voxel, or None outside the field.
    #[inline(always)]
    fn linear_index(&self, x: i64, y: i64, z: i64) -> Option<usize> {
        if !self.dim.contains(x, y, z) {
            return None;
        }
        Some(((z as usize) * self.dim.y + y as usize) * self.dim.x + x as usize)
    }

    /// Value at voxel `(x, y, z)`; `None` when the voxel lies outside the field.
    #[inline(always)]
    pub fn value_at(&self, x: i64, y: i64, z: i64) -> Option<f32> {
        self.linear_index(x, y, z).and_then(|idx| self.values.get(idx).copied())
    }

    /// Overwrites one voxel; returns false (and changes nothing) when out of range.
    pub fn set(&mut self, x: i64, y: i64, z: i64, value: f32) -> bool {
        match self.linear_index(x, y, z) {
            Some(idx) => {
                self.values[idx] = value;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, value: f32) {
        self.values.iter_mut().for_each(|v| *v = value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_at_respects_bounds() {
        let mut grid = FieldGrid::new(Dim3::new(4, 3, 2), 1.5);
        assert!(grid.set(3, 2, 1, 9.0));
        assert_eq!(grid.value_at(3, 2, 1), Some(9.0));
        assert_eq!(grid.value_at(0, 0, 0), Some(1.5));
        assert_eq!(grid.value_at(4, 0, 0), None);
        assert_eq!(grid.value_at(0, 3, 0), None);
        assert_eq!(grid.value_at(0, 0, -1), None);
        assert!(!grid.set(-1, 0, 0, 2.0));
    }

    #[test]
    fn profile_decreases_along_x_and_is_floored() {
        let profile = FieldProfileConfig {
            name: "o2".into(),
            base_value: 10.0,
            gradient_x: 4.0,
            min_value: 1.0,
        };
        let grid = FieldGrid::from_profile(Dim3::new(4, 2, 1), &profile);
        assert_eq!(grid.value_at(0, 1, 0), Some(10.0));
        assert_eq!(grid.value_at(1, 1, 0), Some(6.0));
        assert_eq!(grid.value_at(2, 0, 0), Some(2.0));
        assert_eq!(grid.value_at(3, 0, 0), Some(1.0));
    }
}
