use crate::cell::Cell;
use crate::lattice::{FieldHandle, Lattice};
use log::{debug, warn};
use simulation_common::FieldNamesConfig;
use std::collections::{HashMap, HashSet};

/// Local concentrations at one cell for one step. Never stored across steps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetabolicSample {
    pub o2: f32,
    pub glucose: f32,
    pub lactate: f32,
    /// H3O+ concentration, the pH proxy.
    pub h3o: f32,
}

/// Reads named scalar fields at a cell's position.
///
/// Coordinates are truncated toward zero. Absent fields, non-finite positions and
/// voxels outside the field all yield the configured default instead of an error.
#[derive(Debug)]
pub struct FieldSampler {
    names: FieldNamesConfig,
    handles: HashMap<String, FieldHandle>,
    reported_missing: HashSet<String>,
}

impl FieldSampler {
    pub fn new(names: FieldNamesConfig) -> Self {
        Self {
            names,
            handles: HashMap::new(),
            reported_missing: HashSet::new(),
        }
    }

    pub fn default_value(&self) -> f32 {
        self.names.default_value
    }

    pub fn names(&self) -> &FieldNamesConfig {
        &self.names
    }

    /// Resolves (and caches) a field handle. Missing fields are reported once per name.
    fn handle<L: Lattice + ?Sized>(&mut self, lattice: &L, field_name: &str) -> Option<FieldHandle> {
        let key = field_name.to_ascii_lowercase();
        if let Some(handle) = self.handles.get(&key) {
            return Some(*handle);
        }
        match lattice.resolve_field(&key) {
            Some(handle) => {
                self.handles.insert(key, handle);
                Some(handle)
            }
            None => {
                if self.reported_missing.insert(key.clone()) {
                    warn!("Field '{}' is not available; sampling it yields {}", key, self.names.default_value);
                }
                None
            }
        }
    }

    /// True if the lattice currently provides `field_name`.
    pub fn has_field<L: Lattice + ?Sized>(&mut self, lattice: &L, field_name: &str) -> bool {
        self.handle(lattice, field_name).is_some()
    }

    /// Value of `field_name` at the voxel containing `cell`'s center of mass.
    pub fn sample<L: Lattice + ?Sized>(&mut self, lattice: &L, cell: &Cell, field_name: &str) -> f32 {
        let default = self.names.default_value;
        let Some(handle) = self.handle(lattice, field_name) else {
            return default;
        };
        let Some(field) = lattice.field(handle) else {
            return default;
        };
        let Some((x, y, z)) = cell.position.truncate() else {
            debug!("Cell {} has a non-finite position; using default for '{}'", cell.id, field_name);
            return default;
        };
        match field.value_at(x, y, z) {
            Some(value) => value,
            None => {
                debug!("Cell {} at ({}, {}, {}) lies outside field '{}'", cell.id, x, y, z, field_name);
                default
            }
        }
    }

    /// Samples O2, glucose, lactate and H3O+ for one cell.
    pub fn sample_metabolic<L: Lattice + ?Sized>(&mut self, lattice: &L, cell: &Cell) -> MetabolicSample {
        let names = self.names.clone();
        MetabolicSample {
            o2: self.sample(lattice, cell, &names.oxygen),
            glucose: self.sample(lattice, cell, &names.glucose),
            lactate: self.sample(lattice, cell, &names.lactate),
            h3o: self.sample(lattice, cell, &names.hydronium),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Dim3, FieldGrid};
    use crate::lattice::CpuLattice;
    use simulation_common::{Phenotype, Vec3};

    fn lattice_with_o2() -> CpuLattice {
        let dim = Dim3::new(4, 4, 1);
        let mut lattice = CpuLattice::new(dim);
        let mut o2 = FieldGrid::new(dim, 50.0);
        o2.set(0, 0, 0, 11.0);
        o2.set(2, 3, 0, 33.0);
        lattice.insert_field("o2", o2);
        lattice
    }

    #[test]
    fn coordinates_are_truncated_not_rounded() {
        let mut lattice = lattice_with_o2();
        let id = lattice.add_cell(Phenotype::Proliferative, 30.0, Vec3::new(2.99, 3.7, 0.4));
        let mut sampler = FieldSampler::new(FieldNamesConfig::default());
        let cell = lattice.cell(id).unwrap();
        assert_eq!(sampler.sample(&lattice, cell, "o2"), 33.0);
    }

    #[test]
    fn small_negative_coordinates_truncate_to_zero() {
        let mut lattice = lattice_with_o2();
        let id = lattice.add_cell(Phenotype::Proliferative, 30.0, Vec3::new(-0.5, -0.9, 0.0));
        let mut sampler = FieldSampler::new(FieldNamesConfig::default());
        assert_eq!(sampler.sample(&lattice, lattice.cell(id).unwrap(), "o2"), 11.0);
    }

    #[test]
    fn out_of_bounds_and_missing_fields_yield_default() {
        let mut lattice = lattice_with_o2();
        let outside = lattice.add_cell(Phenotype::Proliferative, 30.0, Vec3::new(4.0, 1.0, 0.0));
        let nan = lattice.add_cell(Phenotype::Proliferative, 30.0, Vec3::new(f32::NAN, 1.0, 0.0));
        let inside = lattice.add_cell(Phenotype::Proliferative, 30.0, Vec3::new(1.0, 1.0, 0.0));
        let mut names = FieldNamesConfig::default();
        names.default_value = -1.0;
        let mut sampler = FieldSampler::new(names);

        assert_eq!(sampler.sample(&lattice, lattice.cell(outside).unwrap(), "o2"), -1.0);
        assert_eq!(sampler.sample(&lattice, lattice.cell(nan).unwrap(), "o2"), -1.0);
        assert_eq!(sampler.sample(&lattice, lattice.cell(inside).unwrap(), "glc"), -1.0);
        assert!(!sampler.has_field(&lattice, "glc"));
        assert!(sampler.has_field(&lattice, "O2"));
    }

    #[test]
    fn metabolic_sample_reads_all_four_fields() {
        let dim = Dim3::new(2, 2, 1);
        let mut lattice = CpuLattice::new(dim);
        lattice.insert_field("o2", FieldGrid::new(dim, 200.0));
        lattice.insert_field("glc", FieldGrid::new(dim, 12.0));
        lattice.insert_field("lac", FieldGrid::new(dim, 2.0));
        lattice.insert_field("h3o", FieldGrid::new(dim, 7.2));
        let id = lattice.add_cell(Phenotype::Reserve, 30.0, Vec3::new(1.0, 1.0, 0.0));
        let mut sampler = FieldSampler::new(FieldNamesConfig::default());
        let sample = sampler.sample_metabolic(&lattice, lattice.cell(id).unwrap());
        assert_eq!(sample, MetabolicSample { o2: 200.0, glucose: 12.0, lactate: 2.0, h3o: 7.2 });
    }
}
