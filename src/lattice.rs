use crate::cell::{Cell, CellId};
use crate::grid::{Dim3, FieldGrid};
use anyhow::Result;
use rand::Rng;
use simulation_common::{clamp, LatticeConfig, Phenotype, Vec3};
use std::collections::HashMap;

/// Opaque handle to a named field, resolved once and cached by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle(usize);

/// What the phenotype engine needs from the lattice/field engine.
///
/// The engine owns geometry, cell storage and the chemical fields; the phenotype
/// components only read fields, rewrite cell attributes and request divisions.
pub trait Lattice {
    /// Looks up a field by (case-insensitive) name.
    fn resolve_field(&self, name: &str) -> Option<FieldHandle>;
    fn field(&self, handle: FieldHandle) -> Option<&FieldGrid>;
    /// Ids of the live cells for the current step, in the engine's enumeration order.
    fn live_cells(&self) -> Vec<CellId>;
    fn cell(&self, id: CellId) -> Option<&Cell>;
    fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell>;
    /// Splits `id` into itself and a new daughter. `update_attributes` is called with
    /// `(parent, daughter)` before the daughter is inserted.
    fn divide(&mut self, id: CellId, update_attributes: &mut dyn FnMut(&mut Cell, &mut Cell)) -> Result<CellId>;
    fn current_step(&self) -> u32;
}

/// In-memory lattice holding cells and static fields.
///
/// Stands in for the Potts/PDE engine in the driver and in tests: it relaxes
/// volumes toward target volumes instead of minimizing an energy, and its
/// fields only change when written explicitly.
#[derive(Debug)]
pub struct CpuLattice {
    dim: Dim3,
    // Cells in enumeration order; `index` maps ids to positions in this vec.
    cells: Vec<Cell>,
    index: HashMap<CellId, usize>,
    fields: Vec<(String, FieldGrid)>,
    next_id: CellId,
    step: u32,
}

impl CpuLattice {
    pub fn new(dim: Dim3) -> Self {
        Self {
            dim,
            cells: Vec::new(),
            index: HashMap::new(),
            fields: Vec::new(),
            next_id: 1,
            step: 0,
        }
    }

    /// Builds a lattice from config: static field profiles plus randomly placed seed cells
    /// clustered around the lattice center.
    pub fn from_config<R: Rng>(config: &LatticeConfig, initial_volume: f32, rng: &mut R) -> Self {
        let dim = Dim3::new(config.dim_x as usize, config.dim_y as usize, config.dim_z as usize);
        let mut lattice = Self::new(dim);

        for profile in &config.fields {
            lattice.insert_field(&profile.name, FieldGrid::from_profile(dim, profile));
        }

        // Seed cells inside the central half of the lattice in x and y.
        let (cx, cy, cz) = (dim.x as f32 / 2.0, dim.y as f32 / 2.0, dim.z as f32 / 2.0);
        let (hx, hy) = ((dim.x as f32 / 4.0).max(0.5), (dim.y as f32 / 4.0).max(0.5));
        for _ in 0..config.num_cells_initial {
            let x = rng.random_range(cx - hx..cx + hx);
            let y = rng.random_range(cy - hy..cy + hy);
            lattice.add_cell(config.initial_phenotype, initial_volume, Vec3::new(x, y, cz));
        }
        log::info!(
            "Lattice {}x{}x{} seeded with {} cells and {} fields.",
            dim.x, dim.y, dim.z, lattice.cells.len(), lattice.fields.len()
        );
        lattice
    }

    pub fn dimensions(&self) -> Dim3 {
        self.dim
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Adds a cell at the end of the enumeration order and returns its fresh id.
    pub fn add_cell(&mut self, phenotype: Phenotype, volume: f32, position: Vec3) -> CellId {
        let id = self.next_id;
        self.next_id += 1;
        self.index.insert(id, self.cells.len());
        self.cells.push(Cell::new(id, phenotype, volume, position));
        id
    }

    /// Removes a cell (the engine-side deletion path). Ids are never handed out again.
    pub fn remove_cell(&mut self, id: CellId) -> Option<Cell> {
        let idx = self.index.remove(&id)?;
        let removed = self.cells.remove(idx);
        for (pos, cell) in self.cells.iter().enumerate().skip(idx) {
            self.index.insert(cell.id, pos);
        }
        Some(removed)
    }

    /// Inserts or replaces a field. Names are stored lowercase.
    pub fn insert_field(&mut self, name: &str, grid: FieldGrid) {
        let key = name.to_ascii_lowercase();
        match self.fields.iter_mut().find(|(n, _)| *n == key) {
            Some(entry) => entry.1 = grid,
            None => self.fields.push((key, grid)),
        }
    }

    pub fn field_by_name_mut(&mut self, name: &str) -> Option<&mut FieldGrid> {
        let key = name.to_ascii_lowercase();
        self.fields.iter_mut().find(|(n, _)| *n == key).map(|(_, grid)| grid)
    }

    /// Moves every cell's volume a fraction `rate` of the way toward its target volume.
    pub fn relax_volumes(&mut self, rate: f32) {
        for cell in &mut self.cells {
            cell.volume += (cell.target_volume - cell.volume) * rate;
        }
    }

    pub fn advance_step(&mut self) {
        self.step += 1;
    }
}

impl Lattice for CpuLattice {
    fn resolve_field(&self, name: &str) -> Option<FieldHandle> {
        let key = name.to_ascii_lowercase();
        self.fields.iter().position(|(n, _)| *n == key).map(FieldHandle)
    }

    fn field(&self, handle: FieldHandle) -> Option<&FieldGrid> {
        self.fields.get(handle.0).map(|(_, grid)| grid)
    }

    fn live_cells(&self) -> Vec<CellId> {
        self.cells.iter().map(|c| c.id).collect()
    }

    fn cell(&self, id: CellId) -> Option<&Cell> {
        self.index.get(&id).and_then(|&idx| self.cells.get(idx))
    }

    fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        let idx = *self.index.get(&id)?;
        self.cells.get_mut(idx)
    }

    fn divide(&mut self, id: CellId, update_attributes: &mut dyn FnMut(&mut Cell, &mut Cell)) -> Result<CellId> {
        let idx = *self
            .index
            .get(&id)
            .ok_or_else(|| anyhow::anyhow!("cell {} is not on the lattice", id))?;
        let daughter_id = self.next_id;
        let max = |extent: usize| (extent as f32 - 1.0).max(0.0);

        let parent = &mut self.cells[idx];
        let offset = parent.position.add(Vec3::new(0.5, 0.0, 0.0));
        let daughter_pos = Vec3::new(
            clamp(offset.x, 0.0, max(self.dim.x)),
            clamp(offset.y, 0.0, max(self.dim.y)),
            clamp(offset.z, 0.0, max(self.dim.z)),
        );
        let half = parent.volume / 2.0;
        parent.volume -= half;
        let mut daughter = Cell::new(daughter_id, parent.phenotype, half, daughter_pos);
        update_attributes(parent, &mut daughter);

        self.next_id += 1;
        self.index.insert(daughter_id, self.cells.len());
        self.cells.push(daughter);
        log::trace!("Cell {} divided into daughter {}", id, daughter_id);
        Ok(daughter_id)
    }

    fn current_step(&self) -> u32 {
        self.step
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Wraps a [`CpuLattice`] and enumerates one extra id, first, that the lattice cannot resolve.
    pub(crate) struct DanglingIdLattice {
        pub inner: CpuLattice,
        pub dangling: CellId,
    }

    impl DanglingIdLattice {
        pub fn new(inner: CpuLattice) -> Self {
            Self { inner, dangling: 9_999 }
        }
    }

    impl Lattice for DanglingIdLattice {
        fn resolve_field(&self, name: &str) -> Option<FieldHandle> {
            self.inner.resolve_field(name)
        }

        fn field(&self, handle: FieldHandle) -> Option<&FieldGrid> {
            self.inner.field(handle)
        }

        fn live_cells(&self) -> Vec<CellId> {
            let mut ids = vec![self.dangling];
            ids.extend(self.inner.live_cells());
            ids
        }

        fn cell(&self, id: CellId) -> Option<&Cell> {
            self.inner.cell(id)
        }

        fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
            self.inner.cell_mut(id)
        }

        fn divide(&mut self, id: CellId, update_attributes: &mut dyn FnMut(&mut Cell, &mut Cell)) -> Result<CellId> {
            self.inner.divide(id, update_attributes)
        }

        fn current_step(&self) -> u32 {
            self.inner.current_step()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ids_are_never_reused_after_removal() {
        let mut lattice = CpuLattice::new(Dim3::new(10, 10, 1));
        let a = lattice.add_cell(Phenotype::Proliferative, 30.0, Vec3::zero());
        let b = lattice.add_cell(Phenotype::Reserve, 30.0, Vec3::zero());
        assert!(lattice.remove_cell(a).is_some());
        let c = lattice.add_cell(Phenotype::Invasive, 30.0, Vec3::zero());
        assert_ne!(c, a);
        assert_eq!(lattice.live_cells(), vec![b, c]);
        assert_eq!(lattice.cell(c).map(|cell| cell.phenotype), Some(Phenotype::Invasive));
        assert!(lattice.cell(a).is_none());
    }

    #[test]
    fn divide_invokes_hook_and_appends_daughter() {
        let mut lattice = CpuLattice::new(Dim3::new(10, 10, 1));
        let parent = lattice.add_cell(Phenotype::Reserve, 70.0, Vec3::new(9.8, 2.0, 0.0));
        lattice.cell_mut(parent).unwrap().target_volume = 80.0;

        let mut calls = 0;
        let daughter = lattice
            .divide(parent, &mut |p: &mut Cell, d: &mut Cell| {
                calls += 1;
                p.target_volume /= 2.0;
                d.inherit_from(p);
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(lattice.live_cells(), vec![parent, daughter]);
        let (p, d) = (lattice.cell(parent).unwrap(), lattice.cell(daughter).unwrap());
        assert_eq!(p.volume + d.volume, 70.0);
        assert_eq!(p.target_volume, 40.0);
        assert_eq!(d.target_volume, 40.0);
        assert_eq!(d.phenotype, Phenotype::Reserve);
        assert!(d.position.x <= 9.0);
    }

    #[test]
    fn divide_unknown_cell_fails() {
        let mut lattice = CpuLattice::new(Dim3::new(4, 4, 1));
        assert!(lattice.divide(99, &mut |_: &mut Cell, _: &mut Cell| {}).is_err());
        assert_eq!(lattice.cell_count(), 0);
    }

    #[test]
    fn fields_resolve_case_insensitively() {
        let mut lattice = CpuLattice::new(Dim3::new(2, 2, 1));
        lattice.insert_field("O2", FieldGrid::new(Dim3::new(2, 2, 1), 100.0));
        let handle = lattice.resolve_field("o2").unwrap();
        assert_eq!(lattice.field(handle).unwrap().value_at(1, 1, 0), Some(100.0));
        assert!(lattice.resolve_field("glc").is_none());
    }

    #[test]
    fn from_config_places_cells_inside_lattice() {
        let config = LatticeConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let lattice = CpuLattice::from_config(&config, 32.0, &mut rng);
        assert_eq!(lattice.cell_count(), config.num_cells_initial as usize);
        for cell in lattice.cells() {
            let (x, y, z) = cell.position.truncate().unwrap();
            assert!(lattice.dimensions().contains(x, y, z));
            assert_eq!(cell.volume, 32.0);
        }
        assert!(lattice.resolve_field("h3o").is_some());
    }

    #[test]
    fn relax_volumes_moves_toward_target() {
        let mut lattice = CpuLattice::new(Dim3::new(2, 2, 1));
        let id = lattice.add_cell(Phenotype::Proliferative, 10.0, Vec3::zero());
        lattice.cell_mut(id).unwrap().target_volume = 20.0;
        lattice.relax_volumes(0.5);
        assert_eq!(lattice.cell(id).unwrap().volume, 15.0);
        lattice.advance_step();
        assert_eq!(lattice.current_step(), 1);
    }
}
