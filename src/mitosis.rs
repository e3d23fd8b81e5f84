use crate::cell::{Cell, CellId};
use crate::lattice::Lattice;
use log::{info, warn};
use simulation_common::MitosisConfig;

/// Splits every non-necrotic cell whose volume exceeds the mitosis threshold.
///
/// Candidates are collected in the lattice's enumeration order before any split
/// happens, so daughters created this step are not considered until the next one.
#[derive(Debug)]
pub struct DivisionPolicy {
    params: MitosisConfig,
    initialized: bool,
    division_count: u32,
}

impl DivisionPolicy {
    pub fn new(params: MitosisConfig) -> Self {
        Self { params, initialized: false, division_count: 0 }
    }

    pub fn start(&mut self) {
        self.initialized = true;
        info!("Division policy initialized.");
    }

    /// Total divisions performed since the start of the run.
    pub fn division_count(&self) -> u32 {
        self.division_count
    }

    /// Cells due for division this step, in enumeration order, capped if configured.
    pub fn collect_candidates<L: Lattice + ?Sized>(&self, lattice: &L) -> Vec<CellId> {
        let limit = self
            .params
            .max_divisions_per_step
            .map_or(usize::MAX, |cap| cap as usize);
        lattice
            .live_cells()
            .into_iter()
            .filter(|&id| {
                lattice
                    .cell(id)
                    .is_some_and(|c| !c.phenotype.is_necrotic() && c.volume > self.params.volume_threshold)
            })
            .take(limit)
            .collect()
    }

    /// Returns the ids of the daughters created this step.
    pub fn step<L: Lattice + ?Sized>(&mut self, lattice: &mut L) -> Vec<CellId> {
        let mcs = lattice.current_step();
        if !self.initialized || mcs < self.params.init_delay {
            return Vec::new();
        }

        let mut daughters = Vec::new();
        for parent in self.collect_candidates(&*lattice) {
            // Halve the parent's target before the split, then copy it onto the daughter.
            let result = lattice.divide(parent, &mut |parent_cell: &mut Cell, daughter_cell: &mut Cell| {
                parent_cell.target_volume /= 2.0;
                daughter_cell.inherit_from(parent_cell);
            });
            match result {
                Ok(daughter) => {
                    self.division_count += 1;
                    daughters.push(daughter);
                    info!("Division: cell {} -> daughter {} at MCS {}", parent, daughter, mcs);
                }
                Err(e) => warn!("Division failed for cell {}: {}", parent, e),
            }
        }
        daughters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Dim3;
    use crate::lattice::CpuLattice;
    use simulation_common::{Phenotype, Vec3};

    fn big_cell(lattice: &mut CpuLattice, phenotype: Phenotype, volume: f32, target: f32) -> CellId {
        let id = lattice.add_cell(phenotype, volume, Vec3::new(2.0, 2.0, 0.0));
        let cell = lattice.cell_mut(id).unwrap();
        cell.target_volume = target;
        cell.lambda_volume = 2.0;
        id
    }

    fn started(params: MitosisConfig) -> DivisionPolicy {
        let mut policy = DivisionPolicy::new(params);
        policy.start();
        policy
    }

    #[test]
    fn division_conserves_target_volume_and_copies_attributes() {
        let mut lattice = CpuLattice::new(Dim3::new(8, 8, 1));
        let parent = big_cell(&mut lattice, Phenotype::Invasive, 65.0, 67.3);
        for _ in 0..7 {
            lattice.advance_step();
        }
        let mut policy = started(MitosisConfig::default());

        let daughters = policy.step(&mut lattice);
        assert_eq!(daughters.len(), 1);
        let p = lattice.cell(parent).unwrap();
        let d = lattice.cell(daughters[0]).unwrap();
        assert!((p.target_volume + d.target_volume - 67.3).abs() < 1e-4);
        assert_eq!(p.target_volume, d.target_volume);
        assert_eq!(d.phenotype, Phenotype::Invasive);
        assert_eq!(d.lambda_volume, 2.0);
        assert_eq!(policy.division_count(), 1);
    }

    #[test]
    fn no_divisions_before_init_delay() {
        let mut lattice = CpuLattice::new(Dim3::new(8, 8, 1));
        big_cell(&mut lattice, Phenotype::Proliferative, 80.0, 80.0);
        let mut policy = started(MitosisConfig::default());
        for _ in 0..7 {
            assert!(policy.step(&mut lattice).is_empty());
            lattice.advance_step();
        }
        assert_eq!(policy.step(&mut lattice).len(), 1);
    }

    #[test]
    fn necrotic_and_small_cells_are_skipped() {
        let mut lattice = CpuLattice::new(Dim3::new(8, 8, 1));
        big_cell(&mut lattice, Phenotype::Necrotic, 90.0, 25.0);
        big_cell(&mut lattice, Phenotype::Reserve, 64.0, 64.0);
        let params = MitosisConfig { init_delay: 0, ..MitosisConfig::default() };
        let mut policy = started(params);
        assert!(policy.step(&mut lattice).is_empty());
        assert_eq!(lattice.cell_count(), 2);
    }

    #[test]
    fn cap_follows_enumeration_order() {
        let mut lattice = CpuLattice::new(Dim3::new(8, 8, 1));
        let small_first = big_cell(&mut lattice, Phenotype::Proliferative, 65.0, 65.0);
        let large_second = big_cell(&mut lattice, Phenotype::Proliferative, 99.0, 99.0);
        let params = MitosisConfig { init_delay: 0, max_divisions_per_step: Some(1), ..MitosisConfig::default() };
        let policy = started(params);
        assert_eq!(policy.collect_candidates(&lattice), vec![small_first]);
        assert_ne!(policy.collect_candidates(&lattice), vec![large_second]);
    }

    #[test]
    fn uninitialized_policy_does_nothing() {
        let mut lattice = CpuLattice::new(Dim3::new(8, 8, 1));
        big_cell(&mut lattice, Phenotype::Proliferative, 80.0, 80.0);
        let mut policy = DivisionPolicy::new(MitosisConfig { init_delay: 0, ..MitosisConfig::default() });
        assert!(policy.step(&mut lattice).is_empty());
    }
}
