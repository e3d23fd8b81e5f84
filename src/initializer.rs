use crate::lattice::Lattice;
use log::{debug, info};
use simulation_common::VolumeConfig;

/// Assigns the initial volume constraint to every seed cell, exactly once per run.
#[derive(Debug)]
pub struct ConstraintInitializer {
    params: VolumeConfig,
    initialized: bool,
}

impl ConstraintInitializer {
    pub fn new(params: VolumeConfig) -> Self {
        Self { params, initialized: false }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Non-necrotic cells get the initial target/lambda pair, necrotic cells the
    /// necrotic pair. A second call is a no-op.
    pub fn start<L: Lattice + ?Sized>(&mut self, lattice: &mut L) {
        if self.initialized {
            info!("Constraint initializer already ran; skipping.");
            return;
        }

        for id in lattice.live_cells() {
            let Some(cell) = lattice.cell_mut(id) else {
                continue;
            };
            if cell.phenotype.is_necrotic() {
                cell.target_volume = self.params.initial_necrotic_target_volume;
                cell.lambda_volume = self.params.initial_necrotic_lambda_volume;
            } else {
                cell.target_volume = self.params.initial_target_volume;
                cell.lambda_volume = self.params.initial_lambda_volume;
            }
            debug!(
                "Cell {} ({}): target volume {}, lambda {}",
                cell.id, cell.phenotype, cell.target_volume, cell.lambda_volume
            );
        }

        self.initialized = true;
        info!("Constraint initializer completed.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Dim3;
    use crate::lattice::CpuLattice;
    use simulation_common::{Phenotype, Vec3};

    #[test]
    fn assigns_constraints_by_phenotype() {
        let mut lattice = CpuLattice::new(Dim3::new(4, 4, 1));
        let live = lattice.add_cell(Phenotype::Invasive, 10.0, Vec3::zero());
        let dead = lattice.add_cell(Phenotype::Necrotic, 10.0, Vec3::zero());
        let mut init = ConstraintInitializer::new(VolumeConfig::default());
        init.start(&mut lattice);

        let live = lattice.cell(live).unwrap();
        assert_eq!((live.target_volume, live.lambda_volume), (32.0, 2.0));
        let dead = lattice.cell(dead).unwrap();
        assert_eq!((dead.target_volume, dead.lambda_volume), (20.0, 50.0));
    }

    #[test]
    fn second_start_is_a_no_op() {
        let mut lattice = CpuLattice::new(Dim3::new(4, 4, 1));
        let id = lattice.add_cell(Phenotype::Proliferative, 10.0, Vec3::zero());
        let mut init = ConstraintInitializer::new(VolumeConfig::default());
        init.start(&mut lattice);
        assert!(init.is_initialized());

        lattice.cell_mut(id).unwrap().target_volume = 47.0;
        init.start(&mut lattice);
        assert_eq!(lattice.cell(id).unwrap().target_volume, 47.0);
    }
}
