use crate::cell::CellId;
use crate::lattice::Lattice;
use log::{debug, info};
use rand::seq::index;
use rand::Rng;
use simulation_common::{MutationConfig, MutationStats};

/// Periodic random phenotype reassignment, independent of the environment.
///
/// Every `interval` steps once `delay` has passed, a fraction `percentage` of the
/// non-necrotic cells (at least one) is sampled without replacement and each picked
/// cell moves to one of its two other viable phenotypes, chosen uniformly.
#[derive(Debug)]
pub struct MutationModel {
    params: MutationConfig,
    mutation_count: u32,
    last_step: u32,
    initialized: bool,
}

impl MutationModel {
    pub fn new(params: MutationConfig) -> Self {
        Self { params, mutation_count: 0, last_step: 0, initialized: false }
    }

    pub fn start(&mut self) {
        self.initialized = true;
        info!(
            "Mutation model initialized: {:.1}% of eligible cells every {} MCS after MCS {}.",
            self.params.percentage * 100.0,
            self.params.interval,
            self.params.delay
        );
    }

    /// Whether a mutation pass runs at `mcs`.
    pub fn is_due(&self, mcs: u32) -> bool {
        self.params.interval > 0 && mcs >= self.params.delay && mcs % self.params.interval == 0
    }

    /// Number of cells mutated in a pass over `eligible` cells.
    pub fn sample_size(&self, eligible: usize) -> usize {
        if eligible == 0 {
            return 0;
        }
        let scaled = (eligible as f64 * self.params.percentage).floor() as usize;
        let cap = self.params.max_per_pass.map_or(usize::MAX, |cap| cap as usize);
        scaled.max(1).min(eligible).min(cap)
    }

    /// Runs a pass if one is due. Returns the ids of the mutated cells.
    pub fn step<L: Lattice + ?Sized, R: Rng>(&mut self, lattice: &mut L, rng: &mut R) -> Vec<CellId> {
        let mcs = lattice.current_step();
        if !self.initialized || !self.is_due(mcs) {
            return Vec::new();
        }
        self.last_step = mcs;

        let eligible: Vec<CellId> = lattice
            .live_cells()
            .into_iter()
            .filter(|&id| lattice.cell(id).is_some_and(|c| !c.phenotype.is_necrotic()))
            .collect();
        let amount = self.sample_size(eligible.len());
        if amount == 0 {
            debug!("MCS {}: no eligible cells for mutation.", mcs);
            return Vec::new();
        }

        let mut mutated = Vec::with_capacity(amount);
        for i in index::sample(rng, eligible.len(), amount).into_iter() {
            let id = eligible[i];
            let Some(cell) = lattice.cell_mut(id) else {
                continue;
            };
            let Some(alternatives) = cell.phenotype.alternatives() else {
                continue;
            };
            let old = cell.phenotype;
            cell.phenotype = alternatives[rng.random_range(0..alternatives.len())];
            debug!("Cell {} mutated {} -> {}", id, old, cell.phenotype);
            mutated.push(id);
        }
        self.mutation_count += mutated.len() as u32;
        info!("MCS {}: {} of {} eligible cells mutated.", mcs, mutated.len(), eligible.len());
        mutated
    }

    pub fn mutation_count(&self) -> u32 {
        self.mutation_count
    }

    /// Random-mutation tally; forced switches are filled in by the caller.
    pub fn stats(&self) -> MutationStats {
        MutationStats { random_mutations: self.mutation_count, forced_switches: 0, step: self.last_step }
    }
}
