use crate::cell::CellId;
use crate::environment::EnvironmentClassifier;
use crate::field_sampler::FieldSampler;
use crate::lattice::Lattice;
use anyhow::Result;
use log::{error, info, trace, warn};
use simulation_common::{
    DeathConfig, DeathStats, EnvironmentConfig, FieldNamesConfig, Phenotype, VolumeConfig,
};
use std::collections::{HashMap, HashSet};

/// Accumulates per-cell exposure to critical conditions and turns cells necrotic
/// once the exposure counter reaches the death threshold.
///
/// Stress adds `damage_increment` per step, recovery removes `recovery_decrement`.
/// Stressed invasive cells sitting in toxic lactate get `invasive_relief` taken off
/// instead of accruing damage. Counters never go below zero.
#[derive(Debug)]
pub struct DeathModel {
    params: DeathConfig,
    volume: VolumeConfig,
    sampler: FieldSampler,
    env: EnvironmentClassifier,
    counters: HashMap<CellId, u32>,
    death_count: u32,
    last_step: u32,
    initialized: bool,
}

impl DeathModel {
    pub fn new(
        params: DeathConfig,
        volume: VolumeConfig,
        fields: FieldNamesConfig,
        environment: EnvironmentConfig,
    ) -> Self {
        Self {
            params,
            volume,
            sampler: FieldSampler::new(fields),
            env: EnvironmentClassifier::new(environment),
            counters: HashMap::new(),
            death_count: 0,
            last_step: 0,
            initialized: false,
        }
    }

    pub fn start<L: Lattice + ?Sized>(&mut self, lattice: &L) {
        if self.initialized {
            return;
        }
        let oxygen = self.sampler.names().oxygen.clone();
        if !self.sampler.has_field(lattice, &oxygen) {
            error!("Field '{}' not available; death model disabled for this run.", oxygen);
            return;
        }
        self.initialized = true;
        info!("Death model initialized.");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the ids of cells that became necrotic this step.
    pub fn step<L: Lattice + ?Sized>(&mut self, lattice: &mut L) -> Vec<CellId> {
        let mcs = lattice.current_step();
        if !self.initialized || mcs < self.params.delay {
            return Vec::new();
        }
        self.last_step = mcs;

        let live = lattice.live_cells();
        let live_set: HashSet<CellId> = live.iter().copied().collect();
        self.counters.retain(|id, _| live_set.contains(id));

        let mut died = Vec::new();
        for id in live {
            match self.update_cell(lattice, id) {
                Ok(true) => died.push(id),
                Ok(false) => {}
                Err(e) => warn!("Death update skipped for cell {}: {}", id, e),
            }
        }
        died
    }

    /// Updates one cell's exposure counter. Returns true if the cell died.
    fn update_cell<L: Lattice + ?Sized>(&mut self, lattice: &mut L, id: CellId) -> Result<bool> {
        let cell = lattice
            .cell(id)
            .ok_or_else(|| anyhow::anyhow!("cell {} is not on the lattice", id))?;
        if cell.phenotype.is_necrotic() {
            self.counters.remove(&id);
            return Ok(false);
        }
        let phenotype = cell.phenotype;
        let sample = self.sampler.sample_metabolic(&*lattice, cell);

        let counter = self.counters.entry(id).or_insert(0);
        if self.env.is_stressed(&sample) {
            if phenotype == Phenotype::Invasive && self.env.is_toxic_lactate(&sample) {
                *counter = counter.saturating_sub(self.params.invasive_relief);
            } else {
                *counter += self.params.damage_increment;
            }
            trace!(
                "Cell {} stressed (O2={:.2}, GLC={:.2}, LAC={:.2}, acidic={}), counter {}",
                id, sample.o2, sample.glucose, sample.lactate, self.env.is_acidic(&sample), counter
            );
        } else if self.env.is_recovering(&sample) {
            *counter = counter.saturating_sub(self.params.recovery_decrement);
        }

        if *counter < self.params.threshold {
            return Ok(false);
        }

        let cell = lattice
            .cell_mut(id)
            .ok_or_else(|| anyhow::anyhow!("cell {} vanished during death update", id))?;
        cell.phenotype = Phenotype::Necrotic;
        cell.target_volume = self.volume.necrotic_target_volume;
        cell.lambda_volume = self.volume.necrotic_lambda_volume;
        self.counters.remove(&id);
        self.death_count += 1;
        info!("Cell {} died at MCS {}", id, lattice.current_step());
        Ok(true)
    }

    /// Current exposure counter of a tracked cell.
    pub fn counter(&self, id: CellId) -> Option<u32> {
        self.counters.get(&id).copied()
    }

    pub fn tracked_cells(&self) -> usize {
        self.counters.len()
    }

    pub fn death_count(&self) -> u32 {
        self.death_count
    }

    pub fn stats(&self) -> DeathStats {
        DeathStats { total_deaths: self.death_count, step: self.last_step }
    }
}
