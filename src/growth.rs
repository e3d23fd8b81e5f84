use crate::cell::CellId;
use crate::environment::EnvironmentClassifier;
use crate::field_sampler::{FieldSampler, MetabolicSample};
use crate::lattice::Lattice;
use anyhow::Result;
use log::{error, info, warn};
use simulation_common::{EnvironmentConfig, FieldNamesConfig, GrowthConfig, GrowthRecord, Phenotype};

/// Turns the local microenvironment into a per-step target-volume increment.
///
/// Growth only happens in an optimal environment. The increment is a phenotype
/// base rate scaled by Michaelis-Menten factors for glucose and O2 and an
/// inhibition factor for lactate, clamped to `max_growth_per_step`.
#[derive(Debug)]
pub struct GrowthModel {
    params: GrowthConfig,
    sampler: FieldSampler,
    env: EnvironmentClassifier,
    records: Vec<GrowthRecord>,
    log_records: bool,
    initialized: bool,
}

impl GrowthModel {
    pub fn new(params: GrowthConfig, fields: FieldNamesConfig, environment: EnvironmentConfig) -> Self {
        Self {
            params,
            sampler: FieldSampler::new(fields),
            env: EnvironmentClassifier::new(environment),
            records: Vec::new(),
            log_records: true,
            initialized: false,
        }
    }

    /// Enables or disables collection of per-cell [`GrowthRecord`]s. On by default.
    pub fn with_growth_log(mut self, enabled: bool) -> Self {
        self.log_records = enabled;
        self
    }

    /// Enables the model if the oxygen field exists; otherwise it stays disabled for the run.
    pub fn start<L: Lattice + ?Sized>(&mut self, lattice: &L) {
        if self.initialized {
            info!("Growth model already initialized.");
            return;
        }
        let oxygen = self.sampler.names().oxygen.clone();
        if !self.sampler.has_field(lattice, &oxygen) {
            error!("Field '{}' not available; growth model disabled for this run.", oxygen);
            return;
        }
        self.initialized = true;
        info!("Growth model initialized.");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn base_rate(&self, phenotype: Phenotype) -> f32 {
        match phenotype {
            Phenotype::Proliferative => self.params.rate_proliferative,
            Phenotype::Invasive => self.params.rate_invasive,
            Phenotype::Reserve => self.params.rate_reserve,
            Phenotype::Necrotic => self.params.rate_default,
        }
    }

    /// Clamped growth increment for `phenotype` under `sample`, ignoring the optimality gate.
    pub fn growth_delta(&self, phenotype: Phenotype, sample: &MetabolicSample) -> f32 {
        let p = &self.params;
        let glc = sample.glucose.max(p.concentration_floor);
        let o2 = sample.o2.max(p.concentration_floor);
        let lac = sample.lactate.max(p.concentration_floor);

        let glucose_factor = glc / (p.k_glucose + glc);
        let oxygen_factor = o2 / (p.k_oxygen + o2);
        let lactate_inhibition = 1.0 / (1.0 + lac / p.k_lactate);

        let delta = self.base_rate(phenotype) * glucose_factor * oxygen_factor * lactate_inhibition;
        delta.min(p.max_growth_per_step)
    }

    /// Applies growth to every live non-necrotic cell.
    pub fn step<L: Lattice + ?Sized>(&mut self, lattice: &mut L) {
        if !self.initialized {
            return;
        }
        for id in lattice.live_cells() {
            if let Err(e) = self.grow_cell(lattice, id) {
                warn!("Growth skipped for cell {}: {}", id, e);
            }
        }
    }

    /// Grows one cell. Returns the applied increment, or `None` when the cell is
    /// necrotic or its environment is not optimal.
    pub fn grow_cell<L: Lattice + ?Sized>(&mut self, lattice: &mut L, id: CellId) -> Result<Option<f32>> {
        let step = lattice.current_step();
        let cell = lattice
            .cell(id)
            .ok_or_else(|| anyhow::anyhow!("cell {} is not on the lattice", id))?;
        if cell.phenotype.is_necrotic() {
            return Ok(None);
        }

        let sample = self.sampler.sample_metabolic(&*lattice, cell);
        if !self.env.is_optimal(&sample) {
            return Ok(None);
        }
        let phenotype = cell.phenotype;
        let delta = self.growth_delta(phenotype, &sample);

        let cell = lattice
            .cell_mut(id)
            .ok_or_else(|| anyhow::anyhow!("cell {} vanished during growth", id))?;
        cell.target_volume += delta;

        if self.log_records {
            self.records.push(GrowthRecord {
                step,
                cell_id: id,
                phenotype,
                delta_volume: delta,
                new_target_volume: cell.target_volume,
                local_glucose: sample.glucose,
                local_oxygen: sample.o2,
                local_lactate: sample.lactate,
            });
        }
        if step % 100 == 0 {
            info!("MCS {}: cell {} grew {:.4} voxels.", step, id, delta);
        }
        Ok(Some(delta))
    }

    pub fn records(&self) -> &[GrowthRecord] {
        &self.records
    }

    /// Hands the accumulated growth log to an exporter, leaving it empty.
    pub fn take_records(&mut self) -> Vec<GrowthRecord> {
        std::mem::take(&mut self.records)
    }
}
