use crate::cell::CellId;
use crate::environment::EnvironmentClassifier;
use crate::field_sampler::{FieldSampler, MetabolicSample};
use crate::lattice::Lattice;
use anyhow::Result;
use log::{debug, error, info, warn};
use rand::Rng;
use simulation_common::{
    EnvironmentConfig, FieldNamesConfig, Phenotype, Transition, TransitionConfig, TransitionCounts,
};
use std::collections::{HashMap, HashSet};

/// Hysteresis counters of one cell, one per environment-driven transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConditionCounters {
    pub prol_to_rese: u32,
    pub rese_to_inva: u32,
    pub rese_to_prol: u32,
    pub inva_to_rese: u32,
}

impl ConditionCounters {
    pub fn get(&self, transition: Transition) -> u32 {
        match transition {
            Transition::ProlToRese => self.prol_to_rese,
            Transition::ReseToInva => self.rese_to_inva,
            Transition::ReseToProl => self.rese_to_prol,
            Transition::InvaToRese => self.inva_to_rese,
        }
    }

    fn get_mut(&mut self, transition: Transition) -> &mut u32 {
        match transition {
            Transition::ProlToRese => &mut self.prol_to_rese,
            Transition::ReseToInva => &mut self.rese_to_inva,
            Transition::ReseToProl => &mut self.rese_to_prol,
            Transition::InvaToRese => &mut self.inva_to_rese,
        }
    }
}

/// Outcome of one cell's update in a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhenotypeChange {
    pub cell_id: CellId,
    pub forced_to: Option<Phenotype>,
    pub transition: Option<Transition>,
}

/// Environment-driven phenotype switching for live cells.
///
/// Per cell and step, in order:
/// 1. the harsh trigger: severe hypoxia plus low glucose switches the cell at once
///    to a uniformly random other viable phenotype;
/// 2. the counters whose source phenotype matches the cell grow by one while their
///    condition holds; every other counter decays by `decay`, floored at zero;
/// 3. the first transition (in [`Transition::PRIORITY`] order) whose source is the
///    current phenotype and whose counter reached its window is applied.
#[derive(Debug)]
pub struct PhenotypeStateMachine {
    params: TransitionConfig,
    sampler: FieldSampler,
    env: EnvironmentClassifier,
    counters: HashMap<CellId, ConditionCounters>,
    transition_counts: TransitionCounts,
    forced_switches: u32,
    initialized: bool,
}

impl PhenotypeStateMachine {
    pub fn new(params: TransitionConfig, fields: FieldNamesConfig, environment: EnvironmentConfig) -> Self {
        Self {
            params,
            sampler: FieldSampler::new(fields),
            env: EnvironmentClassifier::new(environment),
            counters: HashMap::new(),
            transition_counts: TransitionCounts::default(),
            forced_switches: 0,
            initialized: false,
        }
    }

    pub fn start<L: Lattice + ?Sized>(&mut self, lattice: &L) {
        if self.initialized {
            return;
        }
        let oxygen = self.sampler.names().oxygen.clone();
        if !self.sampler.has_field(lattice, &oxygen) {
            error!("Field '{}' not available; phenotype transitions disabled for this run.", oxygen);
            return;
        }
        self.initialized = true;
        info!("Phenotype state machine initialized.");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Window length (in steps) a transition's condition must be sustained.
    pub fn window(&self, transition: Transition) -> u32 {
        match transition {
            Transition::ProlToRese => self.params.prol_to_rese,
            Transition::ReseToInva => self.params.rese_to_inva,
            Transition::ReseToProl => self.params.rese_to_prol,
            Transition::InvaToRese => self.params.inva_to_rese,
        }
    }

    /// Whether the environment in `sample` feeds the counter of `transition`.
    pub fn condition_holds(&self, transition: Transition, sample: &MetabolicSample) -> bool {
        match transition {
            Transition::ProlToRese => self.env.in_moderate_band(sample),
            Transition::ReseToInva => self.env.is_stressed(sample),
            Transition::ReseToProl => self.env.is_optimal(sample) || self.env.above_depletion(sample),
            Transition::InvaToRese => self.env.is_optimal(sample) || self.env.is_recovering(sample),
        }
    }

    pub fn step<L: Lattice + ?Sized, R: Rng>(&mut self, lattice: &mut L, rng: &mut R) -> Vec<PhenotypeChange> {
        let mcs = lattice.current_step();
        if !self.initialized || mcs < self.params.delay {
            return Vec::new();
        }

        let live = lattice.live_cells();
        let live_set: HashSet<CellId> = live.iter().copied().collect();
        self.counters.retain(|id, _| live_set.contains(id));

        let mut changes = Vec::new();
        for id in live {
            match self.update_cell(lattice, id, rng) {
                Ok(Some(change)) => changes.push(change),
                Ok(None) => {}
                Err(e) => warn!("Phenotype update skipped for cell {}: {}", id, e),
            }
        }
        changes
    }

    fn update_cell<L: Lattice + ?Sized, R: Rng>(
        &mut self,
        lattice: &mut L,
        id: CellId,
        rng: &mut R,
    ) -> Result<Option<PhenotypeChange>> {
        let mcs = lattice.current_step();
        let cell = lattice
            .cell(id)
            .ok_or_else(|| anyhow::anyhow!("cell {} is not on the lattice", id))?;
        if cell.phenotype.is_necrotic() {
            self.counters.remove(&id);
            return Ok(None);
        }
        let mut phenotype = cell.phenotype;
        let sample = self.sampler.sample_metabolic(&*lattice, cell);

        let mut forced_to = None;
        if self.env.requires_forced_switch(&sample) {
            if let Some(alternatives) = phenotype.alternatives() {
                phenotype = alternatives[rng.random_range(0..alternatives.len())];
                forced_to = Some(phenotype);
                self.forced_switches += 1;
                info!("Cell {} switched to {} under severe hypoxia at MCS {}", id, phenotype, mcs);
            }
        }

        self.update_counters(id, phenotype, &sample);
        let transition = self.select_transition(id, phenotype);
        if let Some(t) = transition {
            phenotype = t.target();
            self.transition_counts.record(t);
            info!("{} in cell {} at MCS {}", t.label(), id, mcs);
        }

        if forced_to.is_none() && transition.is_none() {
            return Ok(None);
        }
        let cell = lattice
            .cell_mut(id)
            .ok_or_else(|| anyhow::anyhow!("cell {} vanished during phenotype update", id))?;
        cell.phenotype = phenotype;
        Ok(Some(PhenotypeChange { cell_id: id, forced_to, transition }))
    }

    fn update_counters(&mut self, id: CellId, phenotype: Phenotype, sample: &MetabolicSample) {
        let holds: Vec<(Transition, bool)> = Transition::PRIORITY
            .iter()
            .map(|&t| (t, t.source() == phenotype && self.condition_holds(t, sample)))
            .collect();
        let decay = self.params.decay;
        let counters = self.counters.entry(id).or_default();
        for (t, condition) in holds {
            let counter = counters.get_mut(t);
            if condition {
                *counter += 1;
            } else {
                *counter = counter.saturating_sub(decay);
            }
        }
        debug!("Cell {} ({}) counters {:?}", id, phenotype, counters);
    }

    fn select_transition(&self, id: CellId, phenotype: Phenotype) -> Option<Transition> {
        let counters = self.counters.get(&id)?;
        Transition::PRIORITY
            .iter()
            .copied()
            .find(|&t| t.source() == phenotype && counters.get(t) >= self.window(t))
    }

    pub fn counters(&self, id: CellId) -> Option<ConditionCounters> {
        self.counters.get(&id).copied()
    }

    pub fn tracked_cells(&self) -> usize {
        self.counters.len()
    }

    pub fn transition_counts(&self) -> TransitionCounts {
        self.transition_counts
    }

    /// Cells switched by the harsh environmental trigger since the start of the run.
    pub fn forced_switch_count(&self) -> u32 {
        self.forced_switches
    }
}
