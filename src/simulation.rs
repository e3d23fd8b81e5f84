use crate::cell::CellId;
use crate::death::DeathModel;
use crate::growth::GrowthModel;
use crate::initializer::ConstraintInitializer;
use crate::lattice::{CpuLattice, Lattice};
use crate::mitosis::DivisionPolicy;
use crate::mutation::MutationModel;
use crate::state_machine::PhenotypeStateMachine;
use anyhow::Result;
use log::{debug, info, trace};
use rand::prelude::*;
use simulation_common::{
    CellVolumeRecord, DeathStats, GrowthRecord, MutationStats, Phenotype, SimParams, SimulationConfig,
    Snapshot, TransitionCounts,
};

/// What happened to the population during one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub step: u32,
    pub divisions: Vec<CellId>,
    pub deaths: Vec<CellId>,
    pub phenotype_changes: usize,
    pub mutations: Vec<CellId>,
}

/// Drives the phenotype engine over a [`CpuLattice`].
///
/// Owns the single seeded RNG; every stochastic choice in a run draws from it, so
/// equal seeds and equal configs give identical runs.
pub struct PhenotypeSimulation {
    /// The run configuration, including lattice setup and output options.
    pub config: SimulationConfig,
    params: SimParams,
    lattice: CpuLattice,
    rng: StdRng,
    initializer: ConstraintInitializer,
    growth: GrowthModel,
    mitosis: DivisionPolicy,
    death: DeathModel,
    transitions: PhenotypeStateMachine,
    mutation: MutationModel,
    started: bool,
    recorded_snapshots: Vec<Snapshot>,
}

impl PhenotypeSimulation {
    /// Builds the lattice from config (fields plus seed cells) and wires the components.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let params = config.get_sim_params();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let lattice = CpuLattice::from_config(&config.lattice, params.volume.initial_target_volume, &mut rng);
        Ok(Self::assemble(config, params, lattice, rng))
    }

    /// Runs the engine over a prepared lattice. Lattice setup in `config` is ignored.
    pub fn with_lattice(config: SimulationConfig, lattice: CpuLattice) -> Self {
        let params = config.get_sim_params();
        let rng = StdRng::seed_from_u64(params.seed);
        Self::assemble(config, params, lattice, rng)
    }

    fn assemble(config: SimulationConfig, params: SimParams, lattice: CpuLattice, rng: StdRng) -> Self {
        let p = &params;
        Self {
            initializer: ConstraintInitializer::new(p.volume.clone()),
            growth: GrowthModel::new(p.growth.clone(), p.fields.clone(), p.environment.clone())
                .with_growth_log(config.output.save_growth_log),
            mitosis: DivisionPolicy::new(p.mitosis.clone()),
            death: DeathModel::new(p.death.clone(), p.volume.clone(), p.fields.clone(), p.environment.clone()),
            transitions: PhenotypeStateMachine::new(p.transitions.clone(), p.fields.clone(), p.environment.clone()),
            mutation: MutationModel::new(p.mutation.clone()),
            config,
            params,
            lattice,
            rng,
            started: false,
            recorded_snapshots: Vec::new(),
        }
    }

    /// Assigns initial constraints and starts every component. Runs once; `step` calls it if needed.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.initializer.start(&mut self.lattice);
        self.growth.start(&self.lattice);
        self.mitosis.start();
        self.death.start(&self.lattice);
        self.transitions.start(&self.lattice);
        self.mutation.start();
        self.started = true;
        info!("Phenotype engine started with {} cells.", self.lattice.cell_count());
    }

    /// Advances one MCS: the phenotype components in order, then the lattice.
    pub fn step(&mut self) -> Result<StepReport> {
        self.start();
        let step = self.lattice.current_step();

        self.growth.step(&mut self.lattice);
        let divisions = self.mitosis.step(&mut self.lattice);
        let deaths = self.death.step(&mut self.lattice);
        let phenotype_changes = self.transitions.step(&mut self.lattice, &mut self.rng).len();
        let mutations = self.mutation.step(&mut self.lattice, &mut self.rng);

        self.lattice.relax_volumes(self.config.lattice.volume_relaxation_rate);
        self.lattice.advance_step();

        trace!(
            "MCS {}: {} divisions, {} deaths, {} phenotype changes, {} mutations",
            step, divisions.len(), deaths.len(), phenotype_changes, mutations.len()
        );
        Ok(StepReport { step, divisions, deaths, phenotype_changes, mutations })
    }

    pub fn current_step(&self) -> u32 {
        self.lattice.current_step()
    }

    pub fn current_cell_count(&self) -> u32 {
        self.lattice.cell_count() as u32
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn lattice(&self) -> &CpuLattice {
        &self.lattice
    }

    /// Mutable access for the external engine side (e.g. rewriting fields between steps).
    pub fn lattice_mut(&mut self) -> &mut CpuLattice {
        &mut self.lattice
    }

    pub fn growth_records(&self) -> &[GrowthRecord] {
        self.growth.records()
    }

    pub fn death_stats(&self) -> DeathStats {
        self.death.stats()
    }

    pub fn mutation_stats(&self) -> MutationStats {
        MutationStats {
            forced_switches: self.transitions.forced_switch_count(),
            ..self.mutation.stats()
        }
    }

    pub fn transition_counts(&self) -> TransitionCounts {
        self.transitions.transition_counts()
    }

    pub fn division_count(&self) -> u32 {
        self.mitosis.division_count()
    }

    /// Per-cell volume table in enumeration order.
    pub fn final_volumes(&self) -> Vec<CellVolumeRecord> {
        self.lattice
            .cells()
            .iter()
            .map(|c| CellVolumeRecord {
                cell_id: c.id,
                phenotype: c.phenotype,
                volume: c.volume,
                target_volume: c.target_volume,
            })
            .collect()
    }

    /// Summarizes the population at the current step and stores the snapshot.
    pub fn record_snapshot(&mut self) -> Result<()> {
        let cells = self.lattice.cells();
        let count_of = |p: Phenotype| cells.iter().filter(|c| c.phenotype == p).count() as u32;
        let (mean_volume, mean_target_volume) = if cells.is_empty() {
            (0.0, 0.0)
        } else {
            let n = cells.len() as f32;
            (
                cells.iter().map(|c| c.volume).sum::<f32>() / n,
                cells.iter().map(|c| c.target_volume).sum::<f32>() / n,
            )
        };

        let snapshot = Snapshot {
            step: self.lattice.current_step(),
            total_cell_count: cells.len() as u32,
            proliferative_count: count_of(Phenotype::Proliferative),
            reserve_count: count_of(Phenotype::Reserve),
            invasive_count: count_of(Phenotype::Invasive),
            necrotic_count: count_of(Phenotype::Necrotic),
            mean_volume,
            mean_target_volume,
            deaths: self.death.death_count(),
            mutations: self.mutation_stats(),
            transitions: self.transitions.transition_counts(),
        };
        debug!("Snapshot at MCS {}: {:?}", snapshot.step, snapshot);
        info!(
            "MCS {} | cells {} | PROL {} RESE {} INVA {} NECR {} | mean volume {:.2}",
            snapshot.step,
            snapshot.total_cell_count,
            snapshot.proliferative_count,
            snapshot.reserve_count,
            snapshot.invasive_count,
            snapshot.necrotic_count,
            snapshot.mean_volume
        );
        self.recorded_snapshots.push(snapshot);
        Ok(())
    }

    pub fn get_recorded_snapshots(&self) -> &Vec<Snapshot> {
        &self.recorded_snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Dim3, FieldGrid};
    use simulation_common::Vec3;

    fn small_config(seed: u64) -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.run.seed = seed;
        config.lattice.dim_x = 40;
        config.lattice.dim_y = 40;
        config.lattice.num_cells_initial = 20;
        config.mutation.interval = 50;
        config
    }

    fn run(config: SimulationConfig, steps: u32) -> PhenotypeSimulation {
        let mut sim = PhenotypeSimulation::new(config).unwrap();
        for _ in 0..steps {
            sim.step().unwrap();
        }
        sim
    }

    #[test]
    fn same_seed_gives_identical_runs() {
        let a = run(small_config(7), 150);
        let b = run(small_config(7), 150);
        assert_eq!(a.final_volumes(), b.final_volumes());
        assert_eq!(a.transition_counts(), b.transition_counts());
        assert_eq!(a.mutation_stats(), b.mutation_stats());
    }

    #[test]
    fn start_assigns_initial_constraints_once() {
        let mut sim = PhenotypeSimulation::new(small_config(1)).unwrap();
        sim.start();
        for cell in sim.lattice().cells() {
            assert_eq!(cell.target_volume, 32.0);
            assert_eq!(cell.lambda_volume, 2.0);
        }
        sim.step().unwrap();
        sim.start();
        assert_eq!(sim.current_step(), 1);
    }

    #[test]
    fn starved_population_dies_and_stays_dead() {
        let dim = Dim3::new(8, 8, 1);
        let mut lattice = CpuLattice::new(dim);
        lattice.insert_field("o2", FieldGrid::new(dim, 5.0));
        lattice.insert_field("glc", FieldGrid::new(dim, 0.1));
        lattice.insert_field("lac", FieldGrid::new(dim, 1.0));
        for i in 0..6 {
            lattice.add_cell(Phenotype::VIABLE[i % 3], 32.0, Vec3::new(i as f32, 1.0, 0.0));
        }
        let mut config = SimulationConfig::default();
        config.mutation.delay = 10_000;
        let mut sim = PhenotypeSimulation::with_lattice(config, lattice);

        for _ in 0..120 {
            sim.step().unwrap();
            for cell in sim.lattice().cells() {
                assert!(cell.target_volume >= 0.0);
                assert!(cell.volume >= 0.0);
            }
        }
        // Death starts at MCS 18 and needs 36 stressed steps.
        assert_eq!(sim.death_stats().total_deaths, 6);
        assert!(sim.lattice().cells().iter().all(|c| c.phenotype.is_necrotic()));
        assert!(sim.mutation_stats().forced_switches > 0);

        let before = sim.final_volumes();
        for _ in 0..20 {
            sim.step().unwrap();
        }
        let after = sim.final_volumes();
        assert!(after.iter().all(|r| r.phenotype == Phenotype::Necrotic));
        assert!(after.iter().all(|r| r.target_volume == 25.0));
        assert_eq!(before.len(), after.len());
        assert_eq!(sim.death_stats().total_deaths, 6);
    }

    #[test]
    fn snapshots_summarize_population() {
        let mut sim = run(small_config(3), 60);
        sim.record_snapshot().unwrap();
        let snap = sim.get_recorded_snapshots().last().unwrap().clone();
        assert_eq!(snap.step, 60);
        assert_eq!(snap.total_cell_count, sim.current_cell_count());
        assert_eq!(
            snap.proliferative_count + snap.reserve_count + snap.invasive_count + snap.necrotic_count,
            snap.total_cell_count
        );
        assert_eq!(snap.transitions, sim.transition_counts());
        assert!(snap.mean_target_volume > 0.0);
        // save_growth_log is off by default, so nothing is buffered.
        assert!(sim.growth_records().is_empty());
    }

    #[test]
    fn rich_field_grows_and_divides() {
        let dim = Dim3::new(8, 8, 1);
        let mut lattice = CpuLattice::new(dim);
        lattice.insert_field("o2", FieldGrid::new(dim, 200.0));
        lattice.insert_field("glc", FieldGrid::new(dim, 12.0));
        lattice.insert_field("lac", FieldGrid::new(dim, 2.0));
        lattice.add_cell(Phenotype::Proliferative, 32.0, Vec3::new(3.0, 3.0, 0.0));
        let mut config = SimulationConfig::default();
        config.lattice.volume_relaxation_rate = 1.0;
        config.mutation.delay = 10_000;
        config.output.save_growth_log = true;
        let mut sim = PhenotypeSimulation::with_lattice(config, lattice);

        for _ in 0..250 {
            sim.step().unwrap();
        }
        assert!(sim.division_count() > 0);
        assert!(sim.current_cell_count() > 1);
        assert!(!sim.growth_records().is_empty());
        assert_eq!(sim.death_stats().total_deaths, 0);
    }
}
