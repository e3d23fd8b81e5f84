use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::phenotype::Phenotype;
use crate::sim_params::SimParams;
use std::path::Path;

// Run control: seeding and loop length for the driver
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct RunConfig {
    /// Seed of the single generator behind every stochastic decision.
    pub seed: u64,
    pub total_steps: u32,
    pub record_interval_steps: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig { seed: 42, total_steps: 1000, record_interval_steps: 50 }
    }
}

// A static scalar profile for the reference lattice: value = base - gradient_x * x, floored at min_value.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct FieldProfileConfig {
    pub name: String,
    pub base_value: f32,
    #[serde(default)]
    pub gradient_x: f32,
    #[serde(default)]
    pub min_value: f32,
}

// Geometry and seeding of the reference lattice used by the driver
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct LatticeConfig {
    pub dim_x: u32,
    pub dim_y: u32,
    pub dim_z: u32,
    pub num_cells_initial: u32,
    pub initial_phenotype: Phenotype,
    /// Fraction of the volume/target gap closed per step (stand-in for the Potts relaxation).
    pub volume_relaxation_rate: f32,
    pub fields: Vec<FieldProfileConfig>,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        LatticeConfig {
            dim_x: 100,
            dim_y: 100,
            dim_z: 1,
            num_cells_initial: 50,
            initial_phenotype: Phenotype::Proliferative,
            volume_relaxation_rate: 0.2,
            fields: vec![
                FieldProfileConfig { name: "o2".into(), base_value: 200.0, gradient_x: 2.0, min_value: 0.0 },
                FieldProfileConfig { name: "glc".into(), base_value: 11.0, gradient_x: 0.11, min_value: 0.0 },
                FieldProfileConfig { name: "lac".into(), base_value: 2.0, gradient_x: -0.05, min_value: 0.0 },
                FieldProfileConfig { name: "h3o".into(), base_value: 7.2, gradient_x: 0.0, min_value: 0.0 },
            ],
        }
    }
}

// Names of the chemical fields sampled at each cell and the fallback value
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct FieldNamesConfig {
    pub oxygen: String,
    pub glucose: String,
    pub lactate: String,
    pub hydronium: String,
    /// Returned for absent fields and out-of-range coordinates.
    pub default_value: f32,
}

impl Default for FieldNamesConfig {
    fn default() -> Self {
        FieldNamesConfig {
            oxygen: "o2".into(),
            glucose: "glc".into(),
            lactate: "lac".into(),
            hydronium: "h3o".into(),
            default_value: 0.0,
        }
    }
}

// Physiological targets and stress thresholds (uM for O2, mM for glucose/lactate)
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub o2_optimal: f32,
    pub o2_tolerance: f32,
    pub glc_optimal: f32,
    pub glc_tolerance: f32,
    pub lac_optimal: f32,
    pub lac_tolerance: f32,
    pub o2_hypoxia: f32,
    pub glc_hypoglycemia: f32,
    pub lac_acidic: f32,
    pub lac_toxic: f32,
    /// O2 level under which (together with `forced_switch_glc`) a cell is switched immediately.
    pub forced_switch_o2: f32,
    pub forced_switch_glc: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig {
            o2_optimal: 180.0,
            o2_tolerance: 40.0,
            glc_optimal: 10.0,
            glc_tolerance: 2.0,
            lac_optimal: 2.0,
            lac_tolerance: 1.0,
            o2_hypoxia: 15.0,
            glc_hypoglycemia: 0.5,
            lac_acidic: 10.0,
            lac_toxic: 20.0,
            forced_switch_o2: 15.0,
            forced_switch_glc: 0.5,
        }
    }
}

// Base growth rates (voxels per MCS) and Michaelis-Menten constants
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct GrowthConfig {
    pub rate_proliferative: f32,
    pub rate_invasive: f32,
    pub rate_reserve: f32,
    pub rate_default: f32,
    pub k_glucose: f32,
    pub k_oxygen: f32,
    pub k_lactate: f32,
    pub concentration_floor: f32,
    pub max_growth_per_step: f32,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        GrowthConfig {
            rate_proliferative: 0.26,
            rate_invasive: 0.20,
            rate_reserve: 0.13,
            rate_default: 0.05,
            k_glucose: 0.05,
            k_oxygen: 20.0,
            k_lactate: 10.0,
            concentration_floor: 0.001,
            max_growth_per_step: 0.5,
        }
    }
}

// Volume constraint values handed to the mechanics engine
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct VolumeConfig {
    pub initial_target_volume: f32,
    pub initial_lambda_volume: f32,
    pub initial_necrotic_target_volume: f32,
    pub initial_necrotic_lambda_volume: f32,
    /// Assigned when a cell dies during the run.
    pub necrotic_target_volume: f32,
    pub necrotic_lambda_volume: f32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        VolumeConfig {
            initial_target_volume: 32.0,
            initial_lambda_volume: 2.0,
            initial_necrotic_target_volume: 20.0,
            initial_necrotic_lambda_volume: 50.0,
            necrotic_target_volume: 25.0,
            necrotic_lambda_volume: 50.0,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct MitosisConfig {
    /// Steps to wait for the microenvironment to settle before any division.
    pub init_delay: u32,
    pub volume_threshold: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_divisions_per_step: Option<u32>,
}

impl Default for MitosisConfig {
    fn default() -> Self {
        MitosisConfig { init_delay: 7, volume_threshold: 64.0, max_divisions_per_step: None }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct DeathConfig {
    pub delay: u32,
    /// Accumulated critical-condition steps at which a cell becomes necrotic.
    pub threshold: u32,
    pub damage_increment: u32,
    pub recovery_decrement: u32,
    /// Applied instead of damage to stressed invasive cells in toxic lactate.
    pub invasive_relief: u32,
}

impl Default for DeathConfig {
    fn default() -> Self {
        DeathConfig { delay: 18, threshold: 36, damage_increment: 1, recovery_decrement: 2, invasive_relief: 1 }
    }
}

// Hysteresis windows (in MCS) for the environment-driven phenotype transitions
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct TransitionConfig {
    pub prol_to_rese: u32,
    pub rese_to_inva: u32,
    pub rese_to_prol: u32,
    pub inva_to_rese: u32,
    /// Subtracted from a counter whenever its condition does not hold.
    pub decay: u32,
    pub delay: u32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        TransitionConfig { prol_to_rese: 14, rese_to_inva: 28, rese_to_prol: 10, inva_to_rese: 19, decay: 2, delay: 28 }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct MutationConfig {
    pub interval: u32,
    /// Fraction (0-1) of eligible cells mutated per pass.
    pub percentage: f64,
    pub delay: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_per_pass: Option<u32>,
}

impl Default for MutationConfig {
    fn default() -> Self {
        MutationConfig { interval: 500, percentage: 0.05, delay: 28, max_per_pass: None }
    }
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_snapshots: bool,
    pub save_growth_log: bool,
    pub save_summary: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "tumor_sim".into(),
            save_snapshots: true,
            save_growth_log: false,
            save_summary: true,
            format: None,
        }
    }
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub run: RunConfig,
    pub lattice: LatticeConfig,
    pub fields: FieldNamesConfig,
    pub environment: EnvironmentConfig,
    pub growth: GrowthConfig,
    pub volume: VolumeConfig,
    pub mitosis: MitosisConfig,
    pub death: DeathConfig,
    pub transitions: TransitionConfig,
    pub mutation: MutationConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let env = &self.environment;
        for (name, value) in [
            ("environment.o2_hypoxia", env.o2_hypoxia),
            ("environment.glc_hypoglycemia", env.glc_hypoglycemia),
            ("growth.k_glucose", self.growth.k_glucose),
            ("growth.k_oxygen", self.growth.k_oxygen),
            ("growth.k_lactate", self.growth.k_lactate),
            ("growth.concentration_floor", self.growth.concentration_floor),
            ("mitosis.volume_threshold", self.mitosis.volume_threshold),
        ] {
            if !(value > 0.0) {
                anyhow::bail!("{} must be positive (got {}).", name, value);
            }
        }
        for (name, value) in [
            ("environment.o2_tolerance", env.o2_tolerance),
            ("environment.glc_tolerance", env.glc_tolerance),
            ("environment.lac_tolerance", env.lac_tolerance),
            ("growth.max_growth_per_step", self.growth.max_growth_per_step),
            ("growth.rate_default", self.growth.rate_default),
        ] {
            if value < 0.0 || !value.is_finite() {
                anyhow::bail!("{} must be a non-negative number (got {}).", name, value);
            }
        }
        if !(0.0..=1.0).contains(&self.mutation.percentage) {
            anyhow::bail!("mutation.percentage must lie in [0, 1].");
        }
        if self.mutation.interval == 0 {
            anyhow::bail!("mutation.interval must be greater than 0.");
        }
        if self.death.threshold == 0 {
            anyhow::bail!("death.threshold must be greater than 0.");
        }
        if self.lattice.dim_x == 0 || self.lattice.dim_y == 0 || self.lattice.dim_z == 0 {
            anyhow::bail!("lattice dimensions must be greater than 0.");
        }
        if !(0.0..=1.0).contains(&self.lattice.volume_relaxation_rate) {
            anyhow::bail!("lattice.volume_relaxation_rate must lie in [0, 1].");
        }
        if self.lattice.initial_phenotype.is_necrotic() {
            anyhow::bail!("lattice.initial_phenotype cannot be necrotic.");
        }
        Ok(())
    }

    /// Converts the configuration into the immutable parameter groups used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        SimParams {
            seed: self.run.seed,
            fields: self.fields.clone(),
            environment: self.environment.clone(),
            growth: self.growth.clone(),
            volume: self.volume.clone(),
            mitosis: self.mitosis.clone(),
            death: self.death.clone(),
            transitions: self.transitions.clone(),
            mutation: self.mutation.clone(),
        }
    }
}
