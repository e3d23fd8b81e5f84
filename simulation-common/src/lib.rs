pub mod config;
pub mod phenotype;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-exports for the engine crate
pub use config::{
    SimulationConfig, RunConfig, LatticeConfig, FieldProfileConfig, FieldNamesConfig, EnvironmentConfig,
    GrowthConfig, VolumeConfig, MitosisConfig, DeathConfig, TransitionConfig, MutationConfig, OutputConfig,
};
pub use phenotype::{Phenotype, Transition};
pub use sim_params::SimParams;
pub use snapshot::{CellVolumeRecord, DeathStats, GrowthRecord, MutationStats, Snapshot, TransitionCounts};
pub use vecmath::{Vec3, clamp};
