use serde::{Deserialize, Serialize};
use crate::config::{
    DeathConfig, EnvironmentConfig, FieldNamesConfig, GrowthConfig, MitosisConfig, MutationConfig,
    TransitionConfig, VolumeConfig,
};

/// Immutable parameters derived from the configuration, loaded once before a run.
/// Each component clones out only the group it consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    pub seed: u64,
    pub fields: FieldNamesConfig,
    pub environment: EnvironmentConfig,
    pub growth: GrowthConfig,
    pub volume: VolumeConfig,
    pub mitosis: MitosisConfig,
    pub death: DeathConfig,
    pub transitions: TransitionConfig,
    pub mutation: MutationConfig,
}

impl Default for SimParams {
    fn default() -> Self {
        crate::config::SimulationConfig::default().get_sim_params()
    }
}
