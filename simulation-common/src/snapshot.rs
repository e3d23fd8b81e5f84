use serde::{Serialize, Deserialize};
use crate::phenotype::{Phenotype, Transition};

/// Audit record appended by the growth model for every applied growth increment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRecord {
    pub step: u32,
    pub cell_id: u32,
    pub phenotype: Phenotype,
    pub delta_volume: f32,
    pub new_target_volume: f32,
    pub local_glucose: f32,
    pub local_oxygen: f32,
    pub local_lactate: f32,
}

/// Per-cell row of the final volume table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellVolumeRecord {
    pub cell_id: u32,
    pub phenotype: Phenotype,
    pub volume: f32,
    pub target_volume: f32,
}

/// How many times each environment-driven transition fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCounts {
    pub prol_to_rese: u32,
    pub rese_to_inva: u32,
    pub rese_to_prol: u32,
    pub inva_to_rese: u32,
}

impl TransitionCounts {
    pub fn record(&mut self, transition: Transition) {
        match transition {
            Transition::ProlToRese => self.prol_to_rese += 1,
            Transition::ReseToInva => self.rese_to_inva += 1,
            Transition::ReseToProl => self.rese_to_prol += 1,
            Transition::InvaToRese => self.inva_to_rese += 1,
        }
    }

    pub fn get(&self, transition: Transition) -> u32 {
        match transition {
            Transition::ProlToRese => self.prol_to_rese,
            Transition::ReseToInva => self.rese_to_inva,
            Transition::ReseToProl => self.rese_to_prol,
            Transition::InvaToRese => self.inva_to_rese,
        }
    }

    pub fn total(&self) -> u32 {
        self.prol_to_rese + self.rese_to_inva + self.rese_to_prol + self.inva_to_rese
    }

    /// (label, count) rows in priority order, for tabular export.
    pub fn rows(&self) -> Vec<(&'static str, u32)> {
        Transition::PRIORITY.iter().map(|t| (t.label(), self.get(*t))).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathStats {
    pub total_deaths: u32,
    pub step: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationStats {
    /// Cells reassigned by the periodic random pass.
    pub random_mutations: u32,
    /// Cells switched immediately by the harsh hypoxia/low-glucose trigger.
    pub forced_switches: u32,
    pub step: u32,
}

impl MutationStats {
    pub fn total(&self) -> u32 {
        self.random_mutations + self.forced_switches
    }
}

/// A snapshot of the population at a specific step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The simulation step (MCS) at which the snapshot was taken.
    pub step: u32,
    pub total_cell_count: u32,
    pub proliferative_count: u32,
    pub reserve_count: u32,
    pub invasive_count: u32,
    pub necrotic_count: u32,
    pub mean_volume: f32,
    pub mean_target_volume: f32,
    /// Cumulative tallies since the start of the run.
    pub deaths: u32,
    pub mutations: MutationStats,
    pub transitions: TransitionCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_counts_track_each_label() {
        let mut counts = TransitionCounts::default();
        counts.record(Transition::ReseToProl);
        counts.record(Transition::ReseToProl);
        counts.record(Transition::InvaToRese);
        assert_eq!(counts.get(Transition::ReseToProl), 2);
        assert_eq!(counts.total(), 3);
        assert_eq!(
            counts.rows(),
            vec![("PROL->RESE", 0), ("RESE->INVA", 0), ("RESE->PROL", 2), ("INVA->RESE", 1)]
        );
    }
}
