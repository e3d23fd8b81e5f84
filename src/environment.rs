use crate::field_sampler::MetabolicSample;
use simulation_common::EnvironmentConfig;

/// Coarse classification of a cell's microenvironment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentClass {
    Optimal,
    Stressed,
    Intermediate,
}

/// Pure predicates over a [`MetabolicSample`]. Holds thresholds only, no state.
#[derive(Debug, Clone)]
pub struct EnvironmentClassifier {
    params: EnvironmentConfig,
}

impl EnvironmentClassifier {
    pub fn new(params: EnvironmentConfig) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EnvironmentConfig {
        &self.params
    }

    /// O2, glucose and lactate all within tolerance of their physiological targets.
    pub fn is_optimal(&self, s: &MetabolicSample) -> bool {
        let p = &self.params;
        (s.o2 - p.o2_optimal).abs() <= p.o2_tolerance
            && (s.glucose - p.glc_optimal).abs() <= p.glc_tolerance
            && (s.lactate - p.lac_optimal).abs() <= p.lac_tolerance
    }

    /// Severe hypoxia together with severe hypoglycemia. Lactate plays no part here.
    pub fn is_stressed(&self, s: &MetabolicSample) -> bool {
        s.o2 < self.params.o2_hypoxia && s.glucose < self.params.glc_hypoglycemia
    }

    pub fn classify(&self, s: &MetabolicSample) -> EnvironmentClass {
        if self.is_optimal(s) {
            EnvironmentClass::Optimal
        } else if self.is_stressed(s) {
            EnvironmentClass::Stressed
        } else {
            EnvironmentClass::Intermediate
        }
    }

    /// O2 and glucose both at or above the severe-depletion thresholds.
    pub fn is_recovering(&self, s: &MetabolicSample) -> bool {
        s.o2 >= self.params.o2_hypoxia && s.glucose >= self.params.glc_hypoglycemia
    }

    /// O2 and glucose both strictly above the severe-depletion thresholds.
    pub fn above_depletion(&self, s: &MetabolicSample) -> bool {
        s.o2 > self.params.o2_hypoxia && s.glucose > self.params.glc_hypoglycemia
    }

    /// O2 and glucose both inside the closed band [depleted, normal].
    pub fn in_moderate_band(&self, s: &MetabolicSample) -> bool {
        let p = &self.params;
        (p.o2_hypoxia..=p.o2_optimal).contains(&s.o2)
            && (p.glc_hypoglycemia..=p.glc_optimal).contains(&s.glucose)
    }

    pub fn is_toxic_lactate(&self, s: &MetabolicSample) -> bool {
        s.lactate > self.params.lac_toxic
    }

    pub fn is_acidic(&self, s: &MetabolicSample) -> bool {
        s.lactate > self.params.lac_acidic
    }

    /// Harsh trigger for an immediate phenotype switch.
    pub fn requires_forced_switch(&self, s: &MetabolicSample) -> bool {
        s.o2 < self.params.forced_switch_o2 && s.glucose < self.params.forced_switch_glc
    }
}
