use serde::{Deserialize, Serialize};
use std::fmt;

/// Mutually exclusive cell state driving growth, division and death behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phenotype {
    Proliferative,
    Reserve,
    Invasive,
    /// Terminal. Necrotic cells are never grown, divided or switched again.
    Necrotic,
}

impl Phenotype {
    /// The three phenotypes a live cell may hold or be switched into.
    pub const VIABLE: [Phenotype; 3] = [
        Phenotype::Proliferative,
        Phenotype::Reserve,
        Phenotype::Invasive,
    ];

    #[inline]
    pub fn is_necrotic(self) -> bool {
        self == Phenotype::Necrotic
    }

    /// The two viable phenotypes other than `self`, in a fixed order.
    /// Returns `None` for Necrotic, which has no switch targets.
    pub fn alternatives(self) -> Option<[Phenotype; 2]> {
        match self {
            Phenotype::Proliferative => Some([Phenotype::Reserve, Phenotype::Invasive]),
            Phenotype::Reserve => Some([Phenotype::Proliferative, Phenotype::Invasive]),
            Phenotype::Invasive => Some([Phenotype::Proliferative, Phenotype::Reserve]),
            Phenotype::Necrotic => None,
        }
    }

    /// Short tag used in logs and exported tables.
    pub fn tag(self) -> &'static str {
        match self {
            Phenotype::Proliferative => "PROL",
            Phenotype::Reserve => "RESE",
            Phenotype::Invasive => "INVA",
            Phenotype::Necrotic => "NECR",
        }
    }
}

impl fmt::Display for Phenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The four environment-driven transitions, in the priority order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    ProlToRese,
    ReseToInva,
    ReseToProl,
    InvaToRese,
}

impl Transition {
    pub const PRIORITY: [Transition; 4] = [
        Transition::ProlToRese,
        Transition::ReseToInva,
        Transition::ReseToProl,
        Transition::InvaToRese,
    ];

    pub fn source(self) -> Phenotype {
        match self {
            Transition::ProlToRese => Phenotype::Proliferative,
            Transition::ReseToInva | Transition::ReseToProl => Phenotype::Reserve,
            Transition::InvaToRese => Phenotype::Invasive,
        }
    }

    pub fn target(self) -> Phenotype {
        match self {
            Transition::ProlToRese | Transition::InvaToRese => Phenotype::Reserve,
            Transition::ReseToInva => Phenotype::Invasive,
            Transition::ReseToProl => Phenotype::Proliferative,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Transition::ProlToRese => "PROL->RESE",
            Transition::ReseToInva => "RESE->INVA",
            Transition::ReseToProl => "RESE->PROL",
            Transition::InvaToRese => "INVA->RESE",
        }
    }
}
