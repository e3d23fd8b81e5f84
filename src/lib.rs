pub mod cell;
pub mod death;
pub mod environment;
pub mod field_sampler;
pub mod grid;
pub mod growth;
pub mod initializer;
pub mod lattice;
pub mod mitosis;
pub mod mutation;
pub mod simulation;
pub mod state_machine;

// Re-export the engine surface for the driver and downstream users
pub use cell::{Cell, CellId};
pub use death::DeathModel;
pub use environment::{EnvironmentClass, EnvironmentClassifier};
pub use field_sampler::{FieldSampler, MetabolicSample};
pub use grid::{Dim3, FieldGrid};
pub use growth::GrowthModel;
pub use initializer::ConstraintInitializer;
pub use lattice::{CpuLattice, FieldHandle, Lattice};
pub use mitosis::DivisionPolicy;
pub use mutation::MutationModel;
pub use simulation::{PhenotypeSimulation, StepReport};
pub use state_machine::{ConditionCounters, PhenotypeChange, PhenotypeStateMachine};
