use simulation_common::{Phenotype, Vec3};

/// Stable identifier assigned by the lattice engine; never reused while the cell lives.
pub type CellId = u32;

/// Per-cell state shared between the phenotype engine and the lattice engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: CellId,
    pub phenotype: Phenotype,
    pub volume: f32,
    pub target_volume: f32,
    /// Volume-constraint stiffness; consumed by the mechanics engine only.
    pub lambda_volume: f32,
    /// Center of mass, maintained by the lattice engine.
    pub position: Vec3,
}

impl Cell {
    pub fn new(id: CellId, phenotype: Phenotype, volume: f32, position: Vec3) -> Self {
        Self {
            id,
            phenotype,
            volume,
            target_volume: volume,
            lambda_volume: 0.0,
            position,
        }
    }

    /// Copies the inheritable attributes of `parent` onto this (daughter) cell.
    pub fn inherit_from(&mut self, parent: &Cell) {
        self.phenotype = parent.phenotype;
        self.target_volume = parent.target_volume;
        self.lambda_volume = parent.lambda_volume;
    }
}
