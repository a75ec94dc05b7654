//! Virus concentration field stored as a grid property layer.

use outbreak_core::{FieldTuning, FieldView, Position, SimulationError};
use tracing::trace;

use crate::grid::Grid;

/// Deposits and decays virus concentration on a named grid layer.
///
/// The field owns no storage of its own; every operation reads or writes the
/// layer registered on the grid by [`VirusField::install`]. Concentrations
/// never drop below zero.
#[derive(Clone, Debug)]
pub struct VirusField {
    tuning: FieldTuning,
}

impl VirusField {
    /// Creates a field driven by the provided tuning.
    #[must_use]
    pub const fn new(tuning: FieldTuning) -> Self {
        Self { tuning }
    }

    /// Registers the backing layer on the grid, initialised to zero.
    pub fn install(&self, grid: &mut Grid) {
        let _ = grid.add_layer(self.tuning.layer.clone(), 0.0);
    }

    /// Name of the backing property layer.
    #[must_use]
    pub fn layer_name(&self) -> &str {
        &self.tuning.layer
    }

    /// Tuning the field was created with.
    #[must_use]
    pub const fn tuning(&self) -> &FieldTuning {
        &self.tuning
    }

    /// Amount an infected agent sheds per step.
    #[must_use]
    pub fn deposit_amount(&self, face_covered: bool) -> f64 {
        if face_covered {
            self.tuning.deposit_masked
        } else {
            self.tuning.deposit_unmasked
        }
    }

    /// Adds one step of shedding at the position and returns the new value.
    pub fn deposit(
        &self,
        grid: &mut Grid,
        position: Position,
        face_covered: bool,
    ) -> Result<f64, SimulationError> {
        let amount = self.deposit_amount(face_covered);
        let value = grid.layer_mut(&self.tuning.layer)?.add(position, amount)?;
        trace!(%position, amount, value, "virus deposited");
        Ok(value)
    }

    /// Concentration at the position.
    pub fn concentration(&self, grid: &Grid, position: Position) -> Result<f64, SimulationError> {
        grid.get_cell(&self.tuning.layer, position)
    }

    /// Reports whether the field decays at the end of `step`.
    #[must_use]
    pub const fn is_decay_step(&self, step: u64) -> bool {
        self.tuning.decay_interval > 0 && step % self.tuning.decay_interval == 0
    }

    /// Removes the decay amount from every cell, flooring at zero.
    pub fn decay(&self, grid: &mut Grid) -> Result<(), SimulationError> {
        let amount = self.tuning.decay_amount;
        grid.layer_mut(&self.tuning.layer)?
            .modify_all(|value| (value - amount).max(0.0));
        Ok(())
    }

    /// Read-only view over the concentrations.
    pub fn view<'a>(&self, grid: &'a Grid) -> Result<FieldView<'a>, SimulationError> {
        Ok(grid.layer(&self.tuning.layer)?.view())
    }
}
