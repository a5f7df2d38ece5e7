use crate::{ModelId, SimulationId};

/// The handle of a task within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) usize);

/// A task: a model simulated by a simulation.
///
/// A task refers to its model and simulation through handles of the document
/// that owns it. Removing the model or simulation from the document resets
/// the handle rather than removing the task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SedTask {
    id: String,
    model: Option<ModelId>,
    simulation: Option<SimulationId>,
}

impl SedTask {
    /// Creates a task
    #[must_use]
    pub fn new(id: impl Into<String>, model: Option<ModelId>, simulation: Option<SimulationId>) -> Self {
        Self {
            id: id.into(),
            model,
            simulation,
        }
    }

    /// Returns the id of the task
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the model of the task
    #[must_use]
    pub const fn model(&self) -> Option<ModelId> {
        self.model
    }

    /// Sets or resets the model of the task
    pub const fn set_model(&mut self, model: Option<ModelId>) {
        self.model = model;
    }

    /// Returns the simulation of the task
    #[must_use]
    pub const fn simulation(&self) -> Option<SimulationId> {
        self.simulation
    }

    /// Sets or resets the simulation of the task
    pub const fn set_simulation(&mut self, simulation: Option<SimulationId>) {
        self.simulation = simulation;
    }
}
