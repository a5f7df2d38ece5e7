//! Simulation experiment descriptions for the OpenCOR engine
//!
//! A [`SedDocument`] says what to simulate (its [`SedModel`]s), how to
//! simulate it (its [`SedSimulation`]s and their solvers) and which model is
//! simulated in which way (its [`SedTask`]s). A document is built from a
//! CellML file, a SED-ML file or a COMBINE archive, and can be written back
//! as SED-ML through the [`codec`] module.
//!
//! [`SedDocument::instantiate`] validates the tasks of a document and turns
//! them into an [`Instance`], which runs them and keeps their results.

pub mod codec;
mod document;
pub mod instance;
mod model;
mod simulation;
mod task;

#[cfg(test)]
mod test;

pub use document::SedDocument;
pub use instance::{CancellationToken, Instance, InstanceState, InstanceTask};
pub use model::{ModelId, SedChange, SedModel};
pub use simulation::{SedSimulation, SimulationId, SimulationKind};
pub use task::{SedTask, TaskId};
