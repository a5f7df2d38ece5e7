//! Reading and writing SED-ML documents
//!
//! [`parse`] reads the parts of a SED-ML document the engine supports
//! (models and their attribute changes, simulations and their algorithms,
//! tasks) into a [`ParsedSedml`], which refers to models and simulations by
//! their SED-ML ids. [`SedDocument`](crate::SedDocument) resolves those ids
//! into handles when it is built from a SED-ML file.
//!
//! [`serialise`] writes a document as SED-ML Level 1 Version 4.

mod parse;
mod serialise;
mod source;

use opencor_shared::issue::{HasIssues, Logger};
use opencor_solver::Solver;

use crate::{SedChange, SimulationKind};

pub use parse::parse;
pub use serialise::serialise;
pub use source::{model_source, resolve_source};

/// The namespace of SED-ML Level 1 Version 4
pub const SEDML_NAMESPACE: &str = "http://sed-ml.org/sed-ml/level1/version4";

/// The namespace of the elements SED-ML does not define, such as the NLA
/// algorithm of a differential simulation
pub const LIBOPENCOR_NAMESPACE: &str = "https://opencor.ws/libopencor";

/// The language of CellML models
pub const CELLML_LANGUAGE: &str = "urn:sedml:language:cellml";

/// A model, as described in a SED-ML document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedModel {
    /// The SED-ML id of the model
    pub id: Option<String>,
    /// The location of the model file, as written in the document
    pub source: String,
    /// The valid changes of the model
    pub changes: Vec<SedChange>,
}

/// A simulation, as described in a SED-ML document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSimulation {
    /// The SED-ML id of the simulation
    pub id: Option<String>,
    /// What the simulation computes
    pub kind: SimulationKind,
    /// The ODE solver, if an algorithm element names one
    pub ode_solver: Option<Solver>,
    /// The NLA solver, if an algorithm element names one
    pub nla_solver: Option<Solver>,
}

/// A task, as described in a SED-ML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTask {
    /// The SED-ML id of the task
    pub id: Option<String>,
    /// The SED-ML id of the model of the task
    pub model_reference: Option<String>,
    /// The SED-ML id of the simulation of the task
    pub simulation_reference: Option<String>,
}

/// The supported contents of a SED-ML document, with the problems found
/// while reading it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSedml {
    /// The models, in document order
    pub models: Vec<ParsedModel>,
    /// The simulations, in document order
    pub simulations: Vec<ParsedSimulation>,
    /// The tasks, in document order
    pub tasks: Vec<ParsedTask>,
    /// The problems found while reading the document
    pub logger: Logger,
}

impl HasIssues for ParsedSedml {
    fn logger(&self) -> &Logger {
        &self.logger
    }
}
