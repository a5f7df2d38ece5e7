//! CellML model analysis and equation evaluation for the OpenCOR engine
//!
//! A [`ModelAnalyser`] reads the contents of a model file and classifies the
//! model. Models that can be simulated come with their [`ModelEquations`],
//! which an [`EquationEvaluator`] computes either by interpreting them or by
//! compiling them into closures first.

mod analyser;
mod cellml;
pub mod equations;
pub mod evaluator;
pub mod expr;
mod mathml;
mod model;

#[cfg(test)]
mod test;

pub use analyser::CellmlAnalyser;
pub use equations::ModelEquations;
pub use evaluator::{CompiledModel, EquationEvaluator, EvaluationMode, Interpreter, NlaSolve, VariableValues};
pub use model::{AnalysedModel, ModelAnalyser, ModelClass, ModelVariables, VariableDescriptor};
