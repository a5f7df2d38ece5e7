use std::{fmt, sync::Arc};

use opencor_shared::issue::{HasIssues, Logger};

use crate::{
    equations::ModelEquations,
    evaluator::{CompiledModel, EquationEvaluator, EvaluationMode, Interpreter, VariableValues},
};

/// The mathematical character of a model, as found by its analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelClass {
    /// The model could not be read
    Invalid,
    /// Some variables cannot be computed
    Underconstrained,
    /// Some equations are not needed to compute any variable
    Overconstrained,
    /// Both underconstrained and overconstrained
    UnsuitablyConstrained,
    /// Explicit equations only
    Algebraic,
    /// Ordinary differential equations, with explicit algebraic equations
    Ode,
    /// Non-linear algebraic equations, without differential equations
    Nla,
    /// Differential equations and non-linear algebraic equations
    Dae,
}

impl ModelClass {
    /// Returns whether the model can be simulated
    #[must_use]
    pub const fn is_valid(self) -> bool {
        match self {
            Self::Algebraic | Self::Ode | Self::Nla | Self::Dae => true,
            Self::Invalid | Self::Underconstrained | Self::Overconstrained | Self::UnsuitablyConstrained => false,
        }
    }

    /// Returns whether simulating the model needs an ODE solver
    #[must_use]
    pub const fn requires_ode_solver(self) -> bool {
        matches!(self, Self::Ode | Self::Dae)
    }

    /// Returns whether simulating the model needs an NLA solver
    #[must_use]
    pub const fn requires_nla_solver(self) -> bool {
        matches!(self, Self::Nla | Self::Dae)
    }

    /// Returns the lowercase name of the class
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Underconstrained => "underconstrained",
            Self::Overconstrained => "overconstrained",
            Self::UnsuitablyConstrained => "unsuitably constrained",
            Self::Algebraic => "algebraic",
            Self::Ode => "ode",
            Self::Nla => "nla",
            Self::Dae => "dae",
        }
    }
}

impl fmt::Display for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a model variable comes from and what it is measured in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableDescriptor {
    component: String,
    name: String,
    units: String,
}

impl VariableDescriptor {
    /// Creates a descriptor
    #[must_use]
    pub fn new(component: impl Into<String>, name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            name: name.into(),
            units: units.into(),
        }
    }

    /// Returns the name of the component the variable belongs to
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Returns the name of the variable
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the units of the variable
    #[must_use]
    pub fn units(&self) -> &str {
        &self.units
    }

    /// Returns `component/name`, the name under which results are reported
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.component, self.name)
    }
}

/// The variables of a model, by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelVariables {
    /// The variable of integration, for models with differential equations
    pub voi: Option<VariableDescriptor>,
    /// The states
    pub states: Vec<VariableDescriptor>,
    /// The constants
    pub constants: Vec<VariableDescriptor>,
    /// The variables computed from constants only
    pub computed_constants: Vec<VariableDescriptor>,
    /// The other computed variables
    pub algebraic: Vec<VariableDescriptor>,
}

/// The result of analysing a model.
#[derive(Debug, Clone)]
pub struct AnalysedModel {
    class: ModelClass,
    variables: ModelVariables,
    equations: Option<Arc<ModelEquations>>,
    logger: Logger,
}

impl AnalysedModel {
    /// Creates a model that can be simulated
    #[must_use]
    pub fn new(class: ModelClass, variables: ModelVariables, equations: ModelEquations, logger: Logger) -> Self {
        Self {
            class,
            variables,
            equations: Some(Arc::new(equations)),
            logger,
        }
    }

    /// Creates a model without any variable or equation, as reported by an
    /// analysis that only classifies models or that failed
    #[must_use]
    pub const fn without_equations(class: ModelClass, logger: Logger) -> Self {
        Self {
            class,
            variables: ModelVariables {
                voi: None,
                states: Vec::new(),
                constants: Vec::new(),
                computed_constants: Vec::new(),
                algebraic: Vec::new(),
            },
            equations: None,
            logger,
        }
    }

    /// Returns the class of the model
    #[must_use]
    pub const fn class(&self) -> ModelClass {
        self.class
    }

    /// Returns the variables of the model
    #[must_use]
    pub const fn variables(&self) -> &ModelVariables {
        &self.variables
    }

    /// Returns the equations of the model, if it can be simulated
    #[must_use]
    pub fn equations(&self) -> Option<&ModelEquations> {
        self.equations.as_deref()
    }

    /// Returns the number of non-linear algebraic systems of the model
    #[must_use]
    pub fn nla_system_count(&self) -> usize {
        self.equations.as_ref().map_or(0, |equations| equations.nla_system_count())
    }

    /// Creates the storage for the non-state variables of the model
    #[must_use]
    pub fn variable_values(&self) -> VariableValues {
        VariableValues::new(
            self.variables.constants.len(),
            self.variables.computed_constants.len(),
            self.variables.algebraic.len(),
        )
    }

    /// Creates an evaluator for the equations of the model
    ///
    /// Returns `None` if the model cannot be simulated.
    #[must_use]
    pub fn evaluator(&self, mode: EvaluationMode) -> Option<Box<dyn EquationEvaluator>> {
        let equations = self.equations.as_ref()?;
        let evaluator: Box<dyn EquationEvaluator> = match mode {
            EvaluationMode::Compiled => Box::new(CompiledModel::new(equations)),
            EvaluationMode::Interpreted => Box::new(Interpreter::new(Arc::clone(equations))),
        };

        Some(evaluator)
    }
}

impl HasIssues for AnalysedModel {
    fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// Analyses the contents of a model file.
pub trait ModelAnalyser: Send + Sync {
    /// Analyses the given model. Problems are reported through the issues of
    /// the result and its class, never as a failure.
    fn analyse(&self, contents: &[u8]) -> AnalysedModel;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        assert!(ModelClass::Dae.requires_ode_solver() && ModelClass::Dae.requires_nla_solver());
        assert!(!ModelClass::Algebraic.requires_ode_solver() && !ModelClass::Algebraic.requires_nla_solver());
        assert!(!ModelClass::Overconstrained.is_valid());
        assert_eq!(ModelClass::UnsuitablyConstrained.to_string(), "unsuitably constrained");
    }

    #[test]
    fn models_without_equations_have_no_evaluator() {
        let model = AnalysedModel::without_equations(ModelClass::Ode, Logger::new());

        assert!(model.evaluator(EvaluationMode::Interpreted).is_none());
        assert_eq!(model.nla_system_count(), 0);
        assert_eq!(VariableDescriptor::new("c", "x", "mV").qualified_name(), "c/x");
    }
}
