use std::sync::Arc;

use super::{EquationEvaluator, Evaluate, NlaSolve, Scope, VariableValues};
use crate::{equations::ModelEquations, expr::Expr};

impl Evaluate for Expr {
    fn evaluate(&self, scope: &Scope<'_>) -> f64 {
        match self {
            Self::Number(value) => *value,
            Self::Variable(variable) => scope.value(*variable),
            Self::Unary { op, operand } => op.apply(operand.evaluate(scope)),
            Self::Binary { op, left, right } => op.apply(left.evaluate(scope), right.evaluate(scope)),
            Self::Call { function, argument } => function.apply(argument.evaluate(scope)),
            Self::Piecewise { pieces, otherwise } => pieces
                .iter()
                .find(|(_, condition)| condition.evaluate(scope) != 0.0)
                .map(|(value, _)| value.evaluate(scope))
                .or_else(|| otherwise.as_ref().map(|otherwise| otherwise.evaluate(scope)))
                .unwrap_or(f64::NAN),
        }
    }
}

/// Evaluates model equations by walking their expression trees.
#[derive(Debug, Clone)]
pub struct Interpreter {
    equations: Arc<ModelEquations>,
}

impl Interpreter {
    /// Creates an interpreter for the given equations
    #[must_use]
    pub const fn new(equations: Arc<ModelEquations>) -> Self {
        Self { equations }
    }
}

impl EquationEvaluator for Interpreter {
    fn initialise_variables(&self, voi: f64, states: &mut [f64], variables: &mut VariableValues) {
        super::initialise_variables(&self.equations, voi, states, variables);
    }

    fn compute_computed_constants(&self, variables: &mut VariableValues, nla: &mut dyn NlaSolve) {
        super::run_steps(&self.equations.computed_constant_steps, 0.0, &[], variables, nla);
    }

    fn compute_rates(
        &self,
        voi: f64,
        states: &[f64],
        rates: &mut [f64],
        variables: &mut VariableValues,
        nla: &mut dyn NlaSolve,
    ) {
        super::compute_rates(&self.equations, voi, states, rates, variables, nla);
    }

    fn compute_variables(&self, voi: f64, states: &[f64], variables: &mut VariableValues, nla: &mut dyn NlaSolve) {
        super::run_steps(&self.equations.algebraic_steps, voi, states, variables, nla);
    }
}
