//! Equation evaluation
//!
//! An [`EquationEvaluator`] computes the variables of a model following its
//! [`ModelEquations`]. The [`Interpreter`] walks the expression trees on
//! every call, while the [`CompiledModel`] turns them into closures once.
//! Both share the sequencing of the equations and evaluate expressions in
//! the same order, so their results are identical.

mod compiled;
mod interpreter;

use crate::{
    equations::{ModelEquations, Step},
    expr::VariableRef,
};

pub use compiled::CompiledModel;
pub use interpreter::Interpreter;

/// How model equations are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvaluationMode {
    /// Equations are compiled once into closures
    #[default]
    Compiled,
    /// Expression trees are walked on every evaluation
    Interpreted,
}

/// The values of the non-state variables of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableValues {
    /// The constants
    pub constants: Vec<f64>,
    /// The computed constants
    pub computed_constants: Vec<f64>,
    /// The algebraic variables
    pub algebraic: Vec<f64>,
}

impl VariableValues {
    /// Creates storage for the given numbers of variables, all NaN
    #[must_use]
    pub fn new(constant_count: usize, computed_constant_count: usize, algebraic_count: usize) -> Self {
        Self {
            constants: vec![f64::NAN; constant_count],
            computed_constants: vec![f64::NAN; computed_constant_count],
            algebraic: vec![f64::NAN; algebraic_count],
        }
    }

    fn slot(&mut self, variable: VariableRef) -> Option<&mut f64> {
        match variable {
            VariableRef::Constant(index) => self.constants.get_mut(index),
            VariableRef::ComputedConstant(index) => self.computed_constants.get_mut(index),
            VariableRef::Algebraic(index) => self.algebraic.get_mut(index),
            VariableRef::Voi | VariableRef::State(_) => None,
        }
    }

    fn set(&mut self, variable: VariableRef, value: f64) {
        if let Some(slot) = self.slot(variable) {
            *slot = value;
        }
    }
}

/// Solves the non-linear systems of a model.
///
/// Failures are the implementor's to record: the unknowns are used as they
/// are left.
pub trait NlaSolve {
    /// Solves system `index`, where `residuals` computes `F(u)` and
    /// `unknowns` holds the initial guess on entry and the solution on exit
    fn solve(&mut self, index: usize, residuals: &mut dyn FnMut(&[f64], &mut [f64]), unknowns: &mut [f64]);
}

impl<F> NlaSolve for F
where
    F: FnMut(usize, &mut dyn FnMut(&[f64], &mut [f64]), &mut [f64]),
{
    fn solve(&mut self, index: usize, residuals: &mut dyn FnMut(&[f64], &mut [f64]), unknowns: &mut [f64]) {
        self(index, residuals, unknowns);
    }
}

/// Computes the variables of a model.
pub trait EquationEvaluator: Send + Sync {
    /// Sets the states to their initial values, the constants to their
    /// values and the unknowns of non-linear systems to their initial
    /// guesses. Every other variable is set to NaN.
    fn initialise_variables(&self, voi: f64, states: &mut [f64], variables: &mut VariableValues);

    /// Computes the computed constants
    fn compute_computed_constants(&self, variables: &mut VariableValues, nla: &mut dyn NlaSolve);

    /// Computes the rates, and the algebraic variables they depend on
    fn compute_rates(
        &self,
        voi: f64,
        states: &[f64],
        rates: &mut [f64],
        variables: &mut VariableValues,
        nla: &mut dyn NlaSolve,
    );

    /// Computes the algebraic variables
    fn compute_variables(&self, voi: f64, states: &[f64], variables: &mut VariableValues, nla: &mut dyn NlaSolve);
}

/// What an expression is evaluated against.
pub(crate) struct Scope<'a> {
    pub voi: f64,
    pub states: &'a [f64],
    pub variables: &'a VariableValues,
}

impl Scope<'_> {
    pub(crate) fn value(&self, variable: VariableRef) -> f64 {
        let value = match variable {
            VariableRef::Voi => Some(&self.voi),
            VariableRef::State(index) => self.states.get(index),
            VariableRef::Constant(index) => self.variables.constants.get(index),
            VariableRef::ComputedConstant(index) => self.variables.computed_constants.get(index),
            VariableRef::Algebraic(index) => self.variables.algebraic.get(index),
        };

        value.copied().unwrap_or(f64::NAN)
    }
}

/// An expression in a form that can be evaluated.
pub(crate) trait Evaluate {
    fn evaluate(&self, scope: &Scope<'_>) -> f64;
}

fn initialise_variables<E: Evaluate>(
    equations: &ModelEquations<E>,
    voi: f64,
    states: &mut [f64],
    variables: &mut VariableValues,
) {
    variables.constants.clone_from(&equations.constant_values);
    variables.computed_constants.fill(f64::NAN);
    variables.algebraic.fill(f64::NAN);

    for (variable, guess) in &equations.initial_guesses {
        variables.set(*variable, *guess);
    }

    let scope = Scope {
        voi,
        states: &[],
        variables,
    };
    let initial_values: Vec<f64> = equations
        .state_initial_values
        .iter()
        .map(|expr| expr.evaluate(&scope))
        .collect();

    for (state, value) in states.iter_mut().zip(initial_values) {
        *state = value;
    }
}

fn run_steps<E: Evaluate>(
    steps: &[Step<E>],
    voi: f64,
    states: &[f64],
    variables: &mut VariableValues,
    nla: &mut dyn NlaSolve,
) {
    for step in steps {
        match step {
            Step::Assign { target, expr } => {
                let value = expr.evaluate(&Scope {
                    voi,
                    states,
                    variables,
                });

                variables.set(*target, value);
            }
            Step::Solve(block) => {
                // unknowns without an initial guess start from 0
                let mut unknowns: Vec<f64> = block
                    .unknowns
                    .iter()
                    .map(|unknown| {
                        let value = Scope {
                            voi,
                            states,
                            variables,
                        }
                        .value(*unknown);

                        if value.is_finite() { value } else { 0.0 }
                    })
                    .collect();

                nla.solve(
                    block.index,
                    &mut |u: &[f64], f: &mut [f64]| {
                        for (unknown, value) in block.unknowns.iter().zip(u) {
                            variables.set(*unknown, *value);
                        }

                        let scope = Scope {
                            voi,
                            states,
                            variables,
                        };

                        for (residual, expr) in f.iter_mut().zip(&block.residuals) {
                            *residual = expr.evaluate(&scope);
                        }
                    },
                    &mut unknowns,
                );

                for (unknown, value) in block.unknowns.iter().zip(unknowns) {
                    variables.set(*unknown, value);
                }
            }
        }
    }
}

fn compute_rates<E: Evaluate>(
    equations: &ModelEquations<E>,
    voi: f64,
    states: &[f64],
    rates: &mut [f64],
    variables: &mut VariableValues,
    nla: &mut dyn NlaSolve,
) {
    run_steps(&equations.algebraic_steps, voi, states, variables, nla);

    let scope = Scope {
        voi,
        states,
        variables,
    };

    for (rate, expr) in rates.iter_mut().zip(&equations.rates) {
        *rate = expr.evaluate(&scope);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        equations::NlaBlock,
        expr::{BinaryOp, Expr},
    };

    /// x' = -k x with k = 2 (constant 0), x(0) = 1, a computed constant
    /// c = 2 k, an algebraic variable y = x + c, and z solving z^2 = y
    fn equations() -> ModelEquations {
        let k = Expr::Variable(VariableRef::Constant(0));
        let x = Expr::Variable(VariableRef::State(0));
        let z = Expr::Variable(VariableRef::Algebraic(1));

        ModelEquations {
            state_initial_values: vec![Expr::Number(1.0)],
            constant_values: vec![2.0],
            initial_guesses: vec![(VariableRef::Algebraic(1), 1.0)],
            computed_constant_steps: vec![Step::Assign {
                target: VariableRef::ComputedConstant(0),
                expr: Expr::binary(BinaryOp::Multiply, Expr::Number(2.0), k.clone()),
            }],
            rates: vec![Expr::unary(
                crate::expr::UnaryOp::Negate,
                Expr::binary(BinaryOp::Multiply, k, x.clone()),
            )],
            algebraic_steps: vec![
                Step::Assign {
                    target: VariableRef::Algebraic(0),
                    expr: Expr::binary(BinaryOp::Add, x, Expr::Variable(VariableRef::ComputedConstant(0))),
                },
                Step::Solve(NlaBlock {
                    index: 0,
                    unknowns: vec![VariableRef::Algebraic(1)],
                    residuals: vec![Expr::binary(
                        BinaryOp::Subtract,
                        Expr::binary(BinaryOp::Multiply, z.clone(), z),
                        Expr::Variable(VariableRef::Algebraic(0)),
                    )],
                }),
            ],
            nla_system_count: 1,
        }
    }

    /// One-dimensional Newton iterations with a finite-difference derivative
    fn newton(_index: usize, residuals: &mut dyn FnMut(&[f64], &mut [f64]), unknowns: &mut [f64]) {
        let mut f = [0.0];
        let mut g = [0.0];

        for _ in 0..50 {
            residuals(unknowns, &mut f);
            residuals(&[unknowns[0] + 1e-7], &mut g);
            unknowns[0] -= f[0] / ((g[0] - f[0]) / 1e-7);
        }
    }

    fn check(evaluator: &dyn EquationEvaluator) {
        let mut states = [0.0];
        let mut rates = [0.0];
        let mut variables = VariableValues::new(1, 1, 2);
        let mut nla = newton;

        evaluator.initialise_variables(0.0, &mut states, &mut variables);

        assert!((states[0] - 1.0).abs() < f64::EPSILON);
        assert!(variables.computed_constants[0].is_nan());
        assert!((variables.algebraic[1] - 1.0).abs() < f64::EPSILON);

        evaluator.compute_computed_constants(&mut variables, &mut nla);
        evaluator.compute_rates(0.0, &states, &mut rates, &mut variables, &mut nla);
        evaluator.compute_variables(0.0, &states, &mut variables, &mut nla);

        assert!((variables.computed_constants[0] - 4.0).abs() < f64::EPSILON);
        assert!((rates[0] + 2.0).abs() < f64::EPSILON);
        assert!((variables.algebraic[0] - 5.0).abs() < f64::EPSILON);
        assert!((variables.algebraic[1] - 5.0_f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn interpreter_follows_the_equations() {
        check(&Interpreter::new(Arc::new(equations())));
    }

    #[test]
    fn compiled_model_follows_the_equations() {
        check(&CompiledModel::new(&equations()));
    }
}
