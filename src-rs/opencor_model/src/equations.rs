//! Ordered equations of an analysed model

use crate::expr::{Expr, VariableRef};

/// A system of non-linear algebraic equations, solved for its unknowns.
#[derive(Debug, Clone, PartialEq)]
pub struct NlaBlock<E = Expr> {
    pub(crate) index: usize,
    pub(crate) unknowns: Vec<VariableRef>,
    pub(crate) residuals: Vec<E>,
}

impl<E> NlaBlock<E> {
    /// Returns the index of the system in the model
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns the variables the system is solved for
    #[must_use]
    pub fn unknowns(&self) -> &[VariableRef] {
        &self.unknowns
    }

    /// Returns the residuals, `left - right` for every equation
    #[must_use]
    pub fn residuals(&self) -> &[E] {
        &self.residuals
    }
}

/// One step of the computation of a group of variables.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<E = Expr> {
    /// An explicit equation
    Assign {
        /// The computed variable
        target: VariableRef,
        /// Its value
        expr: E,
    },
    /// Non-linear algebraic equations
    Solve(NlaBlock<E>),
}

/// The equations of a model, ordered so that every variable is computed
/// before it is used.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEquations<E = Expr> {
    pub(crate) state_initial_values: Vec<E>,
    pub(crate) constant_values: Vec<f64>,
    pub(crate) initial_guesses: Vec<(VariableRef, f64)>,
    pub(crate) computed_constant_steps: Vec<Step<E>>,
    pub(crate) rates: Vec<E>,
    pub(crate) algebraic_steps: Vec<Step<E>>,
    pub(crate) nla_system_count: usize,
}

impl<E> ModelEquations<E> {
    /// Returns the initial value of every state, which only depends on
    /// constants
    #[must_use]
    pub fn state_initial_values(&self) -> &[E] {
        &self.state_initial_values
    }

    /// Returns the value of every constant
    #[must_use]
    pub fn constant_values(&self) -> &[f64] {
        &self.constant_values
    }

    /// Returns the initial guesses of the unknowns of non-linear systems
    #[must_use]
    pub fn initial_guesses(&self) -> &[(VariableRef, f64)] {
        &self.initial_guesses
    }

    /// Returns the steps computing the computed constants
    #[must_use]
    pub fn computed_constant_steps(&self) -> &[Step<E>] {
        &self.computed_constant_steps
    }

    /// Returns the rate of every state
    #[must_use]
    pub fn rates(&self) -> &[E] {
        &self.rates
    }

    /// Returns the steps computing the algebraic variables
    #[must_use]
    pub fn algebraic_steps(&self) -> &[Step<E>] {
        &self.algebraic_steps
    }

    /// Returns the number of non-linear systems
    #[must_use]
    pub const fn nla_system_count(&self) -> usize {
        self.nla_system_count
    }

    /// Converts every expression, keeping the structure.
    pub(crate) fn map<F>(&self, convert: &impl Fn(&E) -> F) -> ModelEquations<F> {
        let map_steps = |steps: &[Step<E>]| {
            steps
                .iter()
                .map(|step| match step {
                    Step::Assign { target, expr } => Step::Assign {
                        target: *target,
                        expr: convert(expr),
                    },
                    Step::Solve(block) => Step::Solve(NlaBlock {
                        index: block.index,
                        unknowns: block.unknowns.clone(),
                        residuals: block.residuals.iter().map(convert).collect(),
                    }),
                })
                .collect()
        };

        ModelEquations {
            state_initial_values: self.state_initial_values.iter().map(convert).collect(),
            constant_values: self.constant_values.clone(),
            initial_guesses: self.initial_guesses.clone(),
            computed_constant_steps: map_steps(&self.computed_constant_steps),
            rates: self.rates.iter().map(convert).collect(),
            algebraic_steps: map_steps(&self.algebraic_steps),
            nla_system_count: self.nla_system_count,
        }
    }
}
