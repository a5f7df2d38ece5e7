//! Numerical kernels
//!
//! Kernels only see the model through the [`OdeSystem`] and [`NlaSystem`]
//! traits, so they work the same whether equations are compiled or
//! interpreted. Failures are returned as [`KernelError`]s; turning them into
//! user-facing issues is the caller's job.

mod adaptive;
mod fixed_step;
mod iteration;
mod krylov;
mod linear;
mod newton;

use thiserror::Error;

pub use adaptive::{AdaptiveKernel, AdaptiveMethod, AdaptiveOptions};
pub use fixed_step::{FixedStepKernel, FixedStepMethod};
pub use iteration::LinearMethod;
pub use krylov::KrylovMethod;
pub use newton::NewtonKernel;

/// The right-hand side of a system of ordinary differential equations.
pub trait OdeSystem {
    /// Computes the rates of the states at the given point
    fn compute_rates(&mut self, voi: f64, states: &[f64], rates: &mut [f64]);
}

impl<F> OdeSystem for F
where
    F: FnMut(f64, &[f64], &mut [f64]),
{
    fn compute_rates(&mut self, voi: f64, states: &[f64], rates: &mut [f64]) {
        self(voi, states, rates);
    }
}

/// A system of non-linear algebraic equations `F(u) = 0`.
pub trait NlaSystem {
    /// Computes the residuals of the system for the given unknowns
    fn compute_residuals(&mut self, unknowns: &[f64], residuals: &mut [f64]);
}

impl<F> NlaSystem for F
where
    F: FnMut(&[f64], &mut [f64]),
{
    fn compute_residuals(&mut self, unknowns: &[f64], residuals: &mut [f64]) {
        self(unknowns, residuals);
    }
}

/// An ODE integrator.
///
/// An integrator keeps its own internal state between calls to
/// [`OdeKernel::solve`], so it must be (re)initialised whenever the states
/// are changed from outside.
pub trait OdeKernel: Send + std::fmt::Debug {
    /// Restarts the integration from the given point
    fn initialise(&mut self, system: &mut dyn OdeSystem, voi: f64, states: &[f64]);

    /// Integrates up to `voi_end`, updating `voi` and `states`
    ///
    /// # Errors
    ///
    /// Returns an error if the integration cannot reach `voi_end`. In that
    /// case `voi` and `states` hold the last point that was reached.
    fn solve(
        &mut self,
        system: &mut dyn OdeSystem,
        voi: &mut f64,
        states: &mut [f64],
        voi_end: f64,
    ) -> Result<(), KernelError>;
}

/// A solver for non-linear algebraic systems.
pub trait NlaKernel: Send + std::fmt::Debug {
    /// Solves `F(u) = 0`, using `unknowns` as the initial guess and storing
    /// the solution in it
    ///
    /// # Errors
    ///
    /// Returns an error if no solution could be found.
    fn solve(&self, system: &mut dyn NlaSystem, unknowns: &mut [f64]) -> Result<(), KernelError>;
}

/// An error raised by a numerical kernel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// The maximum number of steps was taken before reaching the output point
    #[error("At voi = {voi}, {maximum} steps were taken before reaching {voi_end}")]
    TooManySteps {
        /// Where the integration stopped
        voi: f64,
        /// The output point that was not reached
        voi_end: f64,
        /// The maximum number of steps
        maximum: usize,
    },
    /// The step size fell below what the floating-point precision allows
    #[error("At voi = {voi}, the step size became too small")]
    StepSizeTooSmall {
        /// Where the integration stopped
        voi: f64,
    },
    /// The stage equations could not be solved, even with reduced steps
    #[error("At voi = {voi}, the corrector failed to converge repeatedly")]
    ConvergenceFailure {
        /// Where the integration stopped
        voi: f64,
    },
    /// The local error could not be brought within the tolerances
    #[error("At voi = {voi}, the error test failed repeatedly")]
    ErrorTestFailure {
        /// Where the integration stopped
        voi: f64,
    },
    /// The rates or residuals evaluated to NaN or infinity
    #[error("At voi = {voi}, the system evaluated to a non-finite value")]
    NonFiniteValue {
        /// Where the integration stopped
        voi: f64,
    },
    /// The Newton iterations did not converge
    #[error("The maximum number of iterations ({maximum}) was reached without convergence")]
    MaximumIterations {
        /// The maximum number of iterations
        maximum: usize,
    },
    /// The line search could not reduce the residuals
    #[error("The line search could not find a step reducing the residuals")]
    LineSearchFailure,
    /// The residuals evaluated to NaN or infinity
    #[error("The residuals evaluated to a non-finite value")]
    NonFiniteResiduals,
    /// The linear system of a Newton iteration could not be solved
    #[error("The linear system could not be solved ({0})")]
    Linear(#[from] LinearError),
}

/// An error raised while solving a linear system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinearError {
    /// The matrix is singular
    #[error("the matrix is singular")]
    Singular,
    /// The iterative solver did not converge
    #[error("the iterative solver did not converge")]
    NoConvergence,
}

/// Weighted root-mean-square norm.
fn wrms_norm(values: &[f64], weights: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let sum: f64 = values
        .iter()
        .zip(weights)
        .map(|(value, weight)| (value * weight).powi(2))
        .sum();

    #[expect(clippy::cast_precision_loss, reason = "system sizes are small")]
    let size = values.len() as f64;

    (sum / size).sqrt()
}

/// Maximum absolute value.
fn max_norm(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |norm, value| norm.max(value.abs()))
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|value| value.is_finite())
}
