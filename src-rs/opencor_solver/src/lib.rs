//! Solvers for the OpenCOR engine
//!
//! A [`Solver`] is a closed set of numerical methods, each carrying a typed
//! set of properties. Properties can be read and written through their KISAO
//! id or their human-readable name, as SED-ML documents and user interfaces
//! respectively do. The [`info`] module describes every solver and decides
//! which properties are irrelevant for a given configuration.
//!
//! The [`kernel`] module holds the numerical methods themselves: an
//! adaptive integrator standing in for CVODE, the fixed-step Runge-Kutta
//! family, and a damped Newton method standing in for KINSOL.

mod cvode;
mod fixed_step;
pub mod info;
pub mod kernel;
mod kinsol;
mod solver;

pub use cvode::{
    CvodeProperties, IntegrationMethod, IterationType, LinearSolver, Preconditioner,
};
pub use fixed_step::FixedStepProperties;
pub use info::{SolverInfo, SolverProperty, SolverPropertyType, SolverType, solver_info, solvers};
pub use kinsol::{KinsolLinearSolver, KinsolProperties};
pub use solver::Solver;

/// KISAO ids of the supported solvers and of their parameters
pub mod kisao {
    /// CVODE
    pub const CVODE: &str = "KISAO:0000019";
    /// Forward Euler
    pub const FORWARD_EULER: &str = "KISAO:0000030";
    /// Fourth-order Runge-Kutta
    pub const FOURTH_ORDER_RUNGE_KUTTA: &str = "KISAO:0000032";
    /// Heun
    pub const HEUN: &str = "KISAO:0000301";
    /// Second-order Runge-Kutta
    pub const SECOND_ORDER_RUNGE_KUTTA: &str = "KISAO:0000381";
    /// KINSOL
    pub const KINSOL: &str = "KISAO:0000282";

    /// Maximum step (CVODE)
    pub const MAXIMUM_STEP: &str = "KISAO:0000467";
    /// Maximum number of steps (CVODE)
    pub const MAXIMUM_NUMBER_OF_STEPS: &str = "KISAO:0000415";
    /// Integration method (CVODE)
    pub const INTEGRATION_METHOD: &str = "KISAO:0000475";
    /// Iteration type (CVODE)
    pub const ITERATION_TYPE: &str = "KISAO:0000476";
    /// Linear solver (CVODE and KINSOL)
    pub const LINEAR_SOLVER: &str = "KISAO:0000477";
    /// Preconditioner (CVODE)
    pub const PRECONDITIONER: &str = "KISAO:0000478";
    /// Upper half-bandwidth (CVODE and KINSOL)
    pub const UPPER_HALF_BANDWIDTH: &str = "KISAO:0000479";
    /// Lower half-bandwidth (CVODE and KINSOL)
    pub const LOWER_HALF_BANDWIDTH: &str = "KISAO:0000480";
    /// Relative tolerance (CVODE)
    pub const RELATIVE_TOLERANCE: &str = "KISAO:0000209";
    /// Absolute tolerance (CVODE)
    pub const ABSOLUTE_TOLERANCE: &str = "KISAO:0000211";
    /// Interpolate solution (CVODE)
    pub const INTERPOLATE_SOLUTION: &str = "KISAO:0000481";
    /// Step (fixed-step solvers)
    pub const STEP: &str = "KISAO:0000483";
    /// Maximum number of iterations (KINSOL)
    pub const MAXIMUM_NUMBER_OF_ITERATIONS: &str = "KISAO:0000486";
}
