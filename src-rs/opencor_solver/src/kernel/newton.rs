//! Damped Newton iterations for non-linear algebraic systems

use super::{
    KernelError, NlaKernel, NlaSystem, all_finite,
    iteration::{IterationMatrix, LinearMethod},
    max_norm,
};

const RESIDUAL_TOLERANCE: f64 = 1.0e-10;
// residuals below this are accepted once the iterations stagnate, since
// rounding errors may prevent reaching RESIDUAL_TOLERANCE
const STAGNATION_RESIDUAL_TOLERANCE: f64 = 1.0e-6;
const STEP_TOLERANCE: f64 = 1.0e-14;
const MINIMUM_DAMPING: f64 = 1.0e-10;
const SUFFICIENT_DECREASE: f64 = 1.0e-4;

fn squared_norm(values: &[f64]) -> f64 {
    values.iter().map(|value| value * value).sum()
}

/// A Newton solver with a backtracking line search.
#[derive(Debug, Clone)]
pub struct NewtonKernel {
    linear_method: LinearMethod,
    maximum_iterations: usize,
}

impl NewtonKernel {
    /// Creates a solver
    #[must_use]
    pub const fn new(linear_method: LinearMethod, maximum_iterations: usize) -> Self {
        Self {
            linear_method,
            maximum_iterations,
        }
    }
}

impl NlaKernel for NewtonKernel {
    fn solve(&self, system: &mut dyn NlaSystem, unknowns: &mut [f64]) -> Result<(), KernelError> {
        let size = unknowns.len();

        if size == 0 {
            return Ok(());
        }

        let mut residuals = vec![0.0; size];

        system.compute_residuals(unknowns, &mut residuals);

        if !all_finite(&residuals) {
            return Err(KernelError::NonFiniteResiduals);
        }

        for iteration in 0..self.maximum_iterations {
            if max_norm(&residuals) <= RESIDUAL_TOLERANCE {
                tracing::trace!(iteration, "newton iterations converged");
                return Ok(());
            }

            // J delta = -F
            let matrix = IterationMatrix::new(
                self.linear_method,
                0.0,
                1.0,
                &mut |u: &[f64], f: &mut [f64]| system.compute_residuals(u, f),
                unknowns,
                &residuals,
            )?;
            let mut delta: Vec<f64> = residuals.iter().map(|value| -value).collect();

            matrix.solve(&mut |u: &[f64], f: &mut [f64]| system.compute_residuals(u, f), &mut delta)?;

            let norm = squared_norm(&residuals);
            let mut damping = 1.0_f64;
            let mut trial = vec![0.0; size];
            let mut trial_residuals = vec![0.0; size];

            loop {
                for ((trial, unknown), delta) in trial.iter_mut().zip(unknowns.iter()).zip(&delta) {
                    *trial = damping.mul_add(*delta, *unknown);
                }

                system.compute_residuals(&trial, &mut trial_residuals);

                if all_finite(&trial_residuals)
                    && squared_norm(&trial_residuals) <= (1.0 - 2.0 * SUFFICIENT_DECREASE * damping) * norm
                {
                    break;
                }

                damping *= 0.5;

                if damping < MINIMUM_DAMPING {
                    return if max_norm(&residuals) <= STAGNATION_RESIDUAL_TOLERANCE {
                        Ok(())
                    } else {
                        Err(KernelError::LineSearchFailure)
                    };
                }
            }

            let relative_step = unknowns
                .iter()
                .zip(&trial)
                .map(|(old, new)| (new - old).abs() / old.abs().max(1.0))
                .fold(0.0, f64::max);

            unknowns.copy_from_slice(&trial);
            residuals.copy_from_slice(&trial_residuals);

            if relative_step <= STEP_TOLERANCE && max_norm(&residuals) <= STAGNATION_RESIDUAL_TOLERANCE {
                return Ok(());
            }
        }

        if max_norm(&residuals) <= RESIDUAL_TOLERANCE {
            Ok(())
        } else {
            Err(KernelError::MaximumIterations {
                maximum: self.maximum_iterations,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KrylovMethod;

    // x^2 + y^2 = 4 and x = y, with the positive root x = y = sqrt(2)
    fn circle(u: &[f64], f: &mut [f64]) {
        f[0] = u[0].mul_add(u[0], u[1] * u[1]) - 4.0;
        f[1] = u[0] - u[1];
    }

    #[test]
    fn every_linear_method_finds_the_root() {
        let methods = [
            LinearMethod::Dense,
            LinearMethod::Banded { upper: 1, lower: 1 },
            LinearMethod::Krylov {
                method: KrylovMethod::Gmres,
                preconditioner: None,
            },
            LinearMethod::Krylov {
                method: KrylovMethod::BiCgStab,
                preconditioner: None,
            },
            LinearMethod::Krylov {
                method: KrylovMethod::Tfqmr,
                preconditioner: None,
            },
        ];

        for method in methods {
            let mut unknowns = [1.0, 0.5];

            NewtonKernel::new(method, 200)
                .solve(&mut circle, &mut unknowns)
                .unwrap_or_else(|error| panic!("{method:?}: {error}"));

            for value in unknowns {
                assert!((value - 2.0_f64.sqrt()).abs() < 1e-8, "{method:?}: {unknowns:?}");
            }
        }
    }

    #[test]
    fn scalar_equation() {
        // cos(u) = u
        let mut system = |u: &[f64], f: &mut [f64]| f[0] = u[0].cos() - u[0];
        let mut unknowns = [0.0];

        NewtonKernel::new(LinearMethod::Dense, 200)
            .solve(&mut system, &mut unknowns)
            .expect("equation has a root");

        assert!((unknowns[0] - 0.739_085_133_215_160_6).abs() < 1e-9);
    }

    #[test]
    fn equation_without_root_fails() {
        let mut system = |u: &[f64], f: &mut [f64]| f[0] = u[0].mul_add(u[0], 1.0);
        let mut unknowns = [1.0];

        let result = NewtonKernel::new(LinearMethod::Dense, 50).solve(&mut system, &mut unknowns);

        assert!(matches!(result, Err(_)));
    }

    #[test]
    fn iteration_limit_is_reported() {
        let mut unknowns = [100.0, -50.0];

        assert_eq!(
            NewtonKernel::new(LinearMethod::Dense, 1).solve(&mut circle, &mut unknowns),
            Err(KernelError::MaximumIterations { maximum: 1 })
        );
    }

    #[test]
    fn non_finite_residuals_are_reported() {
        let mut system = |u: &[f64], f: &mut [f64]| f[0] = u[0].ln();
        let mut unknowns = [-1.0];

        assert_eq!(
            NewtonKernel::new(LinearMethod::Dense, 10).solve(&mut system, &mut unknowns),
            Err(KernelError::NonFiniteResiduals)
        );
    }
}
