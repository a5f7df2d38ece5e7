//! Fixed-step explicit Runge-Kutta methods

use opencor_shared::number::fuzzy_compare;

use super::{KernelError, OdeKernel, OdeSystem, all_finite};

/// The method used by a [`FixedStepKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedStepMethod {
    /// First order
    ForwardEuler,
    /// Second order, trapezoidal
    Heun,
    /// Second order, midpoint
    SecondOrderRungeKutta,
    /// Classical fourth order
    FourthOrderRungeKutta,
}

/// A fixed-step ODE integrator.
///
/// Output points are reached exactly: the last step before an output point
/// is shortened if needed.
#[derive(Debug, Clone)]
pub struct FixedStepKernel {
    method: FixedStepMethod,
    step: f64,
}

impl FixedStepKernel {
    /// Creates an integrator with the given step
    #[must_use]
    pub const fn new(method: FixedStepMethod, step: f64) -> Self {
        Self { method, step }
    }

    /// Advances `states` by `step` from `voi`.
    fn advance(&self, system: &mut dyn OdeSystem, voi: f64, states: &mut [f64], step: f64) {
        let size = states.len();
        let mut k1 = vec![0.0; size];

        system.compute_rates(voi, states, &mut k1);

        match self.method {
            FixedStepMethod::ForwardEuler => {
                for (state, rate) in states.iter_mut().zip(&k1) {
                    *state = step.mul_add(*rate, *state);
                }
            }
            FixedStepMethod::Heun => {
                let predicted: Vec<f64> = states.iter().zip(&k1).map(|(y, k)| step.mul_add(*k, *y)).collect();
                let mut k2 = vec![0.0; size];

                system.compute_rates(voi + step, &predicted, &mut k2);

                for ((state, k1), k2) in states.iter_mut().zip(&k1).zip(&k2) {
                    *state += 0.5 * step * (k1 + k2);
                }
            }
            FixedStepMethod::SecondOrderRungeKutta => {
                let half_step = 0.5 * step;
                let midpoint: Vec<f64> = states.iter().zip(&k1).map(|(y, k)| half_step.mul_add(*k, *y)).collect();
                let mut k2 = vec![0.0; size];

                system.compute_rates(voi + half_step, &midpoint, &mut k2);

                for (state, rate) in states.iter_mut().zip(&k2) {
                    *state = step.mul_add(*rate, *state);
                }
            }
            FixedStepMethod::FourthOrderRungeKutta => {
                let half_step = 0.5 * step;
                let shifted = |rates: &[f64], factor: f64, states: &[f64]| -> Vec<f64> {
                    states.iter().zip(rates).map(|(y, k)| factor.mul_add(*k, *y)).collect()
                };
                let mut k2 = vec![0.0; size];
                let mut k3 = vec![0.0; size];
                let mut k4 = vec![0.0; size];

                system.compute_rates(voi + half_step, &shifted(&k1, half_step, states), &mut k2);
                system.compute_rates(voi + half_step, &shifted(&k2, half_step, states), &mut k3);
                system.compute_rates(voi + step, &shifted(&k3, step, states), &mut k4);

                for (index, state) in states.iter_mut().enumerate() {
                    *state += step / 6.0 * (k1[index] + 2.0 * (k2[index] + k3[index]) + k4[index]);
                }
            }
        }
    }
}

impl OdeKernel for FixedStepKernel {
    fn initialise(&mut self, _system: &mut dyn OdeSystem, _voi: f64, _states: &[f64]) {}

    fn solve(
        &mut self,
        system: &mut dyn OdeSystem,
        voi: &mut f64,
        states: &mut [f64],
        voi_end: f64,
    ) -> Result<(), KernelError> {
        let voi_start = *voi;
        let mut counter = 0.0_f64;
        let mut step = self.step;

        while !fuzzy_compare(*voi, voi_end) {
            if *voi + step > voi_end {
                step = voi_end - *voi;
            }

            self.advance(system, *voi, states, step);

            if !all_finite(states) {
                return Err(KernelError::NonFiniteValue { voi: *voi });
            }

            // voi is recomputed from the start to avoid accumulating rounding
            // errors, except for a shortened last step
            counter += 1.0;
            *voi = if fuzzy_compare(step, self.step) {
                counter.mul_add(self.step, voi_start)
            } else {
                voi_end
            };
        }

        Ok(())
    }
}
