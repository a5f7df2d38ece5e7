//! Adaptive integration
//!
//! Stiff problems are integrated with an L-stable singly diagonally implicit
//! Runge-Kutta method (Hairer and Wanner's SDIRK4, order 4 with an embedded
//! order 3 estimate), non-stiff ones with the Dormand-Prince 5(4) pair. Both
//! share the step size control and the output strategy: either the
//! integrator steps past the output point and interpolates, or its last step
//! is shortened to land on it. Dormand-Prince interpolates with its order 4
//! continuous extension, SDIRK4 with a cubic Hermite over the last step.

use opencor_shared::number::fuzzy_compare;

use super::{
    KernelError, OdeKernel, OdeSystem, all_finite,
    iteration::{IterationMatrix, LinearMethod},
    wrms_norm,
};

const SAFETY: f64 = 0.9;
const MINIMUM_FACTOR: f64 = 0.2;
const MAXIMUM_FACTOR: f64 = 5.0;
const MAXIMUM_FAILURES: usize = 10;
const MAXIMUM_STAGE_ITERATIONS: usize = 10;
const STAGE_TOLERANCE: f64 = 0.03;
const CONVERGENCE_FAILURE_FACTOR: f64 = 0.25;

const SDIRK_GAMMA: f64 = 0.25;
const SDIRK_C: [f64; 5] = [0.25, 0.75, 11.0 / 20.0, 0.5, 1.0];
const SDIRK_A: [[f64; 5]; 5] = [
    [0.25, 0.0, 0.0, 0.0, 0.0],
    [0.5, 0.25, 0.0, 0.0, 0.0],
    [17.0 / 50.0, -1.0 / 25.0, 0.25, 0.0, 0.0],
    [371.0 / 1360.0, -137.0 / 2720.0, 15.0 / 544.0, 0.25, 0.0],
    [25.0 / 24.0, -49.0 / 48.0, 125.0 / 16.0, -85.0 / 12.0, 0.25],
];
// the method is stiffly accurate: the solution is the last stage, and the
// error is the difference with the embedded order 3 weights
const SDIRK_E: [f64; 5] = [
    25.0 / 24.0 - 59.0 / 48.0,
    -49.0 / 48.0 + 17.0 / 96.0,
    125.0 / 16.0 - 225.0 / 32.0,
    0.0,
    0.25,
];

const DOPRI_C: [f64; 7] = [0.0, 0.2, 0.3, 0.8, 8.0 / 9.0, 1.0, 1.0];
const DOPRI_A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.2, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];
const DOPRI_E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339_200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];
const DOPRI_DENSE: [f64; 7] = [
    -12_715_105_075.0 / 11_282_082_432.0,
    0.0,
    87_487_479_700.0 / 32_700_410_799.0,
    -10_690_763_975.0 / 1_880_347_072.0,
    701_980_252_875.0 / 199_316_789_632.0,
    -1_453_857_185.0 / 822_651_844.0,
    69_997_945.0 / 29_380_423.0,
];

/// The method used by an [`AdaptiveKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveMethod {
    /// Implicit method for stiff problems. Stage equations are solved with
    /// Newton iterations using the given linear method, or with functional
    /// iterations if there is none.
    Sdirk {
        /// The linear method of the Newton iterations
        linear_method: Option<LinearMethod>,
    },
    /// Explicit method for non-stiff problems
    DormandPrince,
}

impl AdaptiveMethod {
    /// Order of the error estimate plus one, used by the step size control
    const fn error_exponent(self) -> f64 {
        match self {
            Self::Sdirk { .. } => 0.25,
            Self::DormandPrince => 0.2,
        }
    }
}

/// The settings of an [`AdaptiveKernel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveOptions {
    /// Maximum step, 0 for none
    pub maximum_step: f64,
    /// Maximum number of steps to reach an output point
    pub maximum_number_of_steps: usize,
    /// Relative tolerance
    pub relative_tolerance: f64,
    /// Absolute tolerance
    pub absolute_tolerance: f64,
    /// Whether output points are interpolated rather than stepped onto
    pub interpolate_solution: bool,
}

#[derive(Debug, Clone)]
struct Point {
    voi: f64,
    states: Vec<f64>,
    rates: Vec<f64>,
}

enum StepFailure {
    Convergence,
    NonFinite,
}

struct Trial {
    states: Vec<f64>,
    error: f64,
    // stage derivatives, kept for the continuous extension
    stages: Vec<Vec<f64>>,
}

/// An adaptive ODE integrator.
#[derive(Debug)]
pub struct AdaptiveKernel {
    method: AdaptiveMethod,
    options: AdaptiveOptions,
    current: Point,
    previous: Option<Point>,
    stages: Vec<Vec<f64>>,
    step: f64,
}

impl AdaptiveKernel {
    /// Creates an integrator, which must be initialised before use
    #[must_use]
    pub const fn new(method: AdaptiveMethod, options: AdaptiveOptions) -> Self {
        Self {
            method,
            options,
            current: Point {
                voi: 0.0,
                states: Vec::new(),
                rates: Vec::new(),
            },
            previous: None,
            stages: Vec::new(),
            step: 0.0,
        }
    }

    fn weights(&self, first: &[f64], second: &[f64]) -> Vec<f64> {
        first
            .iter()
            .zip(second)
            .map(|(a, b)| {
                let magnitude = a.abs().max(b.abs());
                let tolerance = self
                    .options
                    .relative_tolerance
                    .mul_add(magnitude, self.options.absolute_tolerance);

                1.0 / tolerance.max(f64::EPSILON * (1.0 + magnitude))
            })
            .collect()
    }

    fn initial_step(&self, remaining: f64) -> f64 {
        let weights = self.weights(&self.current.states, &self.current.states);
        let states_norm = wrms_norm(&self.current.states, &weights);
        let rates_norm = wrms_norm(&self.current.rates, &weights);

        let step = if states_norm < 1.0e-5 || rates_norm < 1.0e-5 {
            1.0e-6
        } else {
            0.01 * states_norm / rates_norm
        };

        self.limit(step.min(remaining))
    }

    fn limit(&self, step: f64) -> f64 {
        if self.options.maximum_step > 0.0 {
            step.min(self.options.maximum_step)
        } else {
            step
        }
    }

    fn minimum_step(&self) -> f64 {
        16.0 * f64::EPSILON * self.current.voi.abs().max(1.0)
    }

    fn factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            MAXIMUM_FACTOR
        } else {
            (SAFETY * error.powf(-self.method.error_exponent())).clamp(MINIMUM_FACTOR, MAXIMUM_FACTOR)
        }
    }

    /// Takes one accepted step towards `voi_end`, retrying with smaller steps
    /// as needed.
    fn take_step(&mut self, system: &mut dyn OdeSystem, voi_end: f64) -> Result<(), KernelError> {
        let voi = self.current.voi;
        let remaining = voi_end - voi;

        if self.step == 0.0 {
            self.step = self.initial_step(remaining);
        }

        let mut step = self.limit(self.step);
        let mut lands = false;
        let mut failures = 0;
        let mut failed = false;

        if !self.options.interpolate_solution && step * 1.05 >= remaining {
            step = remaining;
            lands = true;
        }

        loop {
            if step.abs() < self.minimum_step() {
                return Err(KernelError::StepSizeTooSmall { voi });
            }

            let trial = match self.method {
                AdaptiveMethod::Sdirk { linear_method } => self.sdirk_step(system, step, linear_method),
                AdaptiveMethod::DormandPrince => self.dormand_prince_step(system, step),
            };

            match trial {
                Ok(trial) if trial.error <= 1.0 => {
                    let new_voi = if lands { voi_end } else { voi + step };
                    let mut rates = vec![0.0; trial.states.len()];

                    system.compute_rates(new_voi, &trial.states, &mut rates);

                    if !all_finite(&rates) {
                        return Err(KernelError::NonFiniteValue { voi: new_voi });
                    }

                    let factor = if failed { self.factor(trial.error).min(1.0) } else { self.factor(trial.error) };

                    self.step = step * factor;
                    self.stages = trial.stages;
                    self.previous = Some(std::mem::replace(
                        &mut self.current,
                        Point {
                            voi: new_voi,
                            states: trial.states,
                            rates,
                        },
                    ));

                    tracing::trace!(voi = new_voi, step, error = trial.error, "step accepted");

                    return Ok(());
                }
                Ok(trial) => {
                    failures += 1;

                    if failures > MAXIMUM_FAILURES {
                        return Err(KernelError::ErrorTestFailure { voi });
                    }

                    step *= self.factor(trial.error).min(1.0);
                }
                Err(StepFailure::Convergence) => {
                    failures += 1;

                    if failures > MAXIMUM_FAILURES {
                        return Err(KernelError::ConvergenceFailure { voi });
                    }

                    step *= CONVERGENCE_FAILURE_FACTOR;
                }
                Err(StepFailure::NonFinite) => {
                    failures += 1;

                    if failures > MAXIMUM_FAILURES {
                        return Err(KernelError::NonFiniteValue { voi });
                    }

                    step *= CONVERGENCE_FAILURE_FACTOR;
                }
            }

            tracing::trace!(voi, step, "step rejected");

            failed = true;
            lands = false;
        }
    }

    fn dormand_prince_step(&self, system: &mut dyn OdeSystem, step: f64) -> Result<Trial, StepFailure> {
        let Point { voi, states, rates } = &self.current;
        let size = states.len();
        let mut stages: Vec<Vec<f64>> = vec![rates.clone()];
        let mut stage_states = vec![0.0; size];

        for (i, (c, a)) in DOPRI_C.iter().zip(DOPRI_A).enumerate().skip(1) {
            for (index, value) in stage_states.iter_mut().enumerate() {
                let increment: f64 = stages.iter().zip(&a[..i]).map(|(k, a)| a * k[index]).sum();
                *value = step.mul_add(increment, states[index]);
            }

            let mut k = vec![0.0; size];
            system.compute_rates(c.mul_add(step, *voi), &stage_states, &mut k);

            if !all_finite(&k) {
                return Err(StepFailure::NonFinite);
            }

            stages.push(k);
        }

        // the last stage is evaluated at the new solution
        let new_states = stage_states;
        let error: Vec<f64> = (0..size)
            .map(|index| step * stages.iter().zip(DOPRI_E).map(|(k, e)| e * k[index]).sum::<f64>())
            .collect();

        Ok(Trial {
            error: wrms_norm(&error, &self.weights(states, &new_states)),
            states: new_states,
            stages,
        })
    }

    fn sdirk_step(
        &self,
        system: &mut dyn OdeSystem,
        step: f64,
        linear_method: Option<LinearMethod>,
    ) -> Result<Trial, StepFailure> {
        let Point { voi, states, rates } = &self.current;
        let voi = *voi;
        let size = states.len();
        let gamma_step = SDIRK_GAMMA * step;
        let weights = self.weights(states, states);

        // the iteration matrix I - h * gamma * J is shared by every stage
        let matrix = linear_method
            .map(|method| {
                IterationMatrix::new(
                    method,
                    1.0,
                    -gamma_step,
                    &mut |y: &[f64], f: &mut [f64]| system.compute_rates(voi, y, f),
                    states,
                    rates,
                )
            })
            .transpose()
            .map_err(|_| StepFailure::Convergence)?;

        let mut stages: Vec<Vec<f64>> = Vec::with_capacity(SDIRK_C.len());
        let mut stage_states = states.clone();

        for (i, (c, a)) in SDIRK_C.iter().zip(SDIRK_A).enumerate() {
            let stage_voi = c.mul_add(step, voi);
            let explicit: Vec<f64> = (0..size)
                .map(|index| {
                    let increment: f64 = stages.iter().zip(&a[..i]).map(|(k, a)| a * k[index]).sum();
                    step.mul_add(increment, states[index])
                })
                .collect();

            let guess = stages.last().unwrap_or(rates);

            for ((value, explicit), guess) in stage_states.iter_mut().zip(&explicit).zip(guess) {
                *value = gamma_step.mul_add(*guess, *explicit);
            }

            let mut previous_norm = f64::INFINITY;
            let mut converged = false;
            let mut stage_rates = vec![0.0; size];

            for iteration in 0..MAXIMUM_STAGE_ITERATIONS {
                system.compute_rates(stage_voi, &stage_states, &mut stage_rates);

                if !all_finite(&stage_rates) {
                    return Err(StepFailure::NonFinite);
                }

                // delta = -G(Y), with G(Y) = Y - explicit - h * gamma * f(Y)
                let mut delta: Vec<f64> = (0..size)
                    .map(|index| {
                        gamma_step.mul_add(stage_rates[index], explicit[index]) - stage_states[index]
                    })
                    .collect();

                if let Some(matrix) = &matrix {
                    matrix
                        .solve(&mut |y: &[f64], f: &mut [f64]| system.compute_rates(voi, y, f), &mut delta)
                        .map_err(|_| StepFailure::Convergence)?;
                }

                for (value, delta) in stage_states.iter_mut().zip(&delta) {
                    *value += delta;
                }

                let norm = wrms_norm(&delta, &weights);

                if !norm.is_finite() {
                    return Err(StepFailure::NonFinite);
                }

                if norm <= STAGE_TOLERANCE {
                    converged = true;
                    break;
                }

                if iteration > 1 && norm > 0.9 * previous_norm {
                    break;
                }

                previous_norm = norm;
            }

            if !converged {
                return Err(StepFailure::Convergence);
            }

            stages.push(
                stage_states
                    .iter()
                    .zip(&explicit)
                    .map(|(value, explicit)| (value - explicit) / gamma_step)
                    .collect(),
            );
        }

        let mut error: Vec<f64> = (0..size)
            .map(|index| step * stages.iter().zip(SDIRK_E).map(|(k, e)| e * k[index]).sum::<f64>())
            .collect();

        // filter the estimate through the iteration matrix, which keeps it
        // meaningful on stiff components
        if let Some(matrix) = matrix.as_ref().filter(|matrix| matrix.is_explicit()) {
            matrix
                .solve(&mut |y: &[f64], f: &mut [f64]| system.compute_rates(voi, y, f), &mut error)
                .map_err(|_| StepFailure::Convergence)?;
        }

        Ok(Trial {
            error: wrms_norm(&error, &self.weights(states, &stage_states)),
            states: stage_states,
            stages: Vec::new(),
        })
    }

    fn interpolate(&self, voi: f64, states: &mut [f64]) {
        let Some(previous) = &self.previous else {
            states.copy_from_slice(&self.current.states);
            return;
        };

        let step = self.current.voi - previous.voi;
        let theta = (voi - previous.voi) / step;

        if self.stages.len() == DOPRI_DENSE.len() {
            let theta1 = 1.0 - theta;

            for (index, value) in states.iter_mut().enumerate() {
                let difference = self.current.states[index] - previous.states[index];
                let start = step.mul_add(previous.rates[index], -difference);
                let end = step.mul_add(-self.current.rates[index], difference) - start;
                let correction = step * self.stages.iter().zip(DOPRI_DENSE).map(|(k, d)| d * k[index]).sum::<f64>();

                *value = theta.mul_add(
                    theta1.mul_add(theta.mul_add(theta1.mul_add(correction, end), start), difference),
                    previous.states[index],
                );
            }

            return;
        }

        let theta2 = theta * theta;
        let theta3 = theta2 * theta;
        let h00 = 2.0_f64.mul_add(theta3, -3.0 * theta2) + 1.0;
        let h10 = theta3 - 2.0 * theta2 + theta;
        let h01 = (-2.0_f64).mul_add(theta3, 3.0 * theta2);
        let h11 = theta3 - theta2;

        for (index, value) in states.iter_mut().enumerate() {
            *value = h00 * previous.states[index]
                + h10 * step * previous.rates[index]
                + h01 * self.current.states[index]
                + h11 * step * self.current.rates[index];
        }
    }
}

impl OdeKernel for AdaptiveKernel {
    fn initialise(&mut self, system: &mut dyn OdeSystem, voi: f64, states: &[f64]) {
        let mut rates = vec![0.0; states.len()];

        system.compute_rates(voi, states, &mut rates);

        self.current = Point {
            voi,
            states: states.to_vec(),
            rates,
        };
        self.previous = None;
        self.stages.clear();
        self.step = 0.0;
    }

    fn solve(
        &mut self,
        system: &mut dyn OdeSystem,
        voi: &mut f64,
        states: &mut [f64],
        voi_end: f64,
    ) -> Result<(), KernelError> {
        let mut steps = 0;

        loop {
            if fuzzy_compare(self.current.voi, voi_end) {
                *voi = voi_end;
                states.copy_from_slice(&self.current.states);
                return Ok(());
            }

            if self.current.voi > voi_end {
                *voi = voi_end;
                self.interpolate(voi_end, states);
                return Ok(());
            }

            if steps == self.options.maximum_number_of_steps {
                *voi = self.current.voi;
                states.copy_from_slice(&self.current.states);

                return Err(KernelError::TooManySteps {
                    voi: self.current.voi,
                    voi_end,
                    maximum: self.options.maximum_number_of_steps,
                });
            }

            steps += 1;

            if let Err(error) = self.take_step(system, voi_end) {
                *voi = self.current.voi;
                states.copy_from_slice(&self.current.states);

                return Err(error);
            }
        }
    }
}
