//! Linear systems of Newton iterations
//!
//! Both the implicit integrator and the NLA solver need to solve systems
//! with the matrix `shift * I + scale * J`, where `J` is the Jacobian of a
//! function at some point. The Jacobian is approximated by finite
//! differences, either fully, within a band, on its diagonal only, or
//! through Jacobian-vector products for Krylov methods.

use super::{
    LinearError,
    krylov::KrylovMethod,
    linear::{Band, LuFactors, Matrix},
};

const KRYLOV_TOLERANCE: f64 = 1.0e-10;

/// How the linear systems of Newton iterations are solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinearMethod {
    /// Dense LU factorisation
    Dense,
    /// Banded LU factorisation
    Banded {
        /// Upper half-bandwidth
        upper: usize,
        /// Lower half-bandwidth
        lower: usize,
    },
    /// Diagonal approximation of the Jacobian
    Diagonal,
    /// Matrix-free Krylov method
    Krylov {
        /// The Krylov method
        method: KrylovMethod,
        /// Upper and lower half-bandwidths of an optional banded
        /// preconditioner
        preconditioner: Option<(usize, usize)>,
    },
}

pub(super) type Function<'a> = dyn FnMut(&[f64], &mut [f64]) + 'a;

fn increment(value: f64) -> f64 {
    f64::EPSILON.sqrt() * value.abs().max(1.0)
}

fn dense_jacobian(function: &mut Function<'_>, point: &[f64], base: &[f64]) -> Matrix {
    let size = point.len();
    let mut jacobian = Matrix::zeros(size);
    let mut perturbed = point.to_vec();
    let mut values = vec![0.0; size];

    for column in 0..size {
        let h = increment(point[column]);

        perturbed[column] = point[column] + h;
        function(&perturbed, &mut values);
        perturbed[column] = point[column];

        for row in 0..size {
            jacobian.set(row, column, (values[row] - base[row]) / h);
        }
    }

    jacobian
}

/// Computes a banded Jacobian, perturbing columns that do not share any row
/// at the same time.
fn banded_jacobian(function: &mut Function<'_>, point: &[f64], base: &[f64], band: Band) -> Matrix {
    let size = point.len();
    let width = band.upper + band.lower + 1;
    let mut jacobian = Matrix::zeros(size);
    let mut values = vec![0.0; size];

    for group in 0..width.min(size) {
        let mut perturbed = point.to_vec();

        for column in (group..size).step_by(width) {
            perturbed[column] += increment(point[column]);
        }

        function(&perturbed, &mut values);

        for column in (group..size).step_by(width) {
            let h = increment(point[column]);
            let first_row = column.saturating_sub(band.upper);
            let last_row = (column + band.lower).min(size - 1);

            for row in first_row..=last_row {
                jacobian.set(row, column, (values[row] - base[row]) / h);
            }
        }
    }

    jacobian
}

fn shifted(mut jacobian: Matrix, shift: f64, scale: f64) -> Matrix {
    for row in 0..jacobian.size() {
        for column in 0..jacobian.size() {
            let mut value = scale * jacobian.get(row, column);

            if row == column {
                value += shift;
            }

            jacobian.set(row, column, value);
        }
    }

    jacobian
}

#[derive(Debug)]
enum Form {
    Factored(LuFactors),
    Diagonal(Vec<f64>),
    MatrixFree {
        method: KrylovMethod,
        point: Vec<f64>,
        base: Vec<f64>,
        preconditioner: Option<LuFactors>,
    },
}

/// The matrix `shift * I + scale * J`, ready to solve linear systems.
#[derive(Debug)]
pub(super) struct IterationMatrix {
    form: Form,
    shift: f64,
    scale: f64,
}

impl IterationMatrix {
    /// Sets up the matrix for the Jacobian of `function` at `point`, where
    /// `base` is the value of `function` at `point`.
    pub(super) fn new(
        method: LinearMethod,
        shift: f64,
        scale: f64,
        function: &mut Function<'_>,
        point: &[f64],
        base: &[f64],
    ) -> Result<Self, LinearError> {
        let form = match method {
            LinearMethod::Dense => {
                let jacobian = dense_jacobian(function, point, base);

                Form::Factored(LuFactors::new(shifted(jacobian, shift, scale), None)?)
            }
            LinearMethod::Banded { upper, lower } => {
                let band = Band { upper, lower };
                let jacobian = banded_jacobian(function, point, base, band);

                Form::Factored(LuFactors::new(shifted(jacobian, shift, scale), Some(band))?)
            }
            LinearMethod::Diagonal => {
                let perturbed: Vec<f64> = point.iter().map(|value| value + increment(*value)).collect();
                let mut values = vec![0.0; point.len()];

                function(&perturbed, &mut values);

                let diagonal = point
                    .iter()
                    .zip(values.iter().zip(base))
                    .map(|(value, (perturbed_value, base_value))| {
                        let derivative = (perturbed_value - base_value) / increment(*value);
                        let entry = scale.mul_add(derivative, shift);

                        if entry == 0.0 || !entry.is_finite() {
                            Err(LinearError::Singular)
                        } else {
                            Ok(entry)
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Form::Diagonal(diagonal)
            }
            LinearMethod::Krylov {
                method,
                preconditioner,
            } => {
                let preconditioner = preconditioner
                    .map(|(upper, lower)| {
                        let band = Band { upper, lower };
                        let jacobian = banded_jacobian(function, point, base, band);

                        LuFactors::new(shifted(jacobian, shift, scale), Some(band))
                    })
                    .transpose()?;

                Form::MatrixFree {
                    method,
                    point: point.to_vec(),
                    base: base.to_vec(),
                    preconditioner,
                }
            }
        };

        Ok(Self { form, shift, scale })
    }

    /// Returns whether the matrix is held explicitly (factorised or
    /// diagonal), which makes solves cheap
    pub(super) const fn is_explicit(&self) -> bool {
        match self.form {
            Form::Factored(_) | Form::Diagonal(_) => true,
            Form::MatrixFree { .. } => false,
        }
    }

    /// Solves `M x = rhs` in place.
    pub(super) fn solve(&self, function: &mut Function<'_>, rhs: &mut [f64]) -> Result<(), LinearError> {
        match &self.form {
            Form::Factored(factors) => {
                factors.solve(rhs);
                Ok(())
            }
            Form::Diagonal(diagonal) => {
                for (value, entry) in rhs.iter_mut().zip(diagonal) {
                    *value /= entry;
                }
                Ok(())
            }
            Form::MatrixFree {
                method,
                point,
                base,
                preconditioner,
            } => {
                let size = point.len();
                let point_norm = point.iter().map(|value| value * value).sum::<f64>().sqrt();
                let mut perturbed = vec![0.0; size];
                let mut values = vec![0.0; size];
                let (shift, scale) = (self.shift, self.scale);

                // right preconditioning: solve (M P^-1) y = rhs, then x = P^-1 y
                let mut operator = |input: &[f64], output: &mut [f64]| {
                    let mut direction = input.to_vec();

                    if let Some(factors) = preconditioner {
                        factors.solve(&mut direction);
                    }

                    let direction_norm = direction.iter().map(|value| value * value).sum::<f64>().sqrt();

                    if direction_norm == 0.0 {
                        output.fill(0.0);
                        return;
                    }

                    let sigma = f64::EPSILON.sqrt() * (1.0 + point_norm) / direction_norm;

                    for ((perturbed, point), direction) in perturbed.iter_mut().zip(point).zip(&direction) {
                        *perturbed = sigma.mul_add(*direction, *point);
                    }

                    function(&perturbed, &mut values);

                    for (((output, value), base), direction) in
                        output.iter_mut().zip(&values).zip(base).zip(&direction)
                    {
                        *output = shift.mul_add(*direction, scale * (value - base) / sigma);
                    }
                };

                let mut solution = method.solve(&mut operator, rhs, KRYLOV_TOLERANCE)?;

                if let Some(factors) = preconditioner {
                    factors.solve(&mut solution);
                }

                rhs.copy_from_slice(&solution);

                Ok(())
            }
        }
    }
}
