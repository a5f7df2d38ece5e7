//! Matrix-free Krylov solvers
//!
//! The operator is only known through its action on a vector. Every solver
//! starts from a zero initial guess and stops once the residual norm is
//! below `tolerance * ||b||`.

use super::LinearError;

const MAXIMUM_KRYLOV_DIMENSION: usize = 30;
const MAXIMUM_RESTARTS: usize = 20;

/// The Krylov method used to solve a linear system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KrylovMethod {
    /// Restarted generalised minimal residual method
    Gmres,
    /// Biconjugate gradient stabilised method
    BiCgStab,
    /// Transpose-free quasi-minimal residual method
    Tfqmr,
}

type Operator<'a> = dyn FnMut(&[f64], &mut [f64]) + 'a;

fn dot(first: &[f64], second: &[f64]) -> f64 {
    first.iter().zip(second).map(|(a, b)| a * b).sum()
}

fn norm(values: &[f64]) -> f64 {
    dot(values, values).sqrt()
}

/// `target += factor * source`
fn axpy(target: &mut [f64], factor: f64, source: &[f64]) {
    for (t, s) in target.iter_mut().zip(source) {
        *t += factor * s;
    }
}

fn apply(operator: &mut Operator<'_>, input: &[f64]) -> Vec<f64> {
    let mut output = vec![0.0; input.len()];
    operator(input, &mut output);
    output
}

impl KrylovMethod {
    /// Solves `A x = b`, where `operator` computes `A v`.
    pub(super) fn solve(
        self,
        operator: &mut Operator<'_>,
        rhs: &[f64],
        tolerance: f64,
    ) -> Result<Vec<f64>, LinearError> {
        let size = rhs.len();
        let target = tolerance * norm(rhs);

        if target == 0.0 {
            return Ok(vec![0.0; size]);
        }

        let maximum_iterations = (4 * size).max(20);
        let solution = match self {
            Self::Gmres => gmres(operator, rhs, target),
            Self::BiCgStab => bicgstab(operator, rhs, target, maximum_iterations),
            Self::Tfqmr => tfqmr(operator, rhs, target, maximum_iterations),
        }?;

        tracing::trace!(method = ?self, size, "krylov solve converged");

        Ok(solution)
    }
}

fn gmres(operator: &mut Operator<'_>, rhs: &[f64], target: f64) -> Result<Vec<f64>, LinearError> {
    let size = rhs.len();
    let dimension = size.clamp(1, MAXIMUM_KRYLOV_DIMENSION);
    let mut solution = vec![0.0; size];

    for _ in 0..MAXIMUM_RESTARTS {
        let product = apply(operator, &solution);
        let residual: Vec<f64> = rhs.iter().zip(&product).map(|(b, ax)| b - ax).collect();
        let beta = norm(&residual);

        if beta <= target {
            return Ok(solution);
        }

        let mut basis = vec![residual.iter().map(|r| r / beta).collect::<Vec<_>>()];
        let mut hessenberg = vec![vec![0.0; dimension]; dimension + 1];
        let mut cosines = vec![0.0; dimension];
        let mut sines = vec![0.0; dimension];
        let mut g = vec![0.0; dimension + 1];
        let mut used = 0;

        g[0] = beta;

        for j in 0..dimension {
            let mut w = apply(operator, &basis[j]);

            for (i, vector) in basis.iter().enumerate() {
                let h = dot(&w, vector);
                hessenberg[i][j] = h;
                axpy(&mut w, -h, vector);
            }

            let w_norm = norm(&w);
            hessenberg[j + 1][j] = w_norm;

            for i in 0..j {
                let upper = hessenberg[i][j];
                let lower = hessenberg[i + 1][j];

                hessenberg[i][j] = cosines[i] * upper + sines[i] * lower;
                hessenberg[i + 1][j] = -sines[i] * upper + cosines[i] * lower;
            }

            let denominator = hessenberg[j][j].hypot(hessenberg[j + 1][j]);

            if denominator == 0.0 {
                return Err(LinearError::Singular);
            }

            cosines[j] = hessenberg[j][j] / denominator;
            sines[j] = hessenberg[j + 1][j] / denominator;
            hessenberg[j][j] = denominator;
            hessenberg[j + 1][j] = 0.0;
            g[j + 1] = -sines[j] * g[j];
            g[j] *= cosines[j];
            used = j + 1;

            if g[j + 1].abs() <= target || w_norm == 0.0 {
                break;
            }

            basis.push(w.iter().map(|value| value / w_norm).collect());
        }

        // back substitution on the triangular part of the Hessenberg matrix
        let mut y = vec![0.0; used];

        for i in (0..used).rev() {
            let sum: f64 = (i + 1..used).map(|k| hessenberg[i][k] * y[k]).sum();
            y[i] = (g[i] - sum) / hessenberg[i][i];
        }

        for (coefficient, vector) in y.iter().zip(&basis) {
            axpy(&mut solution, *coefficient, vector);
        }

        if g[used].abs() <= target {
            return Ok(solution);
        }
    }

    Err(LinearError::NoConvergence)
}

fn bicgstab(
    operator: &mut Operator<'_>,
    rhs: &[f64],
    target: f64,
    maximum_iterations: usize,
) -> Result<Vec<f64>, LinearError> {
    let size = rhs.len();
    let mut solution = vec![0.0; size];
    let mut residual = rhs.to_vec();
    let shadow = residual.clone();
    let mut direction = vec![0.0; size];
    let mut v = vec![0.0; size];
    let (mut rho, mut alpha, mut omega) = (1.0, 1.0, 1.0);

    for _ in 0..maximum_iterations {
        let rho_new = dot(&shadow, &residual);

        if rho_new == 0.0 || omega == 0.0 {
            return Err(LinearError::NoConvergence);
        }

        let beta = (rho_new / rho) * (alpha / omega);

        for ((p, r), v) in direction.iter_mut().zip(&residual).zip(&v) {
            *p = r + beta * (*p - omega * v);
        }

        v = apply(operator, &direction);

        let denominator = dot(&shadow, &v);

        if denominator == 0.0 {
            return Err(LinearError::NoConvergence);
        }

        alpha = rho_new / denominator;

        let mut s = residual.clone();
        axpy(&mut s, -alpha, &v);

        if norm(&s) <= target {
            axpy(&mut solution, alpha, &direction);
            return Ok(solution);
        }

        let t = apply(operator, &s);
        let tt = dot(&t, &t);

        omega = if tt == 0.0 { 0.0 } else { dot(&t, &s) / tt };

        axpy(&mut solution, alpha, &direction);
        axpy(&mut solution, omega, &s);

        residual = s;
        axpy(&mut residual, -omega, &t);

        if norm(&residual) <= target {
            return Ok(solution);
        }

        rho = rho_new;
    }

    Err(LinearError::NoConvergence)
}

fn tfqmr(
    operator: &mut Operator<'_>,
    rhs: &[f64],
    target: f64,
    maximum_iterations: usize,
) -> Result<Vec<f64>, LinearError> {
    let size = rhs.len();
    let mut solution = vec![0.0; size];
    let shadow = rhs.to_vec();
    let mut w = rhs.to_vec();
    let mut u = rhs.to_vec();
    let mut au = apply(operator, &u);
    let mut v = au.clone();
    let mut d = vec![0.0; size];
    let mut tau = norm(rhs);
    let mut rho = dot(&shadow, rhs);
    let (mut theta, mut eta, mut alpha) = (0.0_f64, 0.0_f64, 0.0_f64);

    for m in 0..maximum_iterations {
        let even = m % 2 == 0;

        if even {
            let sigma = dot(&v, &shadow);

            if sigma == 0.0 {
                return Err(LinearError::NoConvergence);
            }

            alpha = rho / sigma;
        }

        axpy(&mut w, -alpha, &au);

        let factor = theta * theta / alpha * eta;

        for (d, u) in d.iter_mut().zip(&u) {
            *d = u + factor * *d;
        }

        theta = norm(&w) / tau;

        let c = 1.0 / theta.mul_add(theta, 1.0).sqrt();

        tau *= theta * c;
        eta = c * c * alpha;

        axpy(&mut solution, eta, &d);

        #[expect(clippy::cast_precision_loss, reason = "iteration counts are small")]
        let bound = tau * ((m + 2) as f64).sqrt();

        if bound <= target {
            return Ok(solution);
        }

        if even {
            axpy(&mut u, -alpha, &v);
            au = apply(operator, &u);
        } else {
            let rho_new = dot(&w, &shadow);

            if rho == 0.0 {
                return Err(LinearError::NoConvergence);
            }

            let beta = rho_new / rho;
            let previous_au = au;

            rho = rho_new;

            for (u, w) in u.iter_mut().zip(&w) {
                *u = w + beta * *u;
            }

            au = apply(operator, &u);

            for ((v, au), previous) in v.iter_mut().zip(&au).zip(&previous_au) {
                *v = au + beta * (previous + beta * *v);
            }
        }
    }

    Err(LinearError::NoConvergence)
}

#[cfg(test)]
mod tests {
    use super::*;

    // non-symmetric, diagonally dominant
    const A: [[f64; 3]; 3] = [[4.0, 1.0, 0.0], [2.0, 5.0, 1.0], [0.0, 1.0, 3.0]];
    const X: [f64; 3] = [1.0, -2.0, 0.5];

    fn multiply(input: &[f64], output: &mut [f64]) {
        for (row, out) in A.iter().zip(output.iter_mut()) {
            *out = row.iter().zip(input).map(|(a, x)| a * x).sum();
        }
    }

    fn rhs() -> Vec<f64> {
        let mut b = vec![0.0; 3];
        multiply(&X, &mut b);
        b
    }

    #[test]
    fn every_method_solves_the_system() {
        for method in [KrylovMethod::Gmres, KrylovMethod::BiCgStab, KrylovMethod::Tfqmr] {
            let solution = method
                .solve(&mut multiply, &rhs(), 1e-12)
                .unwrap_or_else(|error| panic!("{method:?} failed: {error}"));

            for (actual, expected) in solution.iter().zip(X) {
                assert!((actual - expected).abs() < 1e-8, "{method:?}: {solution:?}");
            }
        }
    }

    #[test]
    fn zero_rhs_gives_zero_solution() {
        let solution = KrylovMethod::Gmres
            .solve(&mut multiply, &[0.0; 3], 1e-10)
            .expect("zero system is trivially solved");

        assert_eq!(solution, [0.0; 3]);
    }
}
