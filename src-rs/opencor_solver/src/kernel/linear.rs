//! Dense and banded LU factorisations

use super::LinearError;

/// A square matrix stored row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    size: usize,
    values: Vec<f64>,
}

impl Matrix {
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.values[row * self.size + column]
    }

    pub fn set(&mut self, row: usize, column: usize, value: f64) {
        self.values[row * self.size + column] = value;
    }

    fn swap_rows(&mut self, first: usize, second: usize, columns: std::ops::Range<usize>) {
        for column in columns {
            self.values.swap(first * self.size + column, second * self.size + column);
        }
    }
}

/// The bandwidths an LU factorisation is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub upper: usize,
    pub lower: usize,
}

/// An LU factorisation with partial pivoting.
///
/// Row interchanges are applied to the trailing columns only, as LAPACK's
/// banded routines do, so the multipliers stay inside the lower band. The
/// interchanges are therefore replayed step by step when solving.
#[derive(Debug, Clone)]
pub struct LuFactors {
    factors: Matrix,
    pivots: Vec<usize>,
    lower: usize,
    upper: usize,
}

impl LuFactors {
    /// Factorises the matrix, restricted to the given band if any (entries
    /// outside the band are ignored).
    pub fn new(mut matrix: Matrix, band: Option<Band>) -> Result<Self, LinearError> {
        let size = matrix.size();
        let last = size.saturating_sub(1);
        let (lower, upper) = match band {
            // pivoting can fill in up to `lower` extra upper diagonals
            Some(band) => (band.lower.min(last), (band.upper + band.lower).min(last)),
            None => (last, last),
        };

        if let Some(band) = band {
            for row in 0..size {
                for column in 0..size {
                    if column + band.lower < row || row + band.upper < column {
                        matrix.set(row, column, 0.0);
                    }
                }
            }
        }

        let mut pivots = Vec::with_capacity(size);

        for k in 0..size {
            let last_row = (k + lower).min(last);
            let last_column = (k + upper).min(last);

            let pivot = (k..=last_row)
                .max_by(|first, second| {
                    matrix
                        .get(*first, k)
                        .abs()
                        .total_cmp(&matrix.get(*second, k).abs())
                })
                .unwrap_or(k);

            if matrix.get(pivot, k) == 0.0 || !matrix.get(pivot, k).is_finite() {
                return Err(LinearError::Singular);
            }

            pivots.push(pivot);

            if pivot != k {
                matrix.swap_rows(k, pivot, k..last_column + 1);
            }

            let diagonal = matrix.get(k, k);

            for row in k + 1..=last_row {
                let multiplier = matrix.get(row, k) / diagonal;

                matrix.set(row, k, multiplier);

                if multiplier != 0.0 {
                    for column in k + 1..=last_column {
                        let value = matrix.get(row, column) - multiplier * matrix.get(k, column);
                        matrix.set(row, column, value);
                    }
                }
            }
        }

        Ok(Self {
            factors: matrix,
            pivots,
            lower,
            upper,
        })
    }

    /// Solves `A x = b` in place.
    pub fn solve(&self, rhs: &mut [f64]) {
        let size = self.factors.size();
        let last = size.saturating_sub(1);

        for k in 0..size {
            rhs.swap(k, self.pivots[k]);

            for row in k + 1..=(k + self.lower).min(last) {
                rhs[row] -= self.factors.get(row, k) * rhs[k];
            }
        }

        for k in (0..size).rev() {
            let mut value = rhs[k];

            for column in k + 1..=(k + self.upper).min(last) {
                value -= self.factors.get(k, column) * rhs[column];
            }

            rhs[k] = value / self.factors.get(k, k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[f64]]) -> Matrix {
        let mut matrix = Matrix::zeros(rows.len());

        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                matrix.set(i, j, *value);
            }
        }

        matrix
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn dense_solve_with_pivoting() {
        // the zero on the diagonal forces a row interchange
        let a = matrix(&[&[0.0, 2.0, 1.0], &[1.0, 1.0, 0.0], &[2.0, 0.0, 3.0]]);
        let factors = LuFactors::new(a, None).expect("matrix is regular");

        // x = (1, 2, 3)
        let mut b = [7.0, 3.0, 11.0];
        factors.solve(&mut b);

        assert_close(&b, &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn banded_solve_matches_dense() {
        // tridiagonal with a small diagonal entry to trigger pivoting
        let rows: [&[f64]; 4] = [
            &[1e-3, 1.0, 0.0, 0.0],
            &[2.0, 1.0, 1.0, 0.0],
            &[0.0, 1.0, 4.0, 1.0],
            &[0.0, 0.0, 3.0, 2.0],
        ];
        let expected = [1.0, -1.0, 2.0, 0.5];
        let mut b = [0.0; 4];

        for (i, row) in rows.iter().enumerate() {
            b[i] = row.iter().zip(expected).map(|(a, x)| a * x).sum();
        }

        let band = Band { upper: 1, lower: 1 };
        let factors = LuFactors::new(matrix(&rows), Some(band)).expect("matrix is regular");

        factors.solve(&mut b);

        assert_close(&b, &expected);
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let a = matrix(&[&[1.0, 2.0], &[2.0, 4.0]]);

        assert_eq!(LuFactors::new(a, None).err(), Some(LinearError::Singular));
    }

    #[test]
    fn entries_outside_band_are_ignored() {
        let a = matrix(&[&[2.0, 0.0, 5.0], &[0.0, 3.0, 0.0], &[0.0, 0.0, 4.0]]);
        let factors = LuFactors::new(a, Some(Band { upper: 0, lower: 0 })).expect("diagonal is regular");
        let mut b = [2.0, 3.0, 4.0];

        factors.solve(&mut b);

        assert_close(&b, &[1.0, 1.0, 1.0]);
    }
}
