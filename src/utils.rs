//! Small dense linear-algebra helpers shared by models and preprocessing

use crate::error::{ChemflowError, Result};
use ndarray::{Array1, Array2};

/// Invert a small square matrix with Gauss-Jordan elimination and partial
/// pivoting. Returns `NumericalFailure` on a singular pivot.
pub fn matrix_inverse(m: &Array2<f64>) -> Result<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return Err(ChemflowError::ShapeError {
            expected: "square matrix".to_string(),
            actual: format!("{}x{}", m.nrows(), m.ncols()),
        });
    }

    // Augmented matrix [M | I]
    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        // Find pivot
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }
        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        if pivot.abs() < 1e-12 {
            return Err(ChemflowError::NumericalFailure(
                "singular matrix in Gauss-Jordan elimination".to_string(),
            ));
        }

        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inv = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }
    Ok(inv)
}

/// Moore-Penrose pseudo-inverse for full-rank rectangular matrices.
pub fn pseudo_inverse(m: &Array2<f64>) -> Result<Array2<f64>> {
    if m.nrows() > m.ncols() {
        let gram = m.t().dot(m);
        Ok(matrix_inverse(&gram)?.dot(&m.t()))
    } else if m.nrows() < m.ncols() {
        let gram = m.dot(&m.t());
        Ok(m.t().dot(&matrix_inverse(&gram)?))
    } else {
        matrix_inverse(m)
    }
}

/// Replace near-zero scale entries with 1.0 to avoid division by zero.
pub fn guard_zeros(mut scale: Array1<f64>) -> Array1<f64> {
    let threshold = 10.0 * f64::EPSILON;
    scale.mapv_inplace(|v| if v.abs() < threshold { 1.0 } else { v });
    scale
}

/// Median of a column of values. NaNs are not handled; callers guard first.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}
