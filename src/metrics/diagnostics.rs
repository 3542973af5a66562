//! Sample-wise decomposition diagnostics
//!
//! Leverage and Q-residuals per sample and per included component count,
//! used to rank candidate outliers at the chosen model size.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ChemflowError, Result};

const TINY: f64 = 1e-12;

/// Per-sample diagnostics, one column per component count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Influence of each sample on the component subspace, `1/n` floor.
    pub leverage: Array2<f64>,
    /// Squared reconstruction residual of each sample.
    pub q_residuals: Array2<f64>,
}

impl Diagnostics {
    /// Compute both diagnostics from the data a model was fitted on and its
    /// scores/loadings.
    pub fn from_decomposition(
        x: &Array2<f64>,
        scores: &Array2<f64>,
        loadings: &Array2<f64>,
    ) -> Result<Self> {
        let n = x.nrows();
        let a_max = scores.ncols();
        if n == 0 || a_max == 0 {
            return Err(ChemflowError::DataError(
                "diagnostics need at least one sample and one component".to_string(),
            ));
        }
        if scores.nrows() != n || loadings.ncols() != a_max {
            return Err(ChemflowError::ShapeError {
                expected: format!("scores {n}x{a_max}, loadings {}x{a_max}", x.ncols()),
                actual: format!(
                    "scores {}x{}, loadings {}x{}",
                    scores.nrows(),
                    scores.ncols(),
                    loadings.nrows(),
                    loadings.ncols()
                ),
            });
        }

        // Leverage accumulates the normalised squared score of each
        // component; Q-residuals follow the running reconstruction
        let mut leverage = Array2::zeros((n, a_max));
        let mut q_residuals = Array2::zeros((n, a_max));
        let mut residual = x.clone();

        for a in 0..a_max {
            let t = scores.column(a);
            let tt = t.dot(&t).max(TINY);
            for i in 0..n {
                let prev = if a == 0 { 1.0 / n as f64 } else { leverage[[i, a - 1]] };
                leverage[[i, a]] = prev + t[i] * t[i] / tt;
            }

            let t_col = t.to_owned().insert_axis(Axis(1));
            let p_row = loadings.column(a).to_owned().insert_axis(Axis(0));
            residual -= &t_col.dot(&p_row);
            for i in 0..n {
                q_residuals[[i, a]] = residual.row(i).dot(&residual.row(i));
            }
        }

        Ok(Self { leverage, q_residuals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_leverage_sums_to_components_plus_floor() {
        // Orthonormal score columns
        let scores = array![[1.0, 0.0], [0.0, 1.0], [0.0, 0.0], [0.0, 0.0]];
        let loadings = array![[1.0, 0.0], [0.0, 1.0]];
        let x = scores.dot(&loadings.t());
        let d = Diagnostics::from_decomposition(&x, &scores, &loadings).unwrap();

        // Column a sums to (a + 1) + n * (1/n)
        assert!((d.leverage.column(0).sum() - 2.0).abs() < 1e-12);
        assert!((d.leverage.column(1).sum() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_q_residuals_vanish_at_full_reconstruction() {
        let scores = array![[2.0, 0.5], [-1.0, 1.5], [0.5, -0.5]];
        let loadings = array![[0.6, -0.8], [0.8, 0.6]];
        let x = scores.dot(&loadings.t());
        let d = Diagnostics::from_decomposition(&x, &scores, &loadings).unwrap();

        for i in 0..3 {
            assert!(d.q_residuals[[i, 1]].abs() < 1e-12);
        }
        // With one component the second one's contribution remains
        assert!(d.q_residuals[[1, 0]] > 1.0);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let x = Array2::zeros((3, 2));
        let scores = Array2::zeros((4, 2));
        let loadings = Array2::zeros((2, 2));
        assert!(Diagnostics::from_decomposition(&x, &scores, &loadings).is_err());
    }
}
