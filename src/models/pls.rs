//! Partial least squares regression
//!
//! Two fitting routines for the single-response case: [`Simpls`] (de Jong's
//! covariance-deflation algorithm) and [`NipalsPls`] (classical alternating
//! deflation of `x` and `y`). Both assume centered inputs and produce
//! cumulative coefficients, one column per included component.

use ndarray::{s, Array1, Array2, Axis};

use crate::error::{ChemflowError, Result};
use crate::models::{check_xy, effective_components, Algorithm, FittedModel};
use crate::utils::matrix_inverse;

const TINY: f64 = 1e-12;

/// A fitted PLS model.
#[derive(Debug, Clone)]
pub struct PlsModel {
    coefficients: Array2<f64>,
    scores: Array2<f64>,
    loadings: Array2<f64>,
    weights: Array2<f64>,
    y_loadings: Array1<f64>,
}

impl PlsModel {
    /// The `x` weight vectors, one column per component.
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    /// The `y` loading of each component.
    pub fn y_loadings(&self) -> &Array1<f64> {
        &self.y_loadings
    }
}

impl FittedModel for PlsModel {
    fn coefficients(&self) -> &Array2<f64> {
        &self.coefficients
    }

    fn scores(&self) -> Option<&Array2<f64>> {
        Some(&self.scores)
    }

    fn loadings(&self) -> Option<&Array2<f64>> {
        Some(&self.loadings)
    }
}

/// SIMPLS: extracts components by deflating the `x`/`y` covariance against
/// an orthonormal loading basis, leaving `x` itself untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simpls;

impl Algorithm for Simpls {
    type Model = PlsModel;

    fn name(&self) -> &'static str {
        "SIMPLS"
    }

    fn fit(&self, x: &Array2<f64>, y: &Array2<f64>, n_components: usize) -> Result<PlsModel> {
        check_xy(x, y)?;
        let a_max = effective_components(n_components, x.nrows(), x.ncols())?;
        let (n, p) = (x.nrows(), x.ncols());
        let y_col = y.column(0).to_owned();

        // Covariance between x and the single response
        let mut cov = x.t().dot(&y_col);

        let mut weights = Array2::zeros((p, a_max));
        let mut scores = Array2::zeros((n, a_max));
        let mut loadings = Array2::zeros((p, a_max));
        let mut ortho = Array2::zeros((p, a_max));
        let mut y_loadings = Array1::zeros(a_max);
        let mut coefficients = Array2::zeros((p, a_max));

        for a in 0..a_max {
            // With one response the y weight is 1, so the x weight is the
            // deflated covariance itself
            let mut w = cov.clone();
            let mut t = x.dot(&w);
            let normt = t.dot(&t).sqrt();
            if normt < TINY {
                return Err(ChemflowError::NumericalFailure(format!(
                    "SIMPLS component {} collapsed to zero variance",
                    a + 1
                )));
            }
            t /= normt;
            w /= normt;

            let p_load = x.t().dot(&t);
            let q = y_col.dot(&t);

            // Orthogonalise the loading against the previous basis, then
            // deflate the covariance against it
            let mut v = p_load.clone();
            if a > 0 {
                let basis = ortho.slice(s![.., ..a]);
                let proj = basis.t().dot(&p_load);
                v -= &basis.dot(&proj);
            }
            let normv = v.dot(&v).sqrt();
            if normv < TINY {
                return Err(ChemflowError::NumericalFailure(format!(
                    "SIMPLS loading basis became degenerate at component {}",
                    a + 1
                )));
            }
            v /= normv;
            let vc = v.dot(&cov);
            cov = &cov - &(&v * vc);

            weights.column_mut(a).assign(&w);
            scores.column_mut(a).assign(&t);
            loadings.column_mut(a).assign(&p_load);
            ortho.column_mut(a).assign(&v);
            y_loadings[a] = q;

            // Cumulative coefficients: each component adds w * q
            let increment = &w * q;
            if a == 0 {
                coefficients.column_mut(a).assign(&increment);
            } else {
                let previous = coefficients.column(a - 1).to_owned();
                coefficients.column_mut(a).assign(&(&previous + &increment));
            }
        }

        Ok(PlsModel { coefficients, scores, loadings, weights, y_loadings })
    }
}

/// Classical NIPALS PLS1: alternately deflates `x` and `y` by each
/// extracted component.
#[derive(Debug, Clone, Copy, Default)]
pub struct NipalsPls;

impl Algorithm for NipalsPls {
    type Model = PlsModel;

    fn name(&self) -> &'static str {
        "NIPALS-PLS"
    }

    fn fit(&self, x: &Array2<f64>, y: &Array2<f64>, n_components: usize) -> Result<PlsModel> {
        check_xy(x, y)?;
        let a_max = effective_components(n_components, x.nrows(), x.ncols())?;
        let (n, p) = (x.nrows(), x.ncols());

        let mut x_d = x.clone();
        let mut y_d = y.column(0).to_owned();

        let mut weights = Array2::zeros((p, a_max));
        let mut scores = Array2::zeros((n, a_max));
        let mut loadings = Array2::zeros((p, a_max));
        let mut y_loadings = Array1::zeros(a_max);

        for a in 0..a_max {
            let mut w = x_d.t().dot(&y_d);
            let normw = w.dot(&w).sqrt();
            if normw < TINY {
                return Err(ChemflowError::NumericalFailure(format!(
                    "NIPALS weight vector vanished at component {}",
                    a + 1
                )));
            }
            w /= normw;

            let t = x_d.dot(&w);
            let tt = t.dot(&t);
            if tt < TINY {
                return Err(ChemflowError::NumericalFailure(format!(
                    "NIPALS score vector vanished at component {}",
                    a + 1
                )));
            }
            let p_load = x_d.t().dot(&t) / tt;
            let q = y_d.dot(&t) / tt;

            // Deflate both blocks by the extracted component
            let t_col = t.clone().insert_axis(Axis(1));
            let p_row = p_load.clone().insert_axis(Axis(0));
            x_d -= &t_col.dot(&p_row);
            y_d -= &(&t * q);

            weights.column_mut(a).assign(&w);
            scores.column_mut(a).assign(&t);
            loadings.column_mut(a).assign(&p_load);
            y_loadings[a] = q;
        }

        // B_a = W_a (P_a' W_a)^-1 q_a, one cumulative column per count
        let mut coefficients = Array2::zeros((p, a_max));
        for a in 0..a_max {
            let w_a = weights.slice(s![.., ..=a]);
            let p_a = loadings.slice(s![.., ..=a]);
            let m = p_a.t().dot(&w_a);
            let q_a = y_loadings.slice(s![..=a]).to_owned();
            let b = w_a.dot(&matrix_inverse(&m.to_owned())?.dot(&q_a));
            coefficients.column_mut(a).assign(&b);
        }

        Ok(PlsModel { coefficients, scores, loadings, weights, y_loadings })
    }
}
