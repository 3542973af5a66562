//! Principal component analysis via NIPALS
//!
//! Iterative extraction with deflation, used by principal component
//! regression and by the decomposition diagnostics. Works on centered data.

use ndarray::{Array1, Array2, Axis};

use crate::error::{ChemflowError, Result};
use crate::models::effective_components;

const MAX_ITER: usize = 150;
const CONVERGENCE: f64 = f64::EPSILON;
const TINY: f64 = 1e-12;

/// A fitted principal component decomposition.
#[derive(Debug, Clone)]
pub struct PcaModel {
    scores: Array2<f64>,
    loadings: Array2<f64>,
    explained_variance: Array1<f64>,
}

impl PcaModel {
    /// Component scores `(n_samples, n_components)`.
    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    /// Normalised loadings `(n_features, n_components)`.
    pub fn loadings(&self) -> &Array2<f64> {
        &self.loadings
    }

    /// Fraction of captured variance per component, summing to 1.
    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.explained_variance
    }

    pub fn n_components(&self) -> usize {
        self.loadings.ncols()
    }
}

/// NIPALS extraction of the leading principal components.
#[derive(Debug, Clone, Copy, Default)]
pub struct NipalsPca;

impl NipalsPca {
    pub fn fit(&self, x: &Array2<f64>, n_components: usize) -> Result<PcaModel> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(ChemflowError::DataError(
                "cannot decompose an empty matrix".to_string(),
            ));
        }
        let a_max = effective_components(n_components, x.nrows(), x.ncols())?;
        let (n, p) = (x.nrows(), x.ncols());

        let mut deflated = x.clone();
        let mut scores = Array2::zeros((n, a_max));
        let mut loadings = Array2::zeros((p, a_max));
        let mut variance = Array1::zeros(a_max);

        for a in 0..a_max {
            let mut score = deflated.column(0).to_owned();
            let mut loading = Array1::zeros(p);
            for _ in 0..MAX_ITER {
                let tt = score.dot(&score);
                if tt < TINY {
                    return Err(ChemflowError::NumericalFailure(format!(
                        "NIPALS score vanished at component {}",
                        a + 1
                    )));
                }
                loading = deflated.t().dot(&score) / tt;
                let norm = loading.dot(&loading).sqrt();
                if norm < TINY {
                    return Err(ChemflowError::NumericalFailure(format!(
                        "NIPALS loading vanished at component {}",
                        a + 1
                    )));
                }
                loading /= norm;

                let next = deflated.dot(&loading);
                let shift: f64 = score
                    .iter()
                    .zip(next.iter())
                    .map(|(&old, &new)| (old - new) * (old - new))
                    .sum();
                score = next;
                if shift < CONVERGENCE {
                    break;
                }
            }

            let score_col = score.clone().insert_axis(Axis(1));
            let loading_row = loading.clone().insert_axis(Axis(0));
            deflated -= &score_col.dot(&loading_row);

            variance[a] = score.dot(&score);
            scores.column_mut(a).assign(&score);
            loadings.column_mut(a).assign(&loading);
        }

        let total = variance.sum();
        if total > TINY {
            variance /= total;
        }

        Ok(PcaModel { scores, loadings, explained_variance: variance })
    }
}
