//! Principal component regression
//!
//! Decomposes `x` with NIPALS PCA, then regresses the response on the
//! orthogonal component scores. Coefficients are cumulative over the
//! included components, like the PLS models.

use ndarray::{Array1, Array2};

use crate::error::{ChemflowError, Result};
use crate::models::pca::NipalsPca;
use crate::models::{check_xy, Algorithm, FittedModel};

const TINY: f64 = 1e-12;

/// A fitted principal component regression model.
#[derive(Debug, Clone)]
pub struct PcrModel {
    coefficients: Array2<f64>,
    scores: Array2<f64>,
    loadings: Array2<f64>,
    y_loadings: Array1<f64>,
}

impl PcrModel {
    /// Regression weight of each component score.
    pub fn y_loadings(&self) -> &Array1<f64> {
        &self.y_loadings
    }
}

impl FittedModel for PcrModel {
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

#[derive(Debug, Clone, Copy, Default)]
pub struct Pcr;

impl Algorithm for Pcr {
    type Model = PcrModel;

    fn name(&self) -> &'static str {
        "PCR"
    }

    fn fit(&self, x: &Array2<f64>, y: &Array2<f64>, n_components: usize) -> Result<PcrModel> {
        check_xy(x, y)?;
        let pca = NipalsPca.fit(x, n_components)?;
        let a_max = pca.n_components();
        let y_col = y.column(0).to_owned();

        // Scores are orthogonal, so each regression weight is independent
        let mut y_loadings = Array1::zeros(a_max);
        for a in 0..a_max {
            let t = pca.scores().column(a);
            let tt = t.dot(&t);
            if tt < TINY {
                return Err(ChemflowError::NumericalFailure(format!(
                    "PCR score {} has zero variance",
                    a + 1
                )));
            }
            y_loadings[a] = t.dot(&y_col) / tt;
        }

        let mut coefficients = Array2::zeros((x.ncols(), a_max));
        for a in 0..a_max {
            let increment = pca.loadings().column(a).to_owned() * y_loadings[a];
            if a == 0 {
                coefficients.column_mut(a).assign(&increment);
            } else {
                let previous = coefficients.column(a - 1).to_owned();
                coefficients.column_mut(a).assign(&(&previous + &increment));
            }
        }

        Ok(PcrModel {
            coefficients,
            scores: pca.scores().clone(),
            loadings: pca.loadings().clone(),
            y_loadings,
        })
    }
}
