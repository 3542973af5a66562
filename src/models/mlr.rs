//! Multiple linear regression
//!
//! Ordinary least squares through the normal equations. Has no latent
//! components; the fitted model exposes a single coefficient column so the
//! cross-validation machinery treats it as a one-component model.

use ndarray::Array2;

use crate::error::Result;
use crate::models::{check_xy, Algorithm, FittedModel};
use crate::utils::pseudo_inverse;

/// A fitted least-squares model.
#[derive(Debug, Clone)]
pub struct MlrModel {
    coefficients: Array2<f64>,
}

impl FittedModel for MlrModel {
    fn coefficients(&self) -> &Array2<f64> {
        &self.coefficients
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Mlr;

impl Algorithm for Mlr {
    type Model = MlrModel;

    fn name(&self) -> &'static str {
        "MLR"
    }

    /// The component count is ignored; least squares has exactly one
    /// solution.
    fn fit(&self, x: &Array2<f64>, y: &Array2<f64>, _n_components: usize) -> Result<MlrModel> {
        check_xy(x, y)?;
        let coefficients = pseudo_inverse(x)?.dot(y);
        Ok(MlrModel { coefficients })
    }
}
