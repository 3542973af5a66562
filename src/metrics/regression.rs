//! Per-component regression error metrics
//!
//! Predictions arrive as one column per included component count, so every
//! metric is a vector indexed by component count minus one.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{ChemflowError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Root-mean-square error per component count.
    pub rmse: Array1<f64>,
    /// Mean squared error per component count.
    pub mse: Array1<f64>,
    /// Mean signed error (predicted minus actual) per component count.
    pub bias: Array1<f64>,
    /// Spread (population standard deviation) of the predictions per
    /// component count.
    pub variance: Array1<f64>,
}

impl RegressionMetrics {
    /// Compute all metrics from actual values and the per-component
    /// prediction matrix `(n, A)`.
    pub fn from_predictions(actual: &Array1<f64>, predicted: &Array2<f64>) -> Result<Self> {
        let n = actual.len();
        if predicted.nrows() != n {
            return Err(ChemflowError::ShapeError {
                expected: format!("{n} prediction rows"),
                actual: format!("{} prediction rows", predicted.nrows()),
            });
        }
        if n == 0 {
            return Err(ChemflowError::DataError(
                "cannot compute metrics on zero samples".to_string(),
            ));
        }

        let a_max = predicted.ncols();
        let mut rmse = Array1::zeros(a_max);
        let mut mse = Array1::zeros(a_max);
        let mut bias = Array1::zeros(a_max);
        let mut variance = Array1::zeros(a_max);

        for a in 0..a_max {
            let column = predicted.column(a);
            let mut sq_sum = 0.0;
            let mut signed_sum = 0.0;
            for (&pred, &act) in column.iter().zip(actual.iter()) {
                let err = pred - act;
                sq_sum += err * err;
                signed_sum += err;
            }
            mse[a] = sq_sum / n as f64;
            rmse[a] = mse[a].sqrt();
            bias[a] = signed_sum / n as f64;
            variance[a] = column.std(0.0);
        }

        Ok(Self { rmse, mse, bias, variance })
    }

    pub fn n_components(&self) -> usize {
        self.rmse.len()
    }
}
