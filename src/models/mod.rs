//! Regression algorithms and the fitted-model contract
//!
//! Every algorithm consumes preprocessed (centered) matrices and produces a
//! fitted model exposing cumulative regression coefficients: column `a-1`
//! of the coefficient matrix predicts using the first `a` latent
//! components, so a single matrix product yields predictions for every
//! component count at once. Decomposition-based models additionally expose
//! their scores and loadings for diagnostics.

pub mod mlr;
pub mod pca;
pub mod pcr;
pub mod pls;

pub use mlr::{Mlr, MlrModel};
pub use pca::{NipalsPca, PcaModel};
pub use pcr::{Pcr, PcrModel};
pub use pls::{NipalsPls, PlsModel, Simpls};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{ChemflowError, Result};

/// A fitted regression model.
pub trait FittedModel: Send + Sync {
    /// Cumulative coefficients, shape `(n_features, n_components)`.
    fn coefficients(&self) -> &Array2<f64>;

    /// Latent-variable scores `(n_samples, n_components)`, when the
    /// algorithm produces them.
    fn scores(&self) -> Option<&Array2<f64>> {
        None
    }

    /// Variable loadings `(n_features, n_components)`, when the algorithm
    /// produces them.
    fn loadings(&self) -> Option<&Array2<f64>> {
        None
    }

    fn n_components(&self) -> usize {
        self.coefficients().ncols()
    }

    /// Predict for every component count at once: `(n, p) -> (n, A)`.
    fn predict(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(self.coefficients())
    }
}

impl<T: FittedModel + ?Sized> FittedModel for Box<T> {
    fn coefficients(&self) -> &Array2<f64> {
        (**self).coefficients()
    }

    fn scores(&self) -> Option<&Array2<f64>> {
        (**self).scores()
    }

    fn loadings(&self) -> Option<&Array2<f64>> {
        (**self).loadings()
    }
}

/// A regression algorithm that can be fitted on a training partition.
pub trait Algorithm: Send + Sync {
    type Model: FittedModel;

    fn name(&self) -> &'static str;

    /// Fit on `x` and single-column `y` with up to `n_components` latent
    /// components.
    fn fit(&self, x: &Array2<f64>, y: &Array2<f64>, n_components: usize) -> Result<Self::Model>;
}

/// Identifier of a fitted algorithm, kept by the model framework so a
/// rebuild after outlier or variable removal re-runs the same algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlgorithmKind {
    Simpls,
    NipalsPls,
    Pcr,
    Mlr,
}

/// Validate the common x/y preconditions shared by all algorithms.
pub(crate) fn check_xy(x: &Array2<f64>, y: &Array2<f64>) -> Result<()> {
    if y.ncols() != 1 {
        return Err(ChemflowError::ShapeError {
            expected: "single-column response".to_string(),
            actual: format!("{} columns", y.ncols()),
        });
    }
    if x.nrows() != y.nrows() {
        return Err(ChemflowError::ShapeError {
            expected: format!("{} response rows", x.nrows()),
            actual: format!("{} response rows", y.nrows()),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ChemflowError::DataError(
            "cannot fit a model on an empty matrix".to_string(),
        ));
    }
    Ok(())
}

/// Clamp the requested component count to what the data can support.
pub(crate) fn effective_components(
    requested: usize,
    n_rows: usize,
    n_cols: usize,
) -> Result<usize> {
    if requested == 0 {
        return Err(ChemflowError::ConfigError(
            "component count must be at least 1".to_string(),
        ));
    }
    Ok(requested.min(n_rows.saturating_sub(1)).min(n_cols).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_check_xy_rejects_multicolumn_response() {
        let x = array![[1.0], [2.0]];
        let y = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(check_xy(&x, &y).is_err());
    }

    #[test]
    fn test_check_xy_rejects_row_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![[1.0]];
        assert!(check_xy(&x, &y).is_err());
    }

    #[test]
    fn test_effective_components_clamps() {
        assert_eq!(effective_components(10, 6, 3).unwrap(), 3);
        assert_eq!(effective_components(10, 4, 8).unwrap(), 3);
        assert_eq!(effective_components(2, 20, 8).unwrap(), 2);
        assert!(effective_components(0, 20, 8).is_err());
    }
}
