//! Parallel fold fitting and prediction reassembly

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use tracing::debug;

use crate::cross_validation::fold_preprocess::PreparedFold;
use crate::error::{ChemflowError, Result};
use crate::models::{Algorithm, FittedModel};

/// Fit one model per fold, in parallel. Any fold failure aborts the run.
pub fn fit_folds<A: Algorithm>(
    algorithm: &A,
    folds: &[PreparedFold],
    n_components: usize,
) -> Result<Vec<A::Model>> {
    debug!(algorithm = algorithm.name(), n_folds = folds.len(), "fitting fold models");
    folds
        .par_iter()
        .map(|fold| algorithm.fit(&fold.x_train, &fold.y_train, n_components))
        .collect()
}

/// Predict every fold's held-out partition and scatter the results back
/// into original row order.
///
/// Returns the `(n_rows, n_components)` prediction matrix and the held-out
/// response values assembled the same way, so row `i` of both corresponds
/// to the same original sample regardless of fold layout.
pub fn scatter_predictions<M: FittedModel>(
    folds: &[PreparedFold],
    models: &[M],
    n_rows: usize,
) -> Result<(Array2<f64>, Array1<f64>)> {
    if folds.len() != models.len() {
        return Err(ChemflowError::DataError(format!(
            "{} folds but {} models",
            folds.len(),
            models.len()
        )));
    }
    let a_max = models
        .iter()
        .map(FittedModel::n_components)
        .min()
        .ok_or_else(|| ChemflowError::DataError("no folds to predict".to_string()))?;

    let mut predictions = Array2::zeros((n_rows, a_max));
    let mut held_out = Array1::zeros(n_rows);
    for (fold, model) in folds.iter().zip(models) {
        let y_hat = model.predict(&fold.x_test);
        for (local, &row) in fold.fold.test_rows.iter().enumerate() {
            for a in 0..a_max {
                predictions[[row, a]] = y_hat[[local, a]];
            }
            held_out[row] = fold.y_test[local];
        }
    }
    Ok((predictions, held_out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Simpls;
    use crate::split::Fold;
    use ndarray::array;

    fn prepared(fold: Fold, x: Array2<f64>, y: Array1<f64>) -> PreparedFold {
        // Training data is irrelevant for scatter tests
        PreparedFold {
            fold,
            x_train: Array2::zeros((2, 1)),
            x_test: x,
            y_train: Array2::zeros((2, 1)),
            y_test: y,
        }
    }

    #[test]
    fn test_predictions_return_in_original_row_order() {
        // Interleaved folds: rows {0, 2} and {1, 3}
        let x = array![
            [1.0, -1.0],
            [2.0, 1.0],
            [-1.0, 2.0],
            [0.5, 0.5],
            [-2.0, -0.5],
            [1.5, -1.5]
        ];
        let b = array![2.0, -1.0];
        let y = x.dot(&b);

        let fold_a = Fold { index: 0, train_rows: vec![1, 3, 5], test_rows: vec![0, 2, 4] };
        let fold_b = Fold { index: 1, train_rows: vec![0, 2, 4], test_rows: vec![1, 3, 5] };

        let folds: Vec<PreparedFold> = [fold_a, fold_b]
            .into_iter()
            .map(|fold| {
                let x_test = x.select(ndarray::Axis(0), &fold.test_rows);
                let y_test = fold.test_rows.iter().map(|&r| y[r]).collect();
                let x_train = x.select(ndarray::Axis(0), &fold.train_rows);
                let y_train_col: Array1<f64> =
                    fold.train_rows.iter().map(|&r| y[r]).collect();
                PreparedFold {
                    fold,
                    x_train,
                    x_test,
                    y_train: y_train_col.insert_axis(ndarray::Axis(1)),
                    y_test,
                }
            })
            .collect();

        let models = fit_folds(&Simpls, &folds, 2).unwrap();
        let (pred, actual) = scatter_predictions(&folds, &models, 6).unwrap();

        // Held-out responses land back at their original positions
        for i in 0..6 {
            assert!((actual[i] - y[i]).abs() < 1e-12);
        }
        // The noiseless relationship is recoverable out of fold
        let last = pred.ncols() - 1;
        for i in 0..6 {
            assert!((pred[[i, last]] - y[i]).abs() < 1e-6, "row {i}");
        }
    }

    #[test]
    fn test_model_fold_count_mismatch_rejected() {
        let folds = vec![prepared(
            Fold { index: 0, train_rows: vec![1], test_rows: vec![0] },
            Array2::zeros((1, 1)),
            Array1::zeros(1),
        )];
        let models: Vec<crate::models::PlsModel> = vec![];
        assert!(scatter_predictions(&folds, &models, 2).is_err());
    }
}
