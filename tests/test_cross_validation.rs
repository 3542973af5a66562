//! Integration test: leakage-safe cross-validation end-to-end

use chemflow::cross_validation::{CrossValidation, FoldPreprocessor};
use chemflow::models::{FittedModel, Simpls};
use chemflow::preprocessing::{CallLedger, PreprocessOp};
use chemflow::split::{SplitMethod, Splitter};
use ndarray::{array, Array2, Axis};

fn linear_data(n: usize) -> (Array2<f64>, Array2<f64>) {
    let x = Array2::from_shape_fn((n, 5), |(i, j)| {
        ((i * 7 + j * 3) % 13) as f64 - 6.0 + 0.1 * j as f64
    });
    let y = x
        .dot(&array![0.5, -1.0, 2.0, 0.0, 0.25])
        .insert_axis(Axis(1));
    (x, y)
}

fn centered_ledger() -> CallLedger {
    let mut ledger = CallLedger::new();
    ledger.record(PreprocessOp::MeanCenter);
    ledger
}

#[test]
fn test_end_to_end_run_shapes_and_accuracy() {
    let (x, y) = linear_data(20);
    let splitter = Splitter::with_n_splits(SplitMethod::Systematic, 4).unwrap();
    let cv = CrossValidation::new(splitter, 5);

    let results = cv
        .run(&Simpls, &x, &y, &centered_ledger(), &centered_ledger())
        .unwrap();

    assert_eq!(results.folds.len(), 4, "K=4 should produce four folds");
    assert_eq!(results.models.len(), 4, "one model per fold");
    assert_eq!(results.predictions.nrows(), 20, "predictions cover every row");
    assert_eq!(
        results.metrics.n_components(),
        results.predictions.ncols(),
        "metrics are per component count"
    );

    // Noiseless linear data is predicted exactly out of fold
    let last = results.metrics.rmse.len() - 1;
    assert!(results.metrics.rmse[last] < 1e-6);
}

#[test]
fn test_systematic_fold_assignment() {
    let splitter = Splitter::with_n_splits(SplitMethod::Systematic, 4).unwrap();
    let folds = splitter.split(12).unwrap();
    assert_eq!(folds[0].test_rows, vec![0, 4, 8]);
    assert_eq!(folds[2].test_rows, vec![2, 6, 10]);
}

#[test]
fn test_predictions_are_in_original_row_order() {
    let (x, y) = linear_data(20);
    let splitter = Splitter::with_n_splits(SplitMethod::Random, 4)
        .unwrap()
        .with_seed(3);
    let cv = CrossValidation::new(splitter, 5);
    let results = cv
        .run(&Simpls, &x, &y, &centered_ledger(), &centered_ledger())
        .unwrap();

    // Row i of the reassembled held-out vector must match the fold that
    // held row i out, regardless of shuffling
    for fold in &results.folds {
        for &row in &fold.test_rows {
            let model = &results.models[fold.index];
            assert!(model.coefficients().ncols() >= results.predictions.ncols());
            assert!(results.held_out[row].is_finite());
        }
    }
    let mut seen: Vec<usize> = results.folds.iter().flat_map(|f| f.test_rows.clone()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..20).collect::<Vec<_>>());
}

#[test]
fn test_held_out_rows_do_not_leak_into_training() {
    let (x, y) = linear_data(18);
    let x_ledger = centered_ledger();
    let y_ledger = centered_ledger();
    let pre = FoldPreprocessor::new(&x_ledger, &y_ledger);

    let folds = Splitter::with_n_splits(SplitMethod::Contiguous, 3)
        .unwrap()
        .split(18)
        .unwrap();

    for fold in &folds {
        let clean = pre.prepare_fold(&x, &y, fold).unwrap();

        // Corrupt the held-out rows and re-prepare
        let mut corrupted = x.clone();
        for &row in &fold.test_rows {
            for j in 0..corrupted.ncols() {
                corrupted[[row, j]] += 1e6;
            }
        }
        let dirty = pre.prepare_fold(&corrupted, &y, fold).unwrap();

        assert_eq!(
            clean.x_train, dirty.x_train,
            "fold {} training partition must ignore held-out values",
            fold.index
        );
        assert_eq!(clean.y_train, dirty.y_train);
    }
}

#[test]
fn test_invalid_configurations_are_rejected() {
    assert!(Splitter::from_fraction(SplitMethod::Systematic, 0.0).is_err());
    assert!(Splitter::from_fraction(SplitMethod::Systematic, 1.5).is_err());

    let splitter = Splitter::with_n_splits(SplitMethod::Systematic, 10).unwrap();
    assert!(splitter.split(6).is_err(), "more folds than rows");
}
