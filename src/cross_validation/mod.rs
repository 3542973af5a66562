//! Cross-validation orchestration
//!
//! Drives one run through its fixed stage sequence: pre-split
//! preprocessing, fold generation, per-fold preprocessing, parallel model
//! fitting, prediction, and scoring. Any stage failure aborts the whole
//! run; there are no partial results.

pub mod fold_models;
pub mod fold_preprocess;

pub use fold_models::{fit_folds, scatter_predictions};
pub use fold_preprocess::{FoldPreprocessor, PreparedFold};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::metrics::RegressionMetrics;
use crate::models::Algorithm;
use crate::preprocessing::CallLedger;
use crate::split::{Fold, Splitter};

/// Progress marker of a cross-validation run. Stages always advance in
/// order; a failed run stops at the stage that raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    PreSplitPreprocessed,
    Split,
    FoldPreprocessed,
    FoldsFitted,
    Predicted,
    Scored,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct CrossValidationResults<M> {
    /// Error metrics of the held-out predictions, per component count.
    pub metrics: RegressionMetrics,
    /// Held-out predictions in original row order, `(n_rows, A)`.
    pub predictions: Array2<f64>,
    /// Fold-preprocessed held-out responses in original row order.
    pub held_out: Array1<f64>,
    pub folds: Vec<Fold>,
    pub models: Vec<M>,
}

/// One cross-validation configuration, reusable across runs.
#[derive(Debug, Clone, Copy)]
pub struct CrossValidation {
    splitter: Splitter,
    n_components: usize,
}

impl CrossValidation {
    pub fn new(splitter: Splitter, n_components: usize) -> Self {
        Self { splitter, n_components }
    }

    /// Run the full stage sequence for `algorithm` over filtered raw data
    /// and the recorded preprocessing ledgers.
    pub fn run<A: Algorithm>(
        &self,
        algorithm: &A,
        x: &Array2<f64>,
        y: &Array2<f64>,
        x_ledger: &CallLedger,
        y_ledger: &CallLedger,
    ) -> Result<CrossValidationResults<A::Model>> {
        let mut stage = Stage::Idle;
        info!(
            algorithm = algorithm.name(),
            n_splits = self.splitter.n_splits(),
            n_components = self.n_components,
            "starting cross-validation"
        );

        let pre = FoldPreprocessor::new(x_ledger, y_ledger);
        let (x_pre, y_pre) = pre.pre_split(x, y)?;
        advance(&mut stage, Stage::PreSplitPreprocessed);

        let folds = self.splitter.split(x_pre.nrows())?;
        advance(&mut stage, Stage::Split);

        let prepared: Vec<PreparedFold> = folds
            .iter()
            .map(|fold| pre.prepare_fold(&x_pre, &y_pre, fold))
            .collect::<Result<_>>()?;
        advance(&mut stage, Stage::FoldPreprocessed);

        let models = fit_folds(algorithm, &prepared, self.n_components)?;
        advance(&mut stage, Stage::FoldsFitted);

        let (predictions, held_out) =
            scatter_predictions(&prepared, &models, x_pre.nrows())?;
        advance(&mut stage, Stage::Predicted);

        let metrics = RegressionMetrics::from_predictions(&held_out, &predictions)?;
        advance(&mut stage, Stage::Scored);
        info!(rmsecv = ?metrics.rmse, "cross-validation complete");

        Ok(CrossValidationResults { metrics, predictions, held_out, folds, models })
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug_assert!(*stage < next);
    *stage = next;
    debug!(stage = ?next, "stage complete");
}
