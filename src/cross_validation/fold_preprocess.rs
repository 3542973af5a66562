//! Leakage-safe preprocessing of fold partitions
//!
//! Stateless transforms run once over the full matrices before splitting;
//! scaling statistics are fitted on each fold's training partition only and
//! then applied to both partitions, so no information from held-out rows
//! reaches the statistics used to transform them.

use ndarray::{Array1, Array2, Axis};

use crate::error::Result;
use crate::preprocessing::CallLedger;
use crate::split::Fold;

/// One fold with fully preprocessed partitions, ready for model fitting.
#[derive(Debug, Clone)]
pub struct PreparedFold {
    pub fold: Fold,
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array2<f64>,
    pub y_test: Array1<f64>,
}

/// Applies the recorded x and y pipelines around a fold split.
#[derive(Debug, Clone, Copy)]
pub struct FoldPreprocessor<'a> {
    x_ledger: &'a CallLedger,
    y_ledger: &'a CallLedger,
}

impl<'a> FoldPreprocessor<'a> {
    pub fn new(x_ledger: &'a CallLedger, y_ledger: &'a CallLedger) -> Self {
        Self { x_ledger, y_ledger }
    }

    /// Run the stateless part of both pipelines over the unsplit matrices.
    pub fn pre_split(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<(Array2<f64>, Array2<f64>)> {
        let mut x_out = x.clone();
        for op in self.x_ledger.stateless_ops() {
            x_out = op.apply_stateless(&x_out)?;
        }
        let mut y_out = y.clone();
        for op in self.y_ledger.stateless_ops() {
            y_out = op.apply_stateless(&y_out)?;
        }
        Ok((x_out, y_out))
    }

    /// Partition one fold and apply the scaling chains, training-referenced.
    pub fn prepare_fold(
        &self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        fold: &Fold,
    ) -> Result<PreparedFold> {
        let mut x_train = x.select(Axis(0), &fold.train_rows);
        let mut x_test = x.select(Axis(0), &fold.test_rows);
        let mut y_train = y.select(Axis(0), &fold.train_rows);
        let mut y_test = y.select(Axis(0), &fold.test_rows);

        if let Some(op) = self.x_ledger.scaling_op() {
            let params = op.fit_scaling(&x_train)?;
            x_train = params.apply(&x_train)?;
            x_test = params.apply(&x_test)?;
        }
        if let Some(op) = self.y_ledger.scaling_op() {
            let params = op.fit_scaling(&y_train)?;
            y_train = params.apply(&y_train)?;
            y_test = params.apply(&y_test)?;
        }

        Ok(PreparedFold {
            fold: fold.clone(),
            x_train,
            x_test,
            y_train,
            y_test: y_test.column(0).to_owned(),
        })
    }
}
