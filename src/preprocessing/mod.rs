//! Replayable preprocessing pipeline
//!
//! A [`Preprocessor`] couples a [`CallLedger`] with the scaling statistics
//! fitted by the most recent scaling operation. Every invocation records
//! itself in the ledger; any upstream change (row removal, imputation,
//! reordering) is handled by rewinding the view to its filtered raw state
//! and replaying the whole ledger, so the preprocessed view is always the
//! ledger applied to the current filtered data.

pub mod ledger;
pub mod ops;

pub use ledger::CallLedger;
pub use ops::{OpCategory, PreprocessOp, ScalingParams};

use ndarray::Array2;
use tracing::debug;

use crate::dataset::store::LayeredStore;
use crate::error::{ChemflowError, Result};

/// Where a scaling operation obtains its center/scale statistics.
pub enum ScalingMode<'a> {
    /// Fit from the data being transformed. Replays refit from scratch.
    Fit,
    /// Fit from an external reference matrix, typically a fold's training
    /// partition. The statistics are pinned across replays.
    Reference(&'a Array2<f64>),
    /// Reuse previously fitted statistics. Fails with `UnfittedParameter`
    /// when none exist.
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParamSource {
    /// Statistics are recomputed from the data on every replay.
    #[default]
    Refit,
    /// Statistics were fitted externally and survive replays unchanged.
    Pinned,
}

/// Preprocessing pipeline state for one data branch.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    ledger: CallLedger,
    fitted: Option<ScalingParams>,
    param_source: ParamSource,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &CallLedger {
        &self.ledger
    }

    /// Statistics fitted by the most recent scaling run, if any.
    pub fn fitted_params(&self) -> Option<&ScalingParams> {
        self.fitted.as_ref()
    }

    /// Whether the pipeline currently centers the data. Model fitting uses
    /// this to decide if an automatic mean-centering pass is needed.
    pub fn is_centered(&self) -> bool {
        self.ledger.scaling_op().is_some()
    }

    /// Run `op` on the store's preprocessed view in fit mode and record it.
    pub fn invoke(&mut self, store: &mut LayeredStore, op: PreprocessOp) -> Result<()> {
        self.invoke_with_mode(store, op, ScalingMode::Fit)
    }

    /// Run `op` with an explicit scaling mode.
    ///
    /// Scaling operations replace any previously recorded scaling entry:
    /// the old entry is dropped from the ledger and the whole ledger is
    /// replayed with the new statistics, so the net effect is as if only
    /// the newest scaling had ever been applied. Stateless operations apply
    /// directly, but if a scaling entry is already present the ledger is
    /// re-sorted to keep scaling last and replayed.
    pub fn invoke_with_mode(
        &mut self,
        store: &mut LayeredStore,
        op: PreprocessOp,
        mode: ScalingMode<'_>,
    ) -> Result<()> {
        if op.is_scaling() {
            match mode {
                ScalingMode::Fit => {
                    self.fitted = None;
                    self.param_source = ParamSource::Refit;
                }
                ScalingMode::Reference(reference) => {
                    self.fitted = Some(op.fit_scaling(reference)?);
                    self.param_source = ParamSource::Pinned;
                }
                ScalingMode::Apply => {
                    if self.fitted.is_none() {
                        return Err(ChemflowError::UnfittedParameter(format!(
                            "{op:?} invoked in apply mode before any fit"
                        )));
                    }
                    self.param_source = ParamSource::Pinned;
                }
            }
            if let Some(previous) = self.ledger.remove_scaling() {
                debug!(?previous, "replacing recorded scaling operation");
            }
            self.ledger.record(op);
            self.replay(store)
        } else {
            let transformed = op.apply_stateless(store.data())?;
            store.set_preprocessed(transformed);
            self.ledger.record(op);
            if self.ledger.sort_scaling_last() {
                debug!("scaling re-ordered after stateless operations; replaying ledger");
                self.replay(store)
            } else {
                Ok(())
            }
        }
    }

    /// Rewind the view to the filtered raw data and re-run the ledger.
    pub fn replay(&mut self, store: &mut LayeredStore) -> Result<()> {
        let mut data = store.raw_filtered();
        for op in self.ledger.stateless_ops() {
            data = op.apply_stateless(&data)?;
        }
        if let Some(op) = self.ledger.scaling_op() {
            let params = match (self.param_source, &self.fitted) {
                (ParamSource::Pinned, Some(p)) => p.clone(),
                _ => op.fit_scaling(&data)?,
            };
            data = params.apply(&data)?;
            self.fitted = Some(params);
        }
        store.set_preprocessed(data);
        Ok(())
    }

    /// Run the recorded stateless operations over an external matrix,
    /// leaving any scaling to the caller. Fold preprocessing uses this for
    /// the pre-split pass.
    pub fn apply_stateless_chain(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        let mut out = data.clone();
        for op in self.ledger.stateless_ops() {
            out = op.apply_stateless(&out)?;
        }
        Ok(out)
    }

    /// Apply the currently fitted scaling statistics to an external matrix.
    pub fn apply_fitted(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        let params = self.fitted.as_ref().ok_or_else(|| {
            ChemflowError::UnfittedParameter(
                "no scaling statistics have been fitted".to_string(),
            )
        })?;
        params.apply(data)
    }

    /// Drop the ledger and fitted statistics and rewind the view.
    pub fn reset(&mut self, store: &mut LayeredStore) {
        self.ledger.reset();
        self.fitted = None;
        self.param_source = ParamSource::Refit;
        let rewound = store.raw_filtered();
        store.set_preprocessed(rewound);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::index_set::MaskCategory;
    use ndarray::array;

    fn store() -> LayeredStore {
        LayeredStore::new(array![
            [1.0, 10.0],
            [2.0, 20.0],
            [3.0, 30.0],
            [4.0, 40.0]
        ])
    }

    #[test]
    fn test_mean_center_fit() {
        let mut store = store();
        let mut pre = Preprocessor::new();
        pre.invoke(&mut store, PreprocessOp::MeanCenter).unwrap();
        for j in 0..2 {
            assert!(store.data().column(j).mean().unwrap().abs() < 1e-12);
        }
        assert!(pre.fitted_params().is_some());
    }

    #[test]
    fn test_scaling_stays_last_after_reorder() {
        let mut store = store();
        let mut pre = Preprocessor::new();
        pre.invoke(&mut store, PreprocessOp::MeanCenter).unwrap();
        pre.invoke(&mut store, PreprocessOp::AbsoluteValue).unwrap();

        // The ledger re-sorts so centering runs after the stateless op
        assert_eq!(
            pre.ledger().entries(),
            &[PreprocessOp::AbsoluteValue, PreprocessOp::MeanCenter]
        );
        for j in 0..2 {
            assert!(store.data().column(j).mean().unwrap().abs() < 1e-12);
        }
    }

    #[test]
    fn test_second_scaling_replaces_first() {
        let mut store = store();
        let mut pre = Preprocessor::new();
        pre.invoke(&mut store, PreprocessOp::MeanCenter).unwrap();
        pre.invoke(&mut store, PreprocessOp::Autoscale).unwrap();

        assert_eq!(pre.ledger().len(), 1);
        assert_eq!(pre.ledger().scaling_op(), Some(&PreprocessOp::Autoscale));

        // Net effect equals autoscale applied once to the filtered raw data
        let expected = {
            let data = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
            let params = PreprocessOp::Autoscale.fit_scaling(&data).unwrap();
            params.apply(&data).unwrap()
        };
        for (a, b) in store.data().iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_apply_mode_requires_fit() {
        let mut store = store();
        let mut pre = Preprocessor::new();
        let err = pre
            .invoke_with_mode(&mut store, PreprocessOp::MeanCenter, ScalingMode::Apply)
            .unwrap_err();
        assert!(matches!(err, ChemflowError::UnfittedParameter(_)));
        assert!(pre.ledger().is_empty());
    }

    #[test]
    fn test_replay_refits_after_row_removal() {
        let mut store = store();
        let mut pre = Preprocessor::new();
        pre.invoke(&mut store, PreprocessOp::MeanCenter).unwrap();

        store.remove_rows(MaskCategory::Outlier, &[0]).unwrap();
        pre.replay(&mut store).unwrap();

        assert_eq!(store.data().nrows(), 3);
        for j in 0..2 {
            assert!(store.data().column(j).mean().unwrap().abs() < 1e-12);
        }
    }

    #[test]
    fn test_reference_mode_pins_statistics() {
        let mut store = store();
        let mut pre = Preprocessor::new();
        let reference = array![[10.0, 100.0], [20.0, 200.0]];
        pre.invoke_with_mode(
            &mut store,
            PreprocessOp::MeanCenter,
            ScalingMode::Reference(&reference),
        )
        .unwrap();

        // Offsets come from the reference, not from the store's own data
        let params = pre.fitted_params().unwrap();
        assert_eq!(params.offset, array![-15.0, -150.0]);
        assert_eq!(store.data()[[0, 0]], 1.0 - 15.0);

        // Replays keep the pinned statistics
        pre.replay(&mut store).unwrap();
        assert_eq!(pre.fitted_params().unwrap().offset, array![-15.0, -150.0]);
    }

    #[test]
    fn test_reset_rewinds_view() {
        let mut store = store();
        let mut pre = Preprocessor::new();
        pre.invoke(&mut store, PreprocessOp::Autoscale).unwrap();
        pre.reset(&mut store);
        assert!(pre.ledger().is_empty());
        assert!(pre.fitted_params().is_none());
        assert_eq!(store.data()[[0, 0]], 1.0);
    }
}
