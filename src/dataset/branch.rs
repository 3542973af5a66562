//! A data branch: one layered store plus its preprocessing pipeline
//!
//! Every mutation that invalidates the preprocessed view (row or column
//! removal, imputation, index reset) automatically replays the recorded
//! ledger, so [`Branch::data`] always reflects the current filtered data
//! with the full pipeline applied.

use ndarray::Array2;

use crate::dataset::index_set::MaskCategory;
use crate::dataset::store::{Layer, LayeredStore};
use crate::error::Result;
use crate::preprocessing::{PreprocessOp, Preprocessor};

#[derive(Debug, Clone)]
pub struct Branch {
    store: LayeredStore,
    preprocessor: Preprocessor,
}

impl Branch {
    pub fn new(raw: Array2<f64>) -> Self {
        Self {
            store: LayeredStore::new(raw),
            preprocessor: Preprocessor::new(),
        }
    }

    /// The fully preprocessed view.
    pub fn data(&self) -> &Array2<f64> {
        self.store.data()
    }

    /// Visible row count after filtering.
    pub fn n_rows(&self) -> usize {
        self.store.data().nrows()
    }

    /// Visible column count after filtering.
    pub fn n_cols(&self) -> usize {
        self.store.data().ncols()
    }

    pub fn store(&self) -> &LayeredStore {
        &self.store
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Apply a preprocessing operation in fit mode and record it.
    pub fn preprocess(&mut self, op: PreprocessOp) -> Result<()> {
        self.preprocessor.invoke(&mut self.store, op)
    }

    pub fn mean_center(&mut self) -> Result<()> {
        self.preprocess(PreprocessOp::MeanCenter)
    }

    pub fn autoscale(&mut self) -> Result<()> {
        self.preprocess(PreprocessOp::Autoscale)
    }

    pub fn pareto(&mut self) -> Result<()> {
        self.preprocess(PreprocessOp::Pareto)
    }

    pub fn median_center(&mut self) -> Result<()> {
        self.preprocess(PreprocessOp::MedianCenter)
    }

    pub fn snv(&mut self) -> Result<()> {
        self.preprocess(PreprocessOp::Snv)
    }

    pub fn msc(&mut self) -> Result<()> {
        self.preprocess(PreprocessOp::Msc)
    }

    pub fn log10(&mut self) -> Result<()> {
        self.preprocess(PreprocessOp::Log10)
    }

    pub fn glog(&mut self, lambda: f64, shift: f64) -> Result<()> {
        self.preprocess(PreprocessOp::Glog { lambda, shift })
    }

    pub fn absolute_value(&mut self) -> Result<()> {
        self.preprocess(PreprocessOp::AbsoluteValue)
    }

    pub fn to_absorbance(&mut self) -> Result<()> {
        self.preprocess(PreprocessOp::ToAbsorbance)
    }

    pub fn savitzky_golay(
        &mut self,
        width: usize,
        polyorder: usize,
        deriv: usize,
        delta: f64,
    ) -> Result<()> {
        self.preprocess(PreprocessOp::SavitzkyGolay { width, polyorder, deriv, delta })
    }

    /// Re-run the recorded ledger over the current filtered data.
    pub fn replay(&mut self) -> Result<()> {
        self.preprocessor.replay(&mut self.store)
    }

    /// Drop all recorded preprocessing and rewind the view.
    pub fn reset_preprocessing(&mut self) {
        self.preprocessor.reset(&mut self.store);
    }

    /// Translate visible-relative row positions to absolute raw positions
    /// without mutating anything.
    pub fn translate_rows(&self, positions: &[usize]) -> Result<Vec<usize>> {
        self.store.translate_rows(positions)
    }

    /// Remove rows (visible-relative positions) and replay the ledger.
    pub fn remove_rows(&mut self, category: MaskCategory, positions: &[usize]) -> Result<()> {
        self.store.remove_rows(category, positions)?;
        self.replay()
    }

    /// Remove rows by pre-translated absolute positions and replay. Used by
    /// row-linked branches so a single translation drives all of them.
    pub fn remove_rows_absolute(
        &mut self,
        category: MaskCategory,
        positions: &[usize],
    ) -> Result<()> {
        self.store.remove_rows_absolute(category, positions)?;
        self.replay()
    }

    /// Remove columns (visible-relative positions) and replay the ledger.
    pub fn remove_columns(&mut self, category: MaskCategory, positions: &[usize]) -> Result<()> {
        self.store.remove_columns(category, positions)?;
        self.replay()
    }

    /// Install a full-shape replacement for the missing-data layer and
    /// replay the ledger over it.
    pub fn set_missing_override(&mut self, data: Array2<f64>) -> Result<()> {
        self.store.set_missing_override(data)?;
        self.replay()
    }

    /// Reset one index category on the row axis and replay.
    pub fn reset_rows(&mut self, category: MaskCategory) -> Result<()> {
        self.store.reset_rows(category);
        self.replay()
    }

    /// Reset one index category on the column axis and replay.
    pub fn reset_columns(&mut self, category: MaskCategory) -> Result<()> {
        self.store.reset_columns(category);
        self.replay()
    }

    /// Reset the index state feeding one layer and replay.
    pub fn reset_index(&mut self, layer: Layer) -> Result<()> {
        self.store.reset_index(layer);
        self.replay()
    }

    /// Reset all index state on both axes and replay.
    pub fn reset_index_all(&mut self) -> Result<()> {
        self.store.reset_all();
        self.replay()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn branch() -> Branch {
        Branch::new(array![
            [1.0, 10.0],
            [2.0, 20.0],
            [3.0, 30.0],
            [4.0, 40.0]
        ])
    }

    #[test]
    fn test_convenience_ops_record_in_ledger() {
        let mut b = branch();
        b.snv().unwrap();
        b.mean_center().unwrap();
        assert_eq!(b.preprocessor().ledger().len(), 2);
    }

    #[test]
    fn test_row_removal_keeps_pipeline_applied() {
        let mut b = branch();
        b.mean_center().unwrap();
        b.remove_rows(MaskCategory::Outlier, &[3]).unwrap();

        // Centering is refit over the three remaining rows
        assert_eq!(b.n_rows(), 3);
        for j in 0..2 {
            assert!(b.data().column(j).mean().unwrap().abs() < 1e-12);
        }
    }

    #[test]
    fn test_reset_index_replays_over_restored_rows() {
        let mut b = branch();
        b.remove_rows(MaskCategory::Outlier, &[0]).unwrap();
        b.mean_center().unwrap();
        b.reset_index(Layer::OutlierFiltered).unwrap();

        assert_eq!(b.n_rows(), 4);
        for j in 0..2 {
            assert!(b.data().column(j).mean().unwrap().abs() < 1e-12);
        }
    }

    #[test]
    fn test_column_removal_refits_scaling_width() {
        let mut b = branch();
        b.autoscale().unwrap();
        b.remove_columns(MaskCategory::Outlier, &[0]).unwrap();
        assert_eq!(b.n_cols(), 1);
        assert_eq!(b.preprocessor().fitted_params().unwrap().offset.len(), 1);
    }
}
