//! Variable (column) selection on the predictor branch
//!
//! Columns are masked under the outlier category of the x branch, so
//! variable selection can be undone independently of missing-data
//! filtering. If a model has been fitted it is rebuilt over the reduced
//! variable set.

use tracing::info;

use crate::dataset::MaskCategory;
use crate::error::{ChemflowError, Result};
use crate::framework::model::RegressionModel;

impl RegressionModel {
    /// Remove the given visible-relative columns from the predictor block.
    pub fn remove_variables(&mut self, positions: &[usize]) -> Result<()> {
        self.x.remove_columns(MaskCategory::Outlier, positions)?;
        info!(count = positions.len(), "removed variables");
        self.refit_if_fitted()
    }

    /// Remove the visible columns in `from..to`.
    pub fn cut_variable_range(&mut self, from: usize, to: usize) -> Result<()> {
        let positions = self.variable_range(from, to)?;
        self.remove_variables(&positions)
    }

    /// Keep only the visible columns in `from..to`, removing the rest.
    pub fn keep_variable_range(&mut self, from: usize, to: usize) -> Result<()> {
        self.variable_range(from, to)?;
        let positions: Vec<usize> = (0..self.x.n_cols())
            .filter(|&j| j < from || j >= to)
            .collect();
        self.remove_variables(&positions)
    }

    /// Restore every column masked by variable selection.
    pub fn reset_variables(&mut self) -> Result<()> {
        self.x.reset_columns(MaskCategory::Outlier)?;
        self.refit_if_fitted()
    }

    fn variable_range(&self, from: usize, to: usize) -> Result<Vec<usize>> {
        let n_cols = self.x.n_cols();
        if from >= to || to > n_cols {
            return Err(ChemflowError::ConfigError(format!(
                "invalid variable range {from}..{to} for {n_cols} columns"
            )));
        }
        Ok((from..to).collect())
    }

    fn refit_if_fitted(&mut self) -> Result<()> {
        if self.last_algorithm.is_some() {
            self.refit()
        } else {
            Ok(())
        }
    }
}
