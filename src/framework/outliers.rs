//! Diagnostic-driven outlier removal
//!
//! Ranks samples by a diagnostic at the selected component count, masks the
//! worst ones under the outlier category on both branches, and rebuilds the
//! last fitted model over the reduced data.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::MaskCategory;
use crate::error::{ChemflowError, Result};
use crate::framework::model::RegressionModel;

/// Which diagnostic ranks the candidate outliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    Leverage,
    QResiduals,
}

impl RegressionModel {
    /// Remove the `count` samples with the highest diagnostic value at the
    /// optimal component count, then refit.
    pub fn remove_outliers(&mut self, kind: DiagnosticKind, count: usize) -> Result<()> {
        if count == 0 {
            return Err(ChemflowError::ConfigError(
                "outlier removal count must be at least 1".to_string(),
            ));
        }
        let results = self.results.as_ref().ok_or_else(|| {
            ChemflowError::ConfigError("fit a model before removing outliers".to_string())
        })?;
        let diagnostics = results.diagnostics.as_ref().ok_or_else(|| {
            ChemflowError::DataError(
                "the fitted model does not produce diagnostics".to_string(),
            )
        })?;
        let optimal = results.optimal_components.ok_or_else(|| {
            ChemflowError::ConfigError(
                "optimal component count is not determined".to_string(),
            )
        })?;

        let matrix = match kind {
            DiagnosticKind::Leverage => &diagnostics.leverage,
            DiagnosticKind::QResiduals => &diagnostics.q_residuals,
        };
        let column = matrix.column((optimal - 1).min(matrix.ncols() - 1));
        if count >= column.len() {
            return Err(ChemflowError::ConfigError(format!(
                "cannot remove {count} outliers from {} samples",
                column.len()
            )));
        }

        let mut order: Vec<usize> = (0..column.len()).collect();
        order.sort_by(|&a, &b| {
            column[a]
                .partial_cmp(&column[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut positions: Vec<usize> = order[order.len() - count..].to_vec();
        positions.sort_unstable();

        info!(?kind, count, ?positions, "removing outliers");
        self.remove_rows(MaskCategory::Outlier, &positions)?;
        self.refit()
    }

    /// Restore every row masked by outlier removal on both branches.
    pub fn reset_outliers(&mut self) -> Result<()> {
        self.x.reset_rows(MaskCategory::Outlier)?;
        self.y.reset_rows(MaskCategory::Outlier)
    }
}
