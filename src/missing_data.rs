//! Missing-value handling on a data branch
//!
//! Rows or columns containing NaN can be masked out through the
//! missing-data index category, or the gaps can be filled by column
//! statistics, which installs a full-shape replacement matrix for the
//! missing-data layer. Either way the downstream views and the recorded
//! preprocessing replay automatically.

use ndarray::Array2;
use tracing::info;

use crate::dataset::{Branch, Layer, MaskCategory};
use crate::error::{ChemflowError, Result};
use crate::utils::median;

/// Whether any element is NaN.
pub fn has_missing(data: &Array2<f64>) -> bool {
    data.iter().any(|v| v.is_nan())
}

/// Visible-relative positions of rows containing at least one NaN.
pub fn nan_rows(data: &Array2<f64>) -> Vec<usize> {
    data.rows()
        .into_iter()
        .enumerate()
        .filter(|(_, row)| row.iter().any(|v| v.is_nan()))
        .map(|(i, _)| i)
        .collect()
}

/// Visible-relative positions of columns containing at least one NaN.
pub fn nan_columns(data: &Array2<f64>) -> Vec<usize> {
    data.columns()
        .into_iter()
        .enumerate()
        .filter(|(_, col)| col.iter().any(|v| v.is_nan()))
        .map(|(j, _)| j)
        .collect()
}

/// Mask out every visible row containing NaN. Errors when none remain.
pub fn remove_nan_rows(branch: &mut Branch) -> Result<Vec<usize>> {
    let positions = nan_rows(&branch.store().raw_filtered());
    if positions.is_empty() {
        return Err(ChemflowError::DataError(
            "no missing values left to remove".to_string(),
        ));
    }
    info!(count = positions.len(), "removing rows with missing values");
    let absolute = branch.translate_rows(&positions)?;
    branch.remove_rows(MaskCategory::MissingData, &positions)?;
    Ok(absolute)
}

/// Mask out every visible column containing NaN. Errors when none remain.
pub fn remove_nan_columns(branch: &mut Branch) -> Result<Vec<usize>> {
    let positions = nan_columns(&branch.store().raw_filtered());
    if positions.is_empty() {
        return Err(ChemflowError::DataError(
            "no missing values left to remove".to_string(),
        ));
    }
    info!(count = positions.len(), "removing columns with missing values");
    branch.remove_columns(MaskCategory::MissingData, &positions)?;
    Ok(positions)
}

/// Fill NaN cells with the mean of the finite values in their column.
pub fn interpolate_mean(branch: &mut Branch) -> Result<()> {
    interpolate_with(branch, |finite| {
        finite.iter().sum::<f64>() / finite.len() as f64
    })
}

/// Fill NaN cells with the median of the finite values in their column.
pub fn interpolate_median(branch: &mut Branch) -> Result<()> {
    interpolate_with(branch, |finite| median(finite))
}

fn interpolate_with(branch: &mut Branch, fill: impl Fn(&[f64]) -> f64) -> Result<()> {
    let raw = branch.store().view(Layer::Raw);
    if !has_missing(raw) {
        return Err(ChemflowError::DataError(
            "no missing values to interpolate".to_string(),
        ));
    }

    let mut filled = raw.clone();
    for j in 0..filled.ncols() {
        let finite: Vec<f64> = filled
            .column(j)
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect();
        if finite.is_empty() {
            return Err(ChemflowError::DataError(format!(
                "column {j} has no finite values to interpolate from"
            )));
        }
        let value = fill(&finite);
        for cell in filled.column_mut(j).iter_mut() {
            if cell.is_nan() {
                *cell = value;
            }
        }
    }
    info!("interpolated missing values");
    branch.set_missing_override(filled)
}

/// Undo all missing-data handling on the branch.
pub fn reset(branch: &mut Branch) -> Result<()> {
    branch.reset_index(Layer::MissingFiltered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn branch_with_nan() -> Branch {
        Branch::new(array![
            [1.0, 2.0],
            [f64::NAN, 4.0],
            [5.0, 6.0],
            [7.0, f64::NAN]
        ])
    }

    #[test]
    fn test_remove_nan_rows_masks_them() {
        let mut b = branch_with_nan();
        let removed = remove_nan_rows(&mut b).unwrap();
        assert_eq!(removed, vec![1, 3]);
        assert_eq!(b.n_rows(), 2);
        assert!(!has_missing(b.data()));

        // A second call has nothing left to do
        assert!(remove_nan_rows(&mut b).is_err());
    }

    #[test]
    fn test_remove_nan_columns() {
        let mut b = branch_with_nan();
        let removed = remove_nan_columns(&mut b).unwrap();
        assert_eq!(removed, vec![0, 1]);
        assert_eq!(b.n_cols(), 0);
    }

    #[test]
    fn test_mean_interpolation_fills_column_mean() {
        let mut b = branch_with_nan();
        interpolate_mean(&mut b).unwrap();
        assert_eq!(b.n_rows(), 4);
        // Column 0 finite values: 1, 5, 7
        assert!((b.data()[[1, 0]] - 13.0 / 3.0).abs() < 1e-12);
        // Column 1 finite values: 2, 4, 6
        assert!((b.data()[[3, 1]] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_median_interpolation() {
        let mut b = branch_with_nan();
        interpolate_median(&mut b).unwrap();
        assert_eq!(b.data()[[1, 0]], 5.0);
        assert_eq!(b.data()[[3, 1]], 4.0);
    }

    #[test]
    fn test_interpolation_without_missing_errors() {
        let mut b = Branch::new(array![[1.0, 2.0], [3.0, 4.0]]);
        assert!(interpolate_mean(&mut b).is_err());
    }

    #[test]
    fn test_reset_restores_masked_rows() {
        let mut b = branch_with_nan();
        remove_nan_rows(&mut b).unwrap();
        reset(&mut b).unwrap();
        assert_eq!(b.n_rows(), 4);
        assert!(has_missing(b.data()));
    }
}
