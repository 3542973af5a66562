//! Per-axis boolean inclusion masks partitioned into categories

use crate::error::{ChemflowError, Result};
use serde::{Deserialize, Serialize};

/// Category of an index mask. Each category is mutated and reset
/// independently; the effective mask is the AND over all categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaskCategory {
    /// Entries removed because they contained missing values
    MissingData,
    /// Entries removed by outlier detection or variable selection
    Outlier,
}

impl MaskCategory {
    pub const ALL: [MaskCategory; 2] = [MaskCategory::MissingData, MaskCategory::Outlier];
}

/// Boolean inclusion mask for one axis (rows or columns) of a matrix,
/// partitioned into independently resettable categories.
///
/// The mask length is fixed at creation (the axis extent of the raw matrix)
/// and never shrinks. Removal positions are expressed relative to the
/// currently-visible numbering and translated to absolute raw positions, so
/// repeated removals across categories stay aligned with the raw data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSet {
    missing_data: Vec<bool>,
    outlier: Vec<bool>,
}

impl IndexSet {
    /// Create an all-inclusive mask for an axis of the given extent.
    pub fn new(len: usize) -> Self {
        Self {
            missing_data: vec![true; len],
            outlier: vec![true; len],
        }
    }

    /// Raw axis extent (fixed at creation).
    pub fn len(&self) -> usize {
        self.missing_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missing_data.is_empty()
    }

    /// Number of positions visible under the merged mask.
    pub fn visible_len(&self) -> usize {
        self.merged().iter().filter(|&&keep| keep).count()
    }

    /// The mask of a single category.
    pub fn mask(&self, category: MaskCategory) -> &[bool] {
        match category {
            MaskCategory::MissingData => &self.missing_data,
            MaskCategory::Outlier => &self.outlier,
        }
    }

    fn mask_mut(&mut self, category: MaskCategory) -> &mut Vec<bool> {
        match category {
            MaskCategory::MissingData => &mut self.missing_data,
            MaskCategory::Outlier => &mut self.outlier,
        }
    }

    /// Logical AND over all category masks. Read-only, O(len).
    pub fn merged(&self) -> Vec<bool> {
        self.missing_data
            .iter()
            .zip(&self.outlier)
            .map(|(&a, &b)| a && b)
            .collect()
    }

    /// Absolute positions currently excluded by the merged mask, ascending.
    pub fn removed_absolute(&self) -> Vec<usize> {
        self.merged()
            .iter()
            .enumerate()
            .filter(|(_, &keep)| !keep)
            .map(|(i, _)| i)
            .collect()
    }

    /// Translate positions relative to the currently-visible numbering into
    /// absolute raw positions.
    ///
    /// For each relative index, every already-removed absolute position `<=`
    /// it shifts it up by one; walking the removed positions in ascending
    /// order makes the remap monotone and stable. Errors (without mutating
    /// anything) if a relative index is not strictly below the visible
    /// extent.
    pub fn translate(&self, positions: &[usize]) -> Result<Vec<usize>> {
        let extent = self.visible_len();
        let removed = self.removed_absolute();

        let mut absolute = Vec::with_capacity(positions.len());
        for &pos in positions {
            if pos >= extent {
                return Err(ChemflowError::IndexOutOfRange { index: pos, extent });
            }
            let mut abs = pos;
            for &gone in &removed {
                if gone <= abs {
                    abs += 1;
                }
            }
            absolute.push(abs);
        }
        Ok(absolute)
    }

    /// Mark the given visible-relative positions `false` within `category`.
    pub fn remove(&mut self, category: MaskCategory, positions: &[usize]) -> Result<()> {
        let absolute = self.translate(positions)?;
        self.remove_absolute(category, &absolute)
    }

    /// Mark the first `count` visible positions `false` within `category`.
    pub fn remove_count(&mut self, category: MaskCategory, count: usize) -> Result<()> {
        let positions: Vec<usize> = (0..count).collect();
        self.remove(category, &positions)
    }

    /// Mark already-translated absolute positions `false` within `category`.
    /// Used by row-linked branches so one translation applies to all of them.
    /// Errors (without mutating anything) if a position exceeds the raw
    /// extent.
    pub fn remove_absolute(&mut self, category: MaskCategory, positions: &[usize]) -> Result<()> {
        let extent = self.len();
        if let Some(&pos) = positions.iter().find(|&&pos| pos >= extent) {
            return Err(ChemflowError::IndexOutOfRange { index: pos, extent });
        }
        let mask = self.mask_mut(category);
        for &pos in positions {
            mask[pos] = false;
        }
        Ok(())
    }

    /// Restore every position in `category` to `true`.
    pub fn reset(&mut self, category: MaskCategory) {
        let mask = self.mask_mut(category);
        mask.iter_mut().for_each(|keep| *keep = true);
    }

    /// Restore every category to all-`true`.
    pub fn reset_all(&mut self) {
        for category in MaskCategory::ALL {
            self.reset(category);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_all_visible() {
        let idx = IndexSet::new(5);
        assert_eq!(idx.visible_len(), 5);
        assert!(idx.merged().iter().all(|&keep| keep));
    }

    #[test]
    fn test_translation_accounts_for_prior_removals() {
        let mut idx = IndexSet::new(6);
        idx.remove(MaskCategory::MissingData, &[0]).unwrap();
        // Visible rows are now 1..6; relative 0 is absolute 1
        assert_eq!(idx.translate(&[0]).unwrap(), vec![1]);
        idx.remove(MaskCategory::Outlier, &[0]).unwrap();
        assert_eq!(idx.removed_absolute(), vec![0, 1]);
    }

    #[test]
    fn test_repeated_zero_equals_batch() {
        // Removing {0} twice must exclude the same absolute set as {0, 1} once
        let mut twice = IndexSet::new(8);
        twice.remove(MaskCategory::Outlier, &[0]).unwrap();
        twice.remove(MaskCategory::Outlier, &[0]).unwrap();

        let mut batch = IndexSet::new(8);
        batch.remove(MaskCategory::Outlier, &[0, 1]).unwrap();

        assert_eq!(twice.removed_absolute(), batch.removed_absolute());
        assert_eq!(twice.removed_absolute(), vec![0, 1]);
    }

    #[test]
    fn test_mask_monotonicity_across_categories() {
        let mut idx = IndexSet::new(10);
        idx.remove(MaskCategory::MissingData, &[2]).unwrap();
        idx.remove(MaskCategory::Outlier, &[4]).unwrap();
        idx.remove(MaskCategory::MissingData, &[0]).unwrap();

        // Position 2 stays excluded regardless of later outlier activity
        assert!(!idx.merged()[2]);
        idx.reset(MaskCategory::Outlier);
        assert!(!idx.merged()[2]);
        assert!(!idx.merged()[0]);
        // Outlier removal at visible index 4 is restored
        assert_eq!(idx.visible_len(), 8);
    }

    #[test]
    fn test_out_of_range_leaves_state_untouched() {
        let mut idx = IndexSet::new(4);
        idx.remove(MaskCategory::MissingData, &[3]).unwrap();
        let before = idx.clone();

        let err = idx.remove(MaskCategory::Outlier, &[0, 3]).unwrap_err();
        assert!(matches!(
            err,
            ChemflowError::IndexOutOfRange { index: 3, extent: 3 }
        ));
        assert_eq!(idx, before);
    }

    #[test]
    fn test_reset_all_restores_everything() {
        let mut idx = IndexSet::new(5);
        idx.remove(MaskCategory::MissingData, &[1, 2]).unwrap();
        idx.remove(MaskCategory::Outlier, &[0]).unwrap();
        idx.reset_all();
        assert_eq!(idx.visible_len(), 5);
    }

    #[test]
    fn test_absolute_removal_rejects_out_of_range() {
        let mut idx = IndexSet::new(4);
        idx.remove(MaskCategory::MissingData, &[0]).unwrap();
        let before = idx.clone();

        let err = idx
            .remove_absolute(MaskCategory::Outlier, &[1, 4])
            .unwrap_err();
        assert!(matches!(
            err,
            ChemflowError::IndexOutOfRange { index: 4, extent: 4 }
        ));
        assert_eq!(idx, before);
    }

    #[test]
    fn test_remove_count() {
        let mut idx = IndexSet::new(6);
        idx.remove_count(MaskCategory::MissingData, 2).unwrap();
        assert_eq!(idx.removed_absolute(), vec![0, 1]);
    }
}
