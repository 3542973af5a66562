//! Layered data views over a raw matrix
//!
//! A [`LayeredStore`] owns one raw matrix and a fixed hierarchy of derived
//! views (raw -> missing-filtered -> outlier-filtered -> preprocessed). Each
//! filtering layer is driven by one [`MaskCategory`] of the row/column
//! [`IndexSet`]s; mutating an upstream layer's index recomputes that layer
//! and everything below it from the immediate upstream view, so a layer can
//! be undone without disturbing the layers above it.

use ndarray::{Array2, Axis};

use crate::dataset::index_set::{IndexSet, MaskCategory};
use crate::error::Result;

/// One named view in the raw -> missing-filtered -> outlier-filtered ->
/// preprocessed hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Raw,
    MissingFiltered,
    OutlierFiltered,
    Preprocessed,
}

impl Layer {
    /// The index category that feeds this layer, if it is a filtering layer.
    fn category(self) -> Option<MaskCategory> {
        match self {
            Layer::Raw | Layer::Preprocessed => None,
            Layer::MissingFiltered => Some(MaskCategory::MissingData),
            Layer::OutlierFiltered => Some(MaskCategory::Outlier),
        }
    }
}

/// Raw matrix plus its derived, cached views and the index state that
/// produced them.
#[derive(Debug, Clone)]
pub struct LayeredStore {
    raw: Array2<f64>,
    /// Full-shape replacement for the missing-data layer, set by
    /// interpolation/imputation. When present, the missing-filtered view
    /// derives from it instead of from `raw`.
    missing_override: Option<Array2<f64>>,
    rows: IndexSet,
    columns: IndexSet,
    missing_view: Array2<f64>,
    outlier_view: Array2<f64>,
    preprocessed: Array2<f64>,
}

impl LayeredStore {
    pub fn new(raw: Array2<f64>) -> Self {
        let rows = IndexSet::new(raw.nrows());
        let columns = IndexSet::new(raw.ncols());
        let missing_view = raw.clone();
        let outlier_view = raw.clone();
        let preprocessed = raw.clone();
        Self {
            raw,
            missing_override: None,
            rows,
            columns,
            missing_view,
            outlier_view,
            preprocessed,
        }
    }

    /// The deepest (preprocessed) view.
    pub fn data(&self) -> &Array2<f64> {
        &self.preprocessed
    }

    pub fn view(&self, layer: Layer) -> &Array2<f64> {
        match layer {
            Layer::Raw => &self.raw,
            Layer::MissingFiltered => &self.missing_view,
            Layer::OutlierFiltered => &self.outlier_view,
            Layer::Preprocessed => &self.preprocessed,
        }
    }

    pub fn rows(&self) -> &IndexSet {
        &self.rows
    }

    pub fn columns(&self) -> &IndexSet {
        &self.columns
    }

    /// Raw data filtered by the currently-active merged masks only. This is
    /// the state "before preprocessing", used as the base for ledger replay.
    pub fn raw_filtered(&self) -> Array2<f64> {
        self.outlier_view.clone()
    }

    /// Overwrite the preprocessed view. Only the owning preprocessing
    /// pipeline calls this.
    pub fn set_preprocessed(&mut self, data: Array2<f64>) {
        self.preprocessed = data;
    }

    /// Install a full-shape replacement matrix for the missing-data layer
    /// and recompute everything below it.
    pub fn set_missing_override(&mut self, data: Array2<f64>) -> Result<()> {
        crate::dataset::check_shape(&data, self.raw.nrows(), self.raw.ncols())?;
        self.missing_override = Some(data);
        self.recompute_from(Layer::MissingFiltered);
        Ok(())
    }

    /// Translate visible-relative row positions to absolute raw positions
    /// without mutating anything. Row-linked branches use this to validate a
    /// removal against every branch before applying it to any of them.
    pub fn translate_rows(&self, positions: &[usize]) -> Result<Vec<usize>> {
        self.rows.translate(positions)
    }

    /// Remove rows given by visible-relative positions under `category`,
    /// then recompute the affected layer and everything below it.
    pub fn remove_rows(&mut self, category: MaskCategory, positions: &[usize]) -> Result<()> {
        let absolute = self.rows.translate(positions)?;
        self.remove_rows_absolute(category, &absolute)
    }

    /// Remove rows by pre-translated absolute positions. Errors (without
    /// mutating anything) if a position exceeds the raw extent.
    pub fn remove_rows_absolute(&mut self, category: MaskCategory, positions: &[usize]) -> Result<()> {
        self.rows.remove_absolute(category, positions)?;
        self.recompute_from(layer_of(category));
        Ok(())
    }

    /// Remove columns given by visible-relative positions under `category`.
    pub fn remove_columns(&mut self, category: MaskCategory, positions: &[usize]) -> Result<()> {
        let absolute = self.columns.translate(positions)?;
        self.columns.remove_absolute(category, &absolute)?;
        self.recompute_from(layer_of(category));
        Ok(())
    }

    /// Reset one category on the row axis only.
    pub fn reset_rows(&mut self, category: MaskCategory) {
        self.rows.reset(category);
        self.recompute_from(layer_of(category));
    }

    /// Reset one category on the column axis only.
    pub fn reset_columns(&mut self, category: MaskCategory) {
        self.columns.reset(category);
        self.recompute_from(layer_of(category));
    }

    /// Reset the index categories feeding `layer` (on both axes) and
    /// recompute downstream views.
    pub fn reset_index(&mut self, layer: Layer) {
        if let Some(category) = layer.category() {
            self.rows.reset(category);
            self.columns.reset(category);
            if category == MaskCategory::MissingData {
                self.missing_override = None;
            }
            self.recompute_from(layer);
        }
    }

    /// Reset every category on both axes and recompute all views from raw.
    pub fn reset_all(&mut self) {
        self.rows.reset_all();
        self.columns.reset_all();
        self.missing_override = None;
        self.recompute_from(Layer::MissingFiltered);
    }

    /// Recompute `layer` from its immediate upstream view, then every layer
    /// below it. The preprocessed view is rewound to the outlier-filtered
    /// view; the owning pipeline replays its ledger afterwards.
    fn recompute_from(&mut self, layer: Layer) {
        if layer <= Layer::MissingFiltered {
            let base = self.missing_override.as_ref().unwrap_or(&self.raw);
            let keep_rows = visible_positions(self.rows.mask(MaskCategory::MissingData));
            let keep_cols = visible_positions(self.columns.mask(MaskCategory::MissingData));
            self.missing_view = base
                .select(Axis(0), &keep_rows)
                .select(Axis(1), &keep_cols);
        }
        if layer <= Layer::OutlierFiltered {
            // The outlier mask lives in absolute raw coordinates; compress it
            // to the positions still visible in the missing-filtered view.
            let keep_rows = compressed_positions(
                self.rows.mask(MaskCategory::MissingData),
                self.rows.mask(MaskCategory::Outlier),
            );
            let keep_cols = compressed_positions(
                self.columns.mask(MaskCategory::MissingData),
                self.columns.mask(MaskCategory::Outlier),
            );
            self.outlier_view = self
                .missing_view
                .select(Axis(0), &keep_rows)
                .select(Axis(1), &keep_cols);
        }
        self.preprocessed = self.outlier_view.clone();
    }
}

fn layer_of(category: MaskCategory) -> Layer {
    match category {
        MaskCategory::MissingData => Layer::MissingFiltered,
        MaskCategory::Outlier => Layer::OutlierFiltered,
    }
}

/// Positions where `mask` is true.
fn visible_positions(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter(|(_, &keep)| keep)
        .map(|(i, _)| i)
        .collect()
}

/// Positions (numbered within the `upstream`-visible subset) where
/// `downstream` is also true.
fn compressed_positions(upstream: &[bool], downstream: &[bool]) -> Vec<usize> {
    upstream
        .iter()
        .zip(downstream)
        .filter(|(&up, _)| up)
        .enumerate()
        .filter(|(_, (_, &down))| down)
        .map(|(local, _)| local)
        .collect()
}
