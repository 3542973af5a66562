//! The top-level regression model
//!
//! Couples a predictor branch and a response branch whose row axes stay in
//! lockstep, runs calibration and cross-validation for the chosen
//! algorithm, and keeps the combined results. Row mutations go through the
//! model so both branches see the same absolute positions; the model
//! remembers the last fitted algorithm so outlier removal can rebuild it.

use ndarray::Array2;
use tracing::{info, warn};

use crate::cross_validation::{CrossValidation, CrossValidationResults};
use crate::dataset::{Branch, MaskCategory};
use crate::error::{ChemflowError, Result};
use crate::framework::options::ModelOptions;
use crate::metrics::{choose_optimal_component, Diagnostics, RegressionMetrics};
use crate::missing_data::{has_missing, nan_rows};
use crate::models::{Algorithm, AlgorithmKind, FittedModel, Mlr, NipalsPls, Pcr, Simpls};
use crate::split::Splitter;

/// Calibration fit over the full preprocessed data.
pub struct CalibrationResults {
    pub model: Box<dyn FittedModel>,
    pub metrics: RegressionMetrics,
    /// Fitted predictions `(n_rows, A)`.
    pub predictions: Array2<f64>,
}

/// Everything one algorithm run produces.
pub struct ModelResults {
    pub calibration: CalibrationResults,
    pub cross_validation: Option<CrossValidationResults<Box<dyn FittedModel>>>,
    pub diagnostics: Option<Diagnostics>,
    /// Selected component count (1-based), present when cross-validation
    /// ran.
    pub optimal_components: Option<usize>,
}

/// A regression model over row-linked x and y branches.
pub struct RegressionModel {
    pub(crate) x: Branch,
    pub(crate) y: Branch,
    pub options: ModelOptions,
    pub(crate) results: Option<ModelResults>,
    pub(crate) last_algorithm: Option<AlgorithmKind>,
}

impl RegressionModel {
    /// Build a model from a predictor matrix and a single-column response.
    pub fn new(x: Array2<f64>, y: Array2<f64>) -> Result<Self> {
        if y.ncols() != 1 {
            return Err(ChemflowError::ShapeError {
                expected: "single-column response".to_string(),
                actual: format!("{} columns", y.ncols()),
            });
        }
        if x.nrows() != y.nrows() {
            return Err(ChemflowError::ShapeError {
                expected: format!("{} response rows", x.nrows()),
                actual: format!("{} response rows", y.nrows()),
            });
        }
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(ChemflowError::DataError(
                "cannot model an empty matrix".to_string(),
            ));
        }
        if has_missing(&x) || has_missing(&y) {
            warn!("data contains missing values; handle them before fitting");
        }
        Ok(Self {
            x: Branch::new(x),
            y: Branch::new(y),
            options: ModelOptions::default(),
            results: None,
            last_algorithm: None,
        })
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn x(&self) -> &Branch {
        &self.x
    }

    pub fn x_mut(&mut self) -> &mut Branch {
        &mut self.x
    }

    pub fn y(&self) -> &Branch {
        &self.y
    }

    pub fn y_mut(&mut self) -> &mut Branch {
        &mut self.y
    }

    pub fn results(&self) -> Option<&ModelResults> {
        self.results.as_ref()
    }

    pub fn last_algorithm(&self) -> Option<AlgorithmKind> {
        self.last_algorithm
    }

    pub fn optimal_components(&self) -> Option<usize> {
        self.results.as_ref().and_then(|r| r.optimal_components)
    }

    /// Fit a PLS model with the SIMPLS algorithm.
    pub fn pls(&mut self) -> Result<()> {
        self.fit_algorithm(AlgorithmKind::Simpls)
    }

    /// Fit a PLS model with the NIPALS algorithm.
    pub fn pls_nipals(&mut self) -> Result<()> {
        self.fit_algorithm(AlgorithmKind::NipalsPls)
    }

    /// Fit a principal component regression model.
    pub fn pcr(&mut self) -> Result<()> {
        self.fit_algorithm(AlgorithmKind::Pcr)
    }

    /// Fit a multiple linear regression model.
    pub fn mlr(&mut self) -> Result<()> {
        self.fit_algorithm(AlgorithmKind::Mlr)
    }

    pub fn fit_algorithm(&mut self, kind: AlgorithmKind) -> Result<()> {
        match kind {
            AlgorithmKind::Simpls => self.run_algorithm(&Simpls, kind),
            AlgorithmKind::NipalsPls => self.run_algorithm(&NipalsPls, kind),
            AlgorithmKind::Pcr => self.run_algorithm(&Pcr, kind),
            AlgorithmKind::Mlr => self.run_algorithm(&Mlr, kind),
        }
    }

    /// Re-run the last fitted algorithm over the current data state.
    pub fn refit(&mut self) -> Result<()> {
        let kind = self.last_algorithm.ok_or_else(|| {
            ChemflowError::ConfigError("no model has been fitted yet".to_string())
        })?;
        self.fit_algorithm(kind)
    }

    fn run_algorithm<A>(&mut self, algorithm: &A, kind: AlgorithmKind) -> Result<()>
    where
        A: Algorithm,
        A::Model: 'static,
    {
        let x_raw = self.x.store().raw_filtered();
        let y_raw = self.y.store().raw_filtered();
        if has_missing(&x_raw) {
            return Err(ChemflowError::DataError(
                "x contains missing values; handle them before fitting".to_string(),
            ));
        }
        if has_missing(&y_raw) {
            return Err(ChemflowError::DataError(
                "y contains missing values; handle them before fitting".to_string(),
            ));
        }

        if self.options.mean_center {
            if !self.x.preprocessor().is_centered() {
                self.x.mean_center()?;
            }
            if !self.y.preprocessor().is_centered() {
                self.y.mean_center()?;
            }
        }

        let cross_validation = match self.options.cross_validation {
            Some(method) => {
                let mut splitter =
                    Splitter::from_fraction(method, self.options.held_out_fraction)?;
                if let Some(seed) = self.options.seed {
                    splitter = splitter.with_seed(seed);
                }
                let cv = CrossValidation::new(splitter, self.options.n_components);
                let results = cv.run(
                    algorithm,
                    &x_raw,
                    &y_raw,
                    self.x.preprocessor().ledger(),
                    self.y.preprocessor().ledger(),
                )?;
                Some(box_models(results))
            }
            None => None,
        };

        let model = algorithm.fit(self.x.data(), self.y.data(), self.options.n_components)?;
        let predictions = model.predict(self.x.data());
        let actual = self.y.data().column(0).to_owned();
        let metrics = RegressionMetrics::from_predictions(&actual, &predictions)?;

        let diagnostics = match (model.scores(), model.loadings()) {
            (Some(scores), Some(loadings)) => {
                Some(Diagnostics::from_decomposition(self.x.data(), scores, loadings)?)
            }
            _ => None,
        };

        let optimal_components = cross_validation.as_ref().map(|cv| {
            choose_optimal_component(&metrics.rmse.to_vec(), &cv.metrics.rmse.to_vec())
        });

        info!(
            algorithm = algorithm.name(),
            rmsec = ?metrics.rmse,
            optimal = ?optimal_components,
            "model fitted"
        );

        self.results = Some(ModelResults {
            calibration: CalibrationResults {
                model: Box::new(model),
                metrics,
                predictions,
            },
            cross_validation,
            diagnostics,
            optimal_components,
        });
        self.last_algorithm = Some(kind);
        Ok(())
    }

    /// Remove rows from both branches atomically. Positions are relative to
    /// the currently-visible rows; translation is validated against both
    /// branches before either is touched.
    pub fn remove_rows(&mut self, category: MaskCategory, positions: &[usize]) -> Result<()> {
        let absolute = self.x.translate_rows(positions)?;
        let from_y = self.y.translate_rows(positions)?;
        if absolute != from_y {
            return Err(ChemflowError::DataError(
                "x and y branch row state diverged".to_string(),
            ));
        }
        self.x.remove_rows_absolute(category, &absolute)?;
        self.y.remove_rows_absolute(category, &absolute)
    }

    /// Mask out every row where either branch has a missing value.
    pub fn remove_missing_rows(&mut self) -> Result<()> {
        let x_raw = self.x.store().raw_filtered();
        let y_raw = self.y.store().raw_filtered();
        let mut positions = nan_rows(&x_raw);
        for row in nan_rows(&y_raw) {
            if !positions.contains(&row) {
                positions.push(row);
            }
        }
        positions.sort_unstable();
        if positions.is_empty() {
            return Err(ChemflowError::DataError(
                "no missing values left to remove".to_string(),
            ));
        }
        self.remove_rows(MaskCategory::MissingData, &positions)
    }

    /// Drop all index state, preprocessing, and results.
    pub fn reset(&mut self) -> Result<()> {
        self.x.reset_preprocessing();
        self.y.reset_preprocessing();
        self.x.reset_index_all()?;
        self.y.reset_index_all()?;
        self.results = None;
        self.last_algorithm = None;
        Ok(())
    }
}

fn box_models<M: FittedModel + 'static>(
    results: CrossValidationResults<M>,
) -> CrossValidationResults<Box<dyn FittedModel>> {
    CrossValidationResults {
        metrics: results.metrics,
        predictions: results.predictions,
        held_out: results.held_out,
        folds: results.folds,
        models: results
            .models
            .into_iter()
            .map(|m| Box::new(m) as Box<dyn FittedModel>)
            .collect(),
    }
}
