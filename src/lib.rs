//! Chemflow - multivariate calibration with leakage-safe cross-validation
//!
//! This crate models a predictor matrix against a response with latent
//! variable regression, keeping full lineage from the raw data to every
//! derived view:
//! - [`dataset`] - Masked index state, layered views, and data branches
//! - [`preprocessing`] - Replayable preprocessing pipeline and transforms
//! - [`split`] - Systematic, contiguous, and random fold generation
//! - [`cross_validation`] - Leakage-safe fold preprocessing, fitting, scoring
//! - [`models`] - SIMPLS/NIPALS PLS, PCR, MLR, and NIPALS PCA
//! - [`metrics`] - Error metrics, diagnostics, and component selection
//! - [`missing_data`] - NaN masking and interpolation
//! - [`framework`] - The top-level [`RegressionModel`] workflow
//!
//! Raw data is never mutated: removals and preprocessing are recorded as
//! index masks and a call ledger, so every step can be undone and every
//! derived view can be rebuilt from raw.
//!
//! ```
//! use chemflow::prelude::*;
//! use ndarray::{Array2, Axis};
//!
//! let x = Array2::from_shape_fn((20, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64 + 0.1 * j as f64);
//! let y = x.sum_axis(Axis(1)).insert_axis(Axis(1));
//!
//! let mut model = RegressionModel::new(x, y)?;
//! model.options = ModelOptions::default()
//!     .with_held_out_fraction(0.25)
//!     .with_n_components(3);
//! model.pls()?;
//!
//! let results = model.results().unwrap();
//! assert!(results.optimal_components.is_some());
//! # Ok::<(), chemflow::ChemflowError>(())
//! ```

pub mod cross_validation;
pub mod dataset;
pub mod error;
pub mod framework;
pub mod metrics;
pub mod missing_data;
pub mod models;
pub mod preprocessing;
pub mod split;
pub mod utils;

pub use error::{ChemflowError, Result};

/// Common imports for working with the modelling workflow.
pub mod prelude {
    pub use crate::cross_validation::{CrossValidation, CrossValidationResults, Stage};
    pub use crate::dataset::{Branch, Layer, LayeredStore, MaskCategory};
    pub use crate::error::{ChemflowError, Result};
    pub use crate::framework::{DiagnosticKind, ModelOptions, ModelResults, RegressionModel};
    pub use crate::metrics::{Diagnostics, RegressionMetrics};
    pub use crate::models::{Algorithm, AlgorithmKind, FittedModel, Mlr, NipalsPls, Pcr, Simpls};
    pub use crate::preprocessing::{PreprocessOp, Preprocessor, ScalingMode};
    pub use crate::split::{Fold, SplitMethod, Splitter};
}

/// Crate version, from the package manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
