//! Error types for the chemflow engine

use thiserror::Error;

/// Result type alias for chemflow operations
pub type Result<T> = std::result::Result<T, ChemflowError>;

/// Main error type for the chemflow engine
#[derive(Error, Debug)]
pub enum ChemflowError {
    /// Invalid configuration, raised before any computation starts.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A removal position exceeds the currently-visible extent of an axis.
    /// The triggering operation is aborted and prior state is left untouched.
    #[error("Index {index} is out of range for visible extent {extent}")]
    IndexOutOfRange { index: usize, extent: usize },

    /// Apply-mode scaling invoked before any fit- or reference-mode run.
    #[error("Scaling parameters have not been fitted: {0}")]
    UnfittedParameter(String),

    /// Singular matrix, failed convergence, NaN propagation. Never caught
    /// internally; aborts the whole cross-validation run.
    #[error("Numerical failure: {0}")]
    NumericalFailure(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Data error: {0}")]
    DataError(String),
}
